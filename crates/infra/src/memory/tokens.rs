use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indica_auth::{PersistedToken, TokenStore, TokenStoreError};

#[derive(Debug, Default)]
enum Slot {
    #[default]
    Empty,
    Stored(PersistedToken),
    Corrupt,
}

/// Token store that forgets everything when the process exits.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTokenStore {
    slot: Arc<Mutex<Slot>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose content cannot be read back (until cleared or overwritten).
    pub fn corrupted() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::Corrupt)),
        }
    }

    pub fn peek(&self) -> Option<PersistedToken> {
        match &*self.lock() {
            Slot::Stored(token) => Some(token.clone()),
            _ => None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TokenStore for InMemoryTokenStore {
    fn load(&self) -> Result<Option<PersistedToken>, TokenStoreError> {
        match &*self.lock() {
            Slot::Empty => Ok(None),
            Slot::Stored(token) => Ok(Some(token.clone())),
            Slot::Corrupt => Err(TokenStoreError::Corrupt("unreadable token".to_string())),
        }
    }

    fn save(&self, token: &PersistedToken) -> Result<(), TokenStoreError> {
        *self.lock() = Slot::Stored(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        *self.lock() = Slot::Empty;
        Ok(())
    }
}
