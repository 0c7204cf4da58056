use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use indica_auth::{DirectoryError, ProfileDirectory, ProfileRecord};
use indica_core::{IdentityId, PixKey};

/// In-memory `profiles` table.
///
/// Besides the rows it can simulate an unreachable backend (`set_failing`) and hold
/// lookups in flight (`pause_lookups` / `release_lookups`) to exercise stale results.
#[derive(Debug, Clone)]
pub struct InMemoryProfileDirectory {
    rows: Arc<RwLock<HashMap<IdentityId, ProfileRecord>>>,
    failing: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    gate: Arc<Semaphore>,
    lookups: Arc<AtomicUsize>,
}

impl Default for InMemoryProfileDirectory {
    fn default() -> Self {
        Self {
            rows: Arc::default(),
            failing: Arc::default(),
            paused: Arc::default(),
            gate: Arc::new(Semaphore::new(0)),
            lookups: Arc::default(),
        }
    }
}

impl InMemoryProfileDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: ProfileRecord) {
        self.rows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.id, record);
    }

    pub fn get(&self, id: IdentityId) -> Option<ProfileRecord> {
        self.rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Lookups started from now on wait for [`release_lookups`](Self::release_lookups).
    pub fn pause_lookups(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Let `n` waiting (or future) lookups through, oldest first.
    pub fn release_lookups(&self, n: usize) {
        self.gate.add_permits(n);
    }

    /// Number of lookups issued so far.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileDirectory for InMemoryProfileDirectory {
    async fn get_profile(&self, id: IdentityId) -> Result<Option<ProfileRecord>, DirectoryError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        if self.paused.load(Ordering::SeqCst) {
            self.gate
                .acquire()
                .await
                .map_err(|e| DirectoryError::Backend(e.to_string()))?
                .forget();
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(DirectoryError::Network("profile directory offline".to_string()));
        }

        Ok(self.get(id))
    }

    async fn update_payout_key(&self, id: IdentityId, key: &PixKey) -> Result<(), DirectoryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DirectoryError::Network("profile directory offline".to_string()));
        }

        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        rows.entry(id)
            .or_insert_with(|| ProfileRecord::new(id))
            .pix_key = Some(key.as_str().to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indica_core::PixKeyKind;

    #[tokio::test]
    async fn missing_row_is_none() {
        let directory = InMemoryProfileDirectory::new();
        assert_eq!(directory.get_profile(IdentityId::new()).await, Ok(None));
        assert_eq!(directory.lookup_count(), 1);
    }

    #[tokio::test]
    async fn payout_key_update_upserts_the_row() {
        let directory = InMemoryProfileDirectory::new();
        let id = IdentityId::new();
        let key = PixKey::new(PixKeyKind::Email, "ana@example.com").unwrap();

        directory.update_payout_key(id, &key).await.unwrap();
        assert_eq!(directory.get(id).unwrap().pix_key.as_deref(), Some("ana@example.com"));
    }

    #[tokio::test]
    async fn paused_lookup_waits_for_release() {
        let directory = InMemoryProfileDirectory::new();
        let id = IdentityId::new();
        directory.insert(ProfileRecord::new(id).with_role("admin"));
        directory.pause_lookups();

        let lookup = directory.get_profile(id);
        let release = async {
            tokio::task::yield_now().await;
            directory.release_lookups(1);
        };
        let (found, ()) = tokio::join!(lookup, release);
        assert_eq!(found.unwrap().unwrap().role.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn failing_directory_errors() {
        let directory = InMemoryProfileDirectory::new();
        directory.set_failing(true);
        assert!(matches!(
            directory.get_profile(IdentityId::new()).await,
            Err(DirectoryError::Network(_))
        ));
    }
}
