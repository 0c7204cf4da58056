//! Token persisted as a JSON file (the desktop equivalent of browser local storage).

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use indica_auth::{PersistedToken, TokenStore, TokenStoreError};

#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<PersistedToken>, TokenStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(TokenStoreError::Io(e.to_string())),
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| TokenStoreError::Corrupt(e.to_string()))
    }

    fn save(&self, token: &PersistedToken) -> Result<(), TokenStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| TokenStoreError::Io(e.to_string()))?;
        }
        let json = serde_json::to_string(token).map_err(|e| TokenStoreError::Io(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| TokenStoreError::Io(e.to_string()))?;
        debug!(path = %self.path.display(), "session token saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TokenStoreError::Io(e.to_string())),
        }
    }
}
