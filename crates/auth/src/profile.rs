//! Profile rows and the directory they are read from.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use indica_core::{IdentityId, PixKey};

use crate::role::Role;

/// A `profiles` row as the backend returns it. Every attribute may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: IdentityId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub pix_key: Option<String>,
}

impl ProfileRecord {
    pub fn new(id: IdentityId) -> Self {
        Self {
            id,
            name: None,
            role: None,
            pix_key: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_pix_key(mut self, pix_key: impl Into<String>) -> Self {
        self.pix_key = Some(pix_key.into());
        self
    }
}

/// Profile as the client sees it: role always one of the four values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub identity_id: IdentityId,
    pub display_name: String,
    pub role: Role,
    pub payout_key: Option<PixKey>,
}

impl From<ProfileRecord> for Profile {
    fn from(record: ProfileRecord) -> Self {
        let payout_key = record.pix_key.as_deref().and_then(|raw| match PixKey::parse(raw) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!(identity_id = %record.id, error = %e, "ignoring malformed stored pix key");
                None
            }
        });

        Profile {
            identity_id: record.id,
            display_name: record.name.unwrap_or_default(),
            role: Role::from_profile_value(record.role.as_deref()),
            payout_key,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("profile directory unreachable: {0}")]
    Network(String),

    #[error("profile directory failed: {0}")]
    Backend(String),

    #[error("undecodable profile row: {0}")]
    Decode(String),
}

/// Read access to profile rows, plus the one self-editable field.
///
/// Lookups are eventually consistent: a freshly signed-up identity may have no row yet,
/// which is `Ok(None)`, not an error.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn get_profile(&self, id: IdentityId) -> Result<Option<ProfileRecord>, DirectoryError>;

    async fn update_payout_key(&self, id: IdentityId, key: &PixKey) -> Result<(), DirectoryError>;
}
