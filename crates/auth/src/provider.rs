//! Identity provider and token persistence boundaries.

use async_trait::async_trait;
use thiserror::Error;

use crate::session::{AccessToken, PersistedToken, Session};

/// Failure reported by the identity provider.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Unknown email or wrong password (the provider need not say which).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The token is unknown, revoked, expired or malformed.
    #[error("invalid or expired token")]
    InvalidToken,

    /// The provider could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The provider answered but refused the request.
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Account creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// External authentication service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ProviderError>;

    /// Create an account. Does not authenticate; the provider may require verification.
    async fn sign_up(&self, request: &SignUpRequest) -> Result<(), ProviderError>;

    /// Revoke the token server-side.
    async fn sign_out(&self, token: &AccessToken) -> Result<(), ProviderError>;

    /// Exchange a persisted token for a live session if the provider still honours it.
    async fn validate(&self, token: &PersistedToken) -> Result<Session, ProviderError>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenStoreError {
    #[error("token storage io error: {0}")]
    Io(String),

    #[error("persisted token is corrupt: {0}")]
    Corrupt(String),
}

/// Where the session token lives between runs.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<PersistedToken>, TokenStoreError>;

    fn save(&self, token: &PersistedToken) -> Result<(), TokenStoreError>;

    fn clear(&self) -> Result<(), TokenStoreError>;
}
