//! `indica-auth`: client-side authorization gate.
//!
//! Data flows one way: identity provider → [`SessionStore`] → [`RoleResolver`] →
//! [`AccessGate`] → screen render or redirect. This crate owns the decisions and the
//! boundary traits; transports live in `indica-infra`.

pub mod error;
pub mod gate;
pub mod notifications;
pub mod profile;
pub mod provider;
pub mod requirement;
pub mod resolver;
pub mod role;
pub mod session;
pub mod store;

pub use error::AuthError;
pub use gate::{AccessDecision, AccessGate, AccessOutcome, AuthSnapshot};
pub use notifications::{RoleChanged, SessionChanged};
pub use profile::{DirectoryError, Profile, ProfileDirectory, ProfileRecord};
pub use provider::{IdentityProvider, ProviderError, SignUpRequest, TokenStore, TokenStoreError};
pub use requirement::AccessRequirement;
pub use resolver::RoleResolver;
pub use role::{Role, RoleState};
pub use session::{
    AccessToken, Identity, PersistedToken, Session, SessionStatus, TokenValidationError,
    validate_session,
};
pub use store::SessionStore;
