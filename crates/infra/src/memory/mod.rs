//! In-memory adapters for tests/dev.

pub mod identity;
pub mod profiles;
pub mod tokens;

pub use identity::InMemoryIdentityProvider;
pub use profiles::InMemoryProfileDirectory;
pub use tokens::InMemoryTokenStore;
