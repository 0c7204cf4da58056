//! Infrastructure layer: adapters behind the `indica-auth` boundary traits.
//!
//! - `memory`: in-process adapters for tests and local development
//! - `token_file`: persisted session token on disk
//! - `config`: backend settings from the environment
//! - `supabase` (feature): HTTP adapters for the hosted backend

pub mod config;
pub mod memory;
pub mod token_file;

#[cfg(feature = "supabase")]
pub mod supabase;

pub use config::{BackendConfig, ConfigError};
pub use memory::{InMemoryIdentityProvider, InMemoryProfileDirectory, InMemoryTokenStore};
pub use token_file::FileTokenStore;

#[cfg(feature = "supabase")]
pub use supabase::{SupabaseBackend, SupabaseClient, SupabaseIdentityProvider, SupabaseProfileDirectory};
