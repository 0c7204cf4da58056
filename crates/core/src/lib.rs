//! `indica-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod payout;
pub mod value_object;

pub use error::{DomainError, DomainResult};
pub use id::IdentityId;
pub use payout::{PixKey, PixKeyKind};
pub use value_object::ValueObject;
