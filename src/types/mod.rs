//! Shared types: errors and operation outcomes

mod error;
mod outcome;

pub use error::{NotFoundReason, RegistryError, Result, StoreError};
pub use outcome::Outcome;
