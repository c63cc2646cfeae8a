//! Error types for the thread registry
//!
//! Two layers: `StoreError` is what a record store adapter reports, and
//! `RegistryError` is what the merge engine hands back to its caller.

use std::fmt;

/// Which referenced entity was missing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundReason {
    /// No record exists for the normalized phone number
    PhoneNumber(String),
    /// The record exists but holds no entry for the thread ID
    Thread(String),
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFoundReason::PhoneNumber(key) => write!(f, "Phone number not found: {}", key),
            NotFoundReason::Thread(thread_id) => write!(f, "Thread ID not found: {}", thread_id),
        }
    }
}

/// Errors returned by the merge engine operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Malformed or missing required field
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("{0}")]
    NotFound(NotFoundReason),

    /// Transient store failure; the caller may retry
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

impl RegistryError {
    /// Whether the failure was caused by the request itself
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidIdentifier(_) | Self::NotFound(_))
    }

    /// Whether repeating the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

/// Errors reported by a record store adapter
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Read or write did not reach the store, or the store rejected it
    #[error("Database error: {0}")]
    Unavailable(String),

    /// A conditional write found the stored state changed underneath it
    #[error("Write conflict on {0}")]
    Conflict(String),

    /// The stored document still uses the delimited-text thread list
    #[error("Record {0} uses the legacy thread encoding; run the migrate command")]
    LegacyEncoding(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
