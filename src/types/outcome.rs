//! Successful operation outcomes

use serde::{Deserialize, Serialize};

/// What a successful merge did to the stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// A new record or a new thread entry was written
    Created,
    /// An existing thread entry was changed in place
    Updated,
    /// The thread was already registered; nothing was written
    AlreadyExists,
}
