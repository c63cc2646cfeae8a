//! Common metadata for stored documents

use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Bookkeeping maintained by the collection wrapper
///
/// Records are always written whole, so only the last-write time is
/// tracked here.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    /// When the document was last written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}
