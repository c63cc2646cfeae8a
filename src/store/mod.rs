//! Record store adapters
//!
//! The store offers point lookup by phone number and whole-document
//! upsert. There are no partial updates and no transactions spanning a
//! read and a write; the version token on every record is the hook for
//! conditional writes.

mod memory;
mod mongo;

pub use memory::InMemoryRecordStore;
pub use mongo::MongoRecordStore;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::PhoneRecord;
use crate::phone::PhoneKey;
use crate::types::StoreError;

/// Monotonic per-record write counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordVersion(pub i64);

impl RecordVersion {
    /// Version carried by a freshly created record
    pub const INITIAL: RecordVersion = RecordVersion(1);

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for RecordVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A record together with the version it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedRecord {
    pub record: PhoneRecord,
    pub version: RecordVersion,
}

/// Precondition attached to an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteCondition {
    /// Overwrite whatever is stored under the record ID, or insert
    Always,
    /// Insert only if no record exists for the phone number
    IfAbsent,
    /// Replace only while the stored version still equals this one
    IfVersion(RecordVersion),
}

/// Trait for record storage (allows different backends)
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up the record for a normalized phone number.
    ///
    /// If the store holds more than one document for the key, the first
    /// one is returned.
    async fn fetch_by_key(&self, key: &PhoneKey) -> Result<Option<VersionedRecord>, StoreError>;

    /// Write the full record, stamping it with `version`.
    ///
    /// A failed precondition is reported as `StoreError::Conflict`.
    async fn upsert(
        &self,
        record: &PhoneRecord,
        version: RecordVersion,
        condition: WriteCondition,
    ) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
impl<S: RecordStore + ?Sized> RecordStore for std::sync::Arc<S> {
    async fn fetch_by_key(&self, key: &PhoneKey) -> Result<Option<VersionedRecord>, StoreError> {
        (**self).fetch_by_key(key).await
    }

    async fn upsert(
        &self,
        record: &PhoneRecord,
        version: RecordVersion,
        condition: WriteCondition,
    ) -> Result<(), StoreError> {
        (**self).upsert(record, version, condition).await
    }
}
