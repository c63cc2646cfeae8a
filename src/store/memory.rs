//! In-memory record store
//!
//! Keeps documents in insertion order, keyed by record ID. Like the real
//! document store it does not enforce one record per phone number on
//! unconditional writes, so duplicates can appear and lookups return the
//! first match.

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::{RecordStore, RecordVersion, VersionedRecord, WriteCondition};
use crate::model::PhoneRecord;
use crate::phone::PhoneKey;
use crate::types::StoreError;

/// Simple in-memory record store
#[derive(Default)]
pub struct InMemoryRecordStore {
    docs: RwLock<Vec<VersionedRecord>>,
    writes: AtomicUsize,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored document for a phone number, in insertion order
    pub async fn records_for(&self, key: &PhoneKey) -> Vec<VersionedRecord> {
        self.docs
            .read()
            .await
            .iter()
            .filter(|doc| &doc.record.phone_number == key)
            .cloned()
            .collect()
    }

    /// Total number of stored documents
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }

    /// Number of successful upserts since creation
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn fetch_by_key(&self, key: &PhoneKey) -> Result<Option<VersionedRecord>, StoreError> {
        Ok(self
            .docs
            .read()
            .await
            .iter()
            .find(|doc| &doc.record.phone_number == key)
            .cloned())
    }

    async fn upsert(
        &self,
        record: &PhoneRecord,
        version: RecordVersion,
        condition: WriteCondition,
    ) -> Result<(), StoreError> {
        let mut docs = self.docs.write().await;
        let position = docs.iter().position(|doc| doc.record.id == record.id);

        match condition {
            WriteCondition::Always => {}
            WriteCondition::IfAbsent => {
                if docs
                    .iter()
                    .any(|doc| doc.record.phone_number == record.phone_number)
                {
                    return Err(StoreError::Conflict(record.phone_number.to_string()));
                }
            }
            WriteCondition::IfVersion(expected) => {
                let current = position.map(|i| docs[i].version);
                if current != Some(expected) {
                    return Err(StoreError::Conflict(record.phone_number.to_string()));
                }
            }
        }

        let stored = VersionedRecord {
            record: record.clone(),
            version,
        };
        match position {
            Some(i) => docs[i] = stored,
            None => docs.push(stored),
        }
        self.writes.fetch_add(1, Ordering::SeqCst);

        Ok(())
    }
}
