//! Phone record document schema
//!
//! Stores the thread list for one normalized phone number. Older
//! documents carry `threads` as a JSON-encoded string array of thread IDs;
//! `StoredThreads::Legacy` lets those still decode so the migration can
//! find and rewrite them.

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::model::{PhoneRecord, ThreadEntry};
use crate::phone::normalize;
use crate::store::{RecordVersion, VersionedRecord};
use crate::types::StoreError;

/// Collection name for phone records
pub const PHONE_RECORD_COLLECTION: &str = "phone_records";

/// Thread list as found in the collection
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum StoredThreads {
    Entries(Vec<ThreadEntry>),
    /// JSON text such as `["t1","t2"]`
    Legacy(String),
}

impl Default for StoredThreads {
    fn default() -> Self {
        Self::Entries(Vec::new())
    }
}

/// Phone record document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PhoneRecordDoc {
    /// Record ID, also the MongoDB document ID
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub metadata: Metadata,

    #[serde(rename = "phoneNumber")]
    pub phone_number: String,

    #[serde(default)]
    pub threads: StoredThreads,

    /// Write counter used for conditional replaces; absent on documents
    /// written before versioning, which read as version 0
    #[serde(default)]
    pub version: i64,
}

impl PhoneRecordDoc {
    pub fn from_record(record: &PhoneRecord, version: RecordVersion) -> Self {
        Self {
            id: record.id.clone(),
            metadata: Metadata::default(),
            phone_number: record.phone_number.to_string(),
            threads: StoredThreads::Entries(record.threads().to_vec()),
            version: version.0,
        }
    }

    /// Convert into the domain record. Legacy thread encodings are refused.
    pub fn into_record(self) -> Result<VersionedRecord, StoreError> {
        let threads = match self.threads {
            StoredThreads::Entries(entries) => entries,
            StoredThreads::Legacy(_) => return Err(StoreError::LegacyEncoding(self.id)),
        };

        let phone_number = normalize(&self.phone_number).map_err(|_| {
            StoreError::Unavailable(format!(
                "record {} holds malformed phone number {:?}",
                self.id, self.phone_number
            ))
        })?;

        Ok(VersionedRecord {
            record: PhoneRecord::from_parts(self.id, phone_number, threads),
            version: RecordVersion(self.version),
        })
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self.threads, StoredThreads::Legacy(_))
    }
}

/// Filter matching a record ID at a given version. Version 0 also
/// matches documents that predate the version field.
pub fn version_filter(id: &str, version: RecordVersion) -> Document {
    if version.0 == 0 {
        doc! {
            "_id": id,
            "$or": [ { "version": 0_i64 }, { "version": { "$exists": false } } ],
        }
    } else {
        doc! { "_id": id, "version": version.0 }
    }
}

/// Decode a legacy thread list into entries stamped with `at`.
///
/// Duplicate IDs are dropped, first occurrence kept.
pub fn decode_legacy_threads(
    raw: &str,
    at: DateTime<Utc>,
) -> Result<Vec<ThreadEntry>, serde_json::Error> {
    let ids: Vec<String> = serde_json::from_str(raw)?;

    let mut entries: Vec<ThreadEntry> = Vec::with_capacity(ids.len());
    for id in ids {
        if !entries.iter().any(|e| e.thread_id == id) {
            entries.push(ThreadEntry::new(id, None, at));
        }
    }

    Ok(entries)
}

impl IntoIndexes for PhoneRecordDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // One record per phone number
            (
                doc! { "phoneNumber": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("phone_number_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for PhoneRecordDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
