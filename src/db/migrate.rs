//! One-time migration of legacy thread lists
//!
//! Rewrites every document whose `threads` field is still a JSON string
//! into the structured entry list. Each rewrite is conditional on the
//! version read, so a concurrent merge is never overwritten.

use bson::{doc, Document};
use serde::Serialize;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::db::mongo::MongoCollection;
use crate::db::schemas::{decode_legacy_threads, version_filter, PhoneRecordDoc, StoredThreads};
use crate::store::RecordVersion;
use crate::types::StoreError;

/// Summary of a migration run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Legacy documents found
    pub scanned: usize,
    /// Documents rewritten to the structured form
    pub migrated: usize,
    /// Documents left alone (undecodable, or changed during the run)
    pub skipped: usize,
}

/// Decode raw legacy documents, returning those that decoded and how
/// many did not
pub fn decode_candidates(raw: Vec<Document>) -> (Vec<PhoneRecordDoc>, usize) {
    let mut decoded = Vec::with_capacity(raw.len());
    let mut undecodable = 0;

    for document in raw {
        let id = document
            .get("_id")
            .map(|id| id.to_string())
            .unwrap_or_default();
        match bson::from_document::<PhoneRecordDoc>(document) {
            Ok(stored) => decoded.push(stored),
            Err(e) => {
                warn!("Record {} cannot be read, skipping: {}", id, e);
                undecodable += 1;
            }
        }
    }

    (decoded, undecodable)
}

/// Convert one legacy document in place. Returns false when the thread
/// list cannot be decoded.
pub fn upgrade_document(doc: &mut PhoneRecordDoc, clock: &dyn Clock) -> bool {
    let StoredThreads::Legacy(raw) = &doc.threads else {
        return true;
    };

    match decode_legacy_threads(raw, clock.now()) {
        Ok(entries) => {
            doc.threads = StoredThreads::Entries(entries);
            doc.version += 1;
            true
        }
        Err(e) => {
            warn!("Record {} has an undecodable thread list: {}", doc.id, e);
            false
        }
    }
}

/// Migrate all legacy documents in the collection
pub async fn migrate_legacy_threads(
    collection: &MongoCollection<PhoneRecordDoc>,
    clock: &dyn Clock,
) -> Result<MigrationReport, StoreError> {
    let raw = collection
        .find_documents(doc! { "threads": { "$type": "string" } })
        .await?;
    let scanned = raw.len();
    let (legacy, undecodable) = decode_candidates(raw);

    let mut report = MigrationReport {
        scanned,
        skipped: undecodable,
        ..Default::default()
    };
    info!("Found {} record(s) with legacy thread lists", report.scanned);

    for mut stored in legacy {
        let read_version = RecordVersion(stored.version);
        if !upgrade_document(&mut stored, clock) {
            report.skipped += 1;
            continue;
        }

        let id = stored.id.clone();
        let result = collection
            .replace_one(version_filter(&id, read_version), stored, false)
            .await?;

        if result.matched_count == 0 {
            warn!("Record {} changed during migration, skipping", id);
            report.skipped += 1;
        } else {
            report.migrated += 1;
        }
    }

    info!(
        "Migration finished: {} migrated, {} skipped",
        report.migrated, report.skipped
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};

    fn legacy_doc(threads: &str) -> PhoneRecordDoc {
        PhoneRecordDoc {
            id: "abc".into(),
            phone_number: "2125550100".into(),
            threads: StoredThreads::Legacy(threads.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_upgrade_document_converts_and_bumps_version() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::new(at);
        let mut doc = legacy_doc(r#"["t1","t2"]"#);

        assert!(upgrade_document(&mut doc, &clock));
        assert!(!doc.is_legacy());
        assert_eq!(doc.version, 1);

        let versioned = doc.into_record().unwrap();
        assert_eq!(versioned.record.threads().len(), 2);
        assert_eq!(versioned.record.thread("t2").unwrap().timestamp, at);
    }

    #[test]
    fn test_upgrade_document_leaves_undecodable_alone() {
        let clock = ManualClock::new(Utc::now());
        let mut doc = legacy_doc("t1;t2");

        assert!(!upgrade_document(&mut doc, &clock));
        assert!(doc.is_legacy());
        assert_eq!(doc.version, 0);
    }

    #[test]
    fn test_unreadable_documents_are_counted() {
        let raw = vec![
            doc! {
                "_id": "abc",
                "phoneNumber": "2125550100",
                "threads": r#"["t1"]"#,
            },
            doc! {
                "_id": bson::oid::ObjectId::new(),
                "phoneNumber": "2125550101",
                "threads": r#"["t2"]"#,
            },
            doc! { "_id": "no-phone", "threads": "[]" },
        ];

        let (decoded, undecodable) = decode_candidates(raw);

        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].id, "abc");
        assert!(decoded[0].is_legacy());
        assert_eq!(undecodable, 2);
    }

    #[test]
    fn test_upgrade_document_ignores_structured() {
        let clock = ManualClock::new(Utc::now());
        let mut doc = PhoneRecordDoc {
            id: "abc".into(),
            phone_number: "2125550100".into(),
            version: 4,
            ..Default::default()
        };

        assert!(upgrade_document(&mut doc, &clock));
        assert_eq!(doc.version, 4);
    }
}
