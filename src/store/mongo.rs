//! MongoDB-backed record store

use bson::doc;
use tracing::debug;

use super::{RecordStore, RecordVersion, VersionedRecord, WriteCondition};
use crate::db::schemas::version_filter;
use crate::db::{MongoClient, MongoCollection, PhoneRecordDoc};
use crate::model::PhoneRecord;
use crate::phone::PhoneKey;
use crate::types::StoreError;

/// Record store over a MongoDB collection
#[derive(Debug, Clone)]
pub struct MongoRecordStore {
    collection: MongoCollection<PhoneRecordDoc>,
}

impl MongoRecordStore {
    /// Open the collection, creating its indexes if needed
    pub async fn new(client: &MongoClient, collection_name: &str) -> Result<Self, StoreError> {
        let collection = client.collection::<PhoneRecordDoc>(collection_name).await?;
        Ok(Self { collection })
    }

    pub fn collection(&self) -> &MongoCollection<PhoneRecordDoc> {
        &self.collection
    }
}

#[async_trait::async_trait]
impl RecordStore for MongoRecordStore {
    async fn fetch_by_key(&self, key: &PhoneKey) -> Result<Option<VersionedRecord>, StoreError> {
        self.collection
            .find_one(doc! { "phoneNumber": key.as_str() })
            .await?
            .map(PhoneRecordDoc::into_record)
            .transpose()
    }

    async fn upsert(
        &self,
        record: &PhoneRecord,
        version: RecordVersion,
        condition: WriteCondition,
    ) -> Result<(), StoreError> {
        let stored = PhoneRecordDoc::from_record(record, version);

        match condition {
            WriteCondition::Always => {
                self.collection
                    .replace_one(doc! { "_id": record.id.as_str() }, stored, true)
                    .await?;
            }
            WriteCondition::IfAbsent => {
                self.collection.insert_one(stored).await?;
            }
            WriteCondition::IfVersion(expected) => {
                let result = self
                    .collection
                    .replace_one(version_filter(&record.id, expected), stored, false)
                    .await?;

                if result.matched_count == 0 {
                    debug!("Version {} of {} is stale", expected, record.phone_number);
                    return Err(StoreError::Conflict(record.phone_number.to_string()));
                }
            }
        }

        Ok(())
    }
}
