//! MongoDB client and collection wrapper

use bson::{doc, DateTime, Document};
use futures_util::TryStreamExt;
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{info, warn};

use crate::db::schemas::Metadata;
use crate::types::StoreError;

/// MongoDB duplicate key error code
const DUPLICATE_KEY: i32 = 11000;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, StoreError> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::Unavailable(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, StoreError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + Default + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + Default + IntoIndexes + MutMetadata,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, StoreError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<(), StoreError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        match self.inner.create_indexes(indices).await {
            Ok(_) => Ok(()),
            // Existing duplicates block a unique index; reads still take the first match
            Err(e) if is_duplicate_key(&e) => {
                warn!(
                    "Unique index not built on {}, collection holds duplicate keys: {}",
                    self.inner.name(),
                    e
                );
                Ok(())
            }
            Err(e) => Err(StoreError::Unavailable(format!(
                "Failed to create indexes: {}",
                e
            ))),
        }
    }

    /// Insert a document, stamping its metadata.
    ///
    /// A unique-index violation is reported as a conflict.
    pub async fn insert_one(&self, mut item: T) -> Result<(), StoreError> {
        item.mut_metadata().updated_at = Some(DateTime::now());

        self.inner.insert_one(item).await.map_err(|e| {
            if is_duplicate_key(&e) {
                StoreError::Conflict(format!("duplicate key: {}", e))
            } else {
                StoreError::Unavailable(format!("Insert failed: {}", e))
            }
        })?;

        Ok(())
    }

    /// Replace the document matching `filter`, refreshing `updated_at`
    pub async fn replace_one(
        &self,
        filter: Document,
        mut item: T,
        upsert: bool,
    ) -> Result<UpdateResult, StoreError> {
        item.mut_metadata().updated_at = Some(DateTime::now());

        self.inner
            .replace_one(filter, item)
            .upsert(upsert)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    StoreError::Conflict(format!("duplicate key: {}", e))
                } else {
                    StoreError::Unavailable(format!("Replace failed: {}", e))
                }
            })
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, StoreError> {
        self.inner
            .find_one(filter)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Find failed: {}", e)))
    }

    /// Find many documents by filter as raw BSON, leaving decoding to the
    /// caller so unreadable documents can be reported rather than lost
    pub async fn find_documents(&self, filter: Document) -> Result<Vec<Document>, StoreError> {
        let cursor = self
            .inner
            .clone_with_type::<Document>()
            .find(filter)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Find failed: {}", e)))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| StoreError::Unavailable(format!("Cursor failed: {}", e)))
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    is_duplicate_key_kind(err.kind.as_ref())
}

/// Writes report E11000 as a write error, index builds as a command error
fn is_duplicate_key_kind(kind: &ErrorKind) -> bool {
    match kind {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY,
        _ => false,
    }
}
