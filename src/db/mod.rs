//! Database layer
//!
//! MongoDB client, typed collection wrapper, document schemas and the
//! one-time legacy thread-list migration.

pub mod migrate;
pub mod mongo;
pub mod schemas;

pub use migrate::{migrate_legacy_threads, MigrationReport};
pub use mongo::{MongoClient, MongoCollection};
pub use schemas::{Metadata, PhoneRecordDoc, StoredThreads, PHONE_RECORD_COLLECTION};
