//! Thread Registry - per-phone-number conversation thread tracking
//!
//! Keeps, for every phone number, the list of conversation threads it has
//! taken part in and the last reported playback duration of each. Records
//! live in a document store keyed on the normalized phone number.
//!
//! ## Layers
//!
//! - **phone**: syntactic phone number normalization
//! - **model**: `PhoneRecord` / `ThreadEntry`
//! - **store**: `RecordStore` trait with in-memory and MongoDB adapters
//! - **registry**: the read-modify-write merge engine
//! - **db**: MongoDB collection wrapper, schemas, legacy migration

pub mod clock;
pub mod config;
pub mod db;
pub mod model;
pub mod phone;
pub mod registry;
pub mod store;
pub mod types;

pub use config::Args;
pub use model::{PhoneRecord, PlaybackDuration, ThreadEntry};
pub use phone::{normalize, PhoneKey};
pub use registry::{RegistryOptions, ThreadRegistry, WriteMode};
pub use store::{InMemoryRecordStore, MongoRecordStore, RecordStore};
pub use types::{NotFoundReason, Outcome, RegistryError, Result, StoreError};
