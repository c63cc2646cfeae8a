//! Shared test stores and fixtures

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thread_registry::clock::ManualClock;
use thread_registry::store::{RecordVersion, VersionedRecord, WriteCondition};
use thread_registry::{
    InMemoryRecordStore, PhoneKey, PhoneRecord, RecordStore, RegistryOptions, StoreError, WriteMode,
};

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(start_time()))
}

pub fn options(write_mode: WriteMode, clock: Arc<ManualClock>) -> RegistryOptions {
    RegistryOptions {
        write_mode,
        clock,
        ..Default::default()
    }
}

/// Store that pauses after every read, so concurrent callers read the
/// same snapshot before either writes
pub struct StallingStore {
    inner: Arc<InMemoryRecordStore>,
    stall: Duration,
}

impl StallingStore {
    pub fn new(inner: Arc<InMemoryRecordStore>, stall: Duration) -> Self {
        Self { inner, stall }
    }
}

#[async_trait::async_trait]
impl RecordStore for StallingStore {
    async fn fetch_by_key(&self, key: &PhoneKey) -> Result<Option<VersionedRecord>, StoreError> {
        let current = self.inner.fetch_by_key(key).await;
        tokio::time::sleep(self.stall).await;
        current
    }

    async fn upsert(
        &self,
        record: &PhoneRecord,
        version: RecordVersion,
        condition: WriteCondition,
    ) -> Result<(), StoreError> {
        self.inner.upsert(record, version, condition).await
    }
}

/// Store that counts calls and can be told to fail
#[derive(Default)]
pub struct CountingStore {
    pub inner: InMemoryRecordStore,
    pub fetches: AtomicUsize,
    pub upserts: AtomicUsize,
    pub fail_fetch: AtomicBool,
    pub fail_upsert: AtomicBool,
    pub conflict_upsert: AtomicBool,
}

impl CountingStore {
    pub fn calls(&self) -> usize {
        self.fetches.load(Ordering::SeqCst) + self.upserts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RecordStore for CountingStore {
    async fn fetch_by_key(&self, key: &PhoneKey) -> Result<Option<VersionedRecord>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset".into()));
        }
        self.inner.fetch_by_key(key).await
    }

    async fn upsert(
        &self,
        record: &PhoneRecord,
        version: RecordVersion,
        condition: WriteCondition,
    ) -> Result<(), StoreError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write timed out".into()));
        }
        if self.conflict_upsert.load(Ordering::SeqCst) {
            return Err(StoreError::Conflict(record.phone_number.to_string()));
        }
        self.inner.upsert(record, version, condition).await
    }
}
