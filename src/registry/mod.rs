//! Thread merge engine
//!
//! Every operation is a read-modify-write against a `RecordStore`:
//! normalize the phone number, fetch the current record, apply a merge
//! rule, and write the whole document back.
//!
//! The store has no transactions, so two events for the same phone number
//! can read the same snapshot. How that race is handled depends on
//! `WriteMode`:
//!
//! - `LastWriterWins` writes unconditionally; the later write silently
//!   replaces the earlier one (lost update)
//! - `Optimistic` creates with insert-if-absent and updates with a
//!   version check, re-running the whole merge on conflict
//!
//! `serialize_per_key` additionally queues callers in this process per
//! phone number.

mod locks;
mod merge;

pub use locks::{KeyGuard, KeyLocks};
pub use merge::{apply_duration_update, apply_thread_event, MergeDecision};

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::model::{PhoneRecord, PlaybackDuration};
use crate::phone::{normalize, PhoneKey};
use crate::store::{RecordStore, RecordVersion, WriteCondition};
use crate::types::{NotFoundReason, Outcome, RegistryError, Result, StoreError};

/// How the engine writes merged records back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum WriteMode {
    /// Conditional writes keyed on the version read
    #[default]
    Optimistic,
    /// Blind overwrite of the whole document
    LastWriterWins,
}

/// Engine settings
#[derive(Clone)]
pub struct RegistryOptions {
    pub write_mode: WriteMode,
    /// Total fetch-merge-write attempts per call when writes conflict
    pub max_write_attempts: usize,
    /// Hold a per-phone-number lock across each read-modify-write
    pub serialize_per_key: bool,
    /// Refresh the entry timestamp in `update_playback_duration`
    pub touch_timestamp_on_duration_update: bool,
    pub clock: Arc<dyn Clock>,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            write_mode: WriteMode::default(),
            max_write_attempts: 5,
            serialize_per_key: false,
            touch_timestamp_on_duration_update: true,
            clock: Arc::new(SystemClock),
        }
    }
}

impl std::fmt::Debug for RegistryOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryOptions")
            .field("write_mode", &self.write_mode)
            .field("max_write_attempts", &self.max_write_attempts)
            .field("serialize_per_key", &self.serialize_per_key)
            .field(
                "touch_timestamp_on_duration_update",
                &self.touch_timestamp_on_duration_update,
            )
            .finish_non_exhaustive()
    }
}

/// Thread registry over a record store
pub struct ThreadRegistry<S: RecordStore> {
    store: S,
    options: RegistryOptions,
    locks: KeyLocks,
}

impl<S: RecordStore> ThreadRegistry<S> {
    pub fn new(store: S, options: RegistryOptions) -> Self {
        Self {
            store,
            options,
            locks: KeyLocks::new(),
        }
    }

    /// Record a thread event for a phone number.
    ///
    /// Creates the record on first sight of the phone number, appends
    /// unknown threads, and updates the duration of known threads when one
    /// is supplied. A known thread without a duration is `AlreadyExists`
    /// and nothing is written. A blank text duration counts as absent.
    pub async fn record_thread_event(
        &self,
        phone_number: &str,
        thread_id: &str,
        playback_duration: Option<PlaybackDuration>,
    ) -> Result<Outcome> {
        let key = normalize(phone_number)?;
        validate_thread_id(thread_id)?;
        let playback_duration = playback_duration.filter(|d| !d.is_blank());

        self.read_modify_write(&key, |current, now| {
            Ok(apply_thread_event(
                current,
                &key,
                thread_id,
                playback_duration.clone(),
                now,
            ))
        })
        .await
    }

    /// Set the playback duration of a thread registered earlier.
    ///
    /// Fails with `NotFound` instead of creating anything.
    pub async fn update_playback_duration(
        &self,
        phone_number: &str,
        thread_id: &str,
        playback_duration: PlaybackDuration,
    ) -> Result<Outcome> {
        let key = normalize(phone_number)?;
        validate_thread_id(thread_id)?;
        if playback_duration.is_blank() {
            return Err(RegistryError::InvalidIdentifier(
                "playback duration is empty".to_string(),
            ));
        }
        let touch = self.options.touch_timestamp_on_duration_update;

        self.read_modify_write(&key, |current, now| {
            apply_duration_update(
                current,
                &key,
                thread_id,
                playback_duration.clone(),
                touch.then_some(now),
            )
        })
        .await
    }

    /// Current record for a phone number, if any
    pub async fn lookup(&self, phone_number: &str) -> Result<Option<PhoneRecord>> {
        let key = normalize(phone_number)?;
        let current = self.store.fetch_by_key(&key).await?;
        Ok(current.map(|versioned| versioned.record))
    }

    /// Current record for a phone number; `NotFound` names the normalized key
    pub async fn get(&self, phone_number: &str) -> Result<PhoneRecord> {
        let key = normalize(phone_number)?;
        self.store
            .fetch_by_key(&key)
            .await?
            .map(|versioned| versioned.record)
            .ok_or_else(|| RegistryError::NotFound(NotFoundReason::PhoneNumber(key.to_string())))
    }

    async fn read_modify_write<F>(&self, key: &PhoneKey, merge: F) -> Result<Outcome>
    where
        F: FnMut(Option<PhoneRecord>, DateTime<Utc>) -> Result<MergeDecision>,
    {
        if !self.options.serialize_per_key {
            return self.merge_until_written(key, merge).await;
        }

        let _guard = self.locks.lock(key).await;
        self.merge_until_written(key, merge).await
    }

    async fn merge_until_written<F>(&self, key: &PhoneKey, mut merge: F) -> Result<Outcome>
    where
        F: FnMut(Option<PhoneRecord>, DateTime<Utc>) -> Result<MergeDecision>,
    {
        let max_attempts = self.options.max_write_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let current = self.store.fetch_by_key(key).await?;
            let base = current.as_ref().map(|versioned| versioned.version);
            let decision = merge(current.map(|versioned| versioned.record), self.options.clock.now())?;

            let (record, outcome) = match decision {
                MergeDecision::Write(record, outcome) => (record, outcome),
                MergeDecision::Skip(outcome) => {
                    debug!("{}: {:?}, nothing to write", key, outcome);
                    return Ok(outcome);
                }
            };

            let (version, condition) = self.write_plan(base);
            match self.store.upsert(&record, version, condition).await {
                Ok(()) => {
                    debug!("{}: {:?}, wrote {}", key, outcome, version);
                    return Ok(outcome);
                }
                Err(StoreError::Conflict(what)) if attempt < max_attempts => {
                    debug!(
                        "{}: write conflict on {} (attempt {}/{}), merging again",
                        key, what, attempt, max_attempts
                    );
                }
                Err(StoreError::Conflict(what)) => {
                    return Err(RegistryError::StoreUnavailable(StoreError::Conflict(format!(
                        "{} (gave up after {} conflicting writes)",
                        what, attempt
                    ))));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn write_plan(&self, base: Option<RecordVersion>) -> (RecordVersion, WriteCondition) {
        let version = base.map_or(RecordVersion::INITIAL, RecordVersion::next);
        let condition = match (self.options.write_mode, base) {
            (WriteMode::LastWriterWins, _) => WriteCondition::Always,
            (WriteMode::Optimistic, None) => WriteCondition::IfAbsent,
            (WriteMode::Optimistic, Some(read)) => WriteCondition::IfVersion(read),
        };
        (version, condition)
    }
}

fn validate_thread_id(thread_id: &str) -> Result<()> {
    if thread_id.trim().is_empty() {
        return Err(RegistryError::InvalidIdentifier(
            "thread ID is empty".to_string(),
        ));
    }
    Ok(())
}
