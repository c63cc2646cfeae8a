//! Phone record data model
//!
//! One `PhoneRecord` per normalized phone number, holding an ordered list
//! of thread entries with unique thread IDs.

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::phone::PhoneKey;

/// Playback duration as supplied by the client
///
/// Clients send either a JSON number or a string; both are kept as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlaybackDuration {
    Seconds(f64),
    Text(String),
}

impl PlaybackDuration {
    /// Parse a command-line or form value, preferring a number
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<f64>() {
            Ok(seconds) if seconds.is_finite() => Self::Seconds(seconds),
            _ => Self::Text(trimmed.to_string()),
        }
    }

    /// An empty string counts as a missing value
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(text) if text.trim().is_empty())
    }
}

impl fmt::Display for PlaybackDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seconds(seconds) => write!(f, "{}", seconds),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// One tracked conversation thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadEntry {
    #[serde(rename = "threadID")]
    pub thread_id: String,

    #[serde(
        rename = "playbackDuration",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub playback_duration: Option<PlaybackDuration>,

    /// Time of last modification to this entry
    pub timestamp: DateTime<Utc>,
}

impl ThreadEntry {
    pub fn new(
        thread_id: impl Into<String>,
        playback_duration: Option<PlaybackDuration>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            playback_duration,
            timestamp,
        }
    }
}

/// All threads registered for one phone number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneRecord {
    /// Opaque identifier, fixed at creation
    pub id: String,

    #[serde(rename = "phoneNumber")]
    pub phone_number: PhoneKey,

    threads: Vec<ThreadEntry>,
}

impl PhoneRecord {
    /// Create a record holding exactly one entry
    pub fn new(id: String, phone_number: PhoneKey, first: ThreadEntry) -> Self {
        Self {
            id,
            phone_number,
            threads: vec![first],
        }
    }

    /// Rebuild a record from stored parts, keeping the first entry for
    /// any repeated thread ID
    pub fn from_parts(id: String, phone_number: PhoneKey, threads: Vec<ThreadEntry>) -> Self {
        let mut seen = HashSet::new();
        let threads = threads
            .into_iter()
            .filter(|entry| seen.insert(entry.thread_id.clone()))
            .collect();

        Self {
            id,
            phone_number,
            threads,
        }
    }

    pub fn threads(&self) -> &[ThreadEntry] {
        &self.threads
    }

    pub fn thread(&self, thread_id: &str) -> Option<&ThreadEntry> {
        self.threads.iter().find(|entry| entry.thread_id == thread_id)
    }

    pub fn thread_mut(&mut self, thread_id: &str) -> Option<&mut ThreadEntry> {
        self.threads
            .iter_mut()
            .find(|entry| entry.thread_id == thread_id)
    }

    /// Append an entry. Returns false, leaving the record untouched, when
    /// the thread ID is already present.
    pub fn push_thread(&mut self, entry: ThreadEntry) -> bool {
        if self.thread(&entry.thread_id).is_some() {
            return false;
        }
        self.threads.push(entry);
        true
    }
}

/// Generate a fresh record ID: 16 random bytes, lowercase hex
pub fn new_record_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
