//! Configuration for the thread registry
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, Subcommand};
use std::sync::Arc;

use crate::clock::SystemClock;
use crate::db::PHONE_RECORD_COLLECTION;
use crate::registry::{RegistryOptions, WriteMode};

/// Thread Registry - per-phone-number conversation thread tracking
#[derive(Parser, Debug, Clone)]
#[command(name = "thread-registry")]
#[command(about = "Track conversation threads and playback durations per phone number")]
pub struct Args {
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "thread_registry")]
    pub mongodb_db: String,

    /// Collection holding one document per phone number
    #[arg(long, env = "MONGODB_COLLECTION", default_value = PHONE_RECORD_COLLECTION)]
    pub mongodb_collection: String,

    /// Use an in-memory store instead of MongoDB (records vanish on exit)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// How merged records are written back
    #[arg(long, env = "WRITE_MODE", value_enum, default_value_t = WriteMode::Optimistic)]
    pub write_mode: WriteMode,

    /// Fetch-merge-write attempts per call before giving up on conflicts
    #[arg(long, env = "MAX_WRITE_ATTEMPTS", default_value = "5")]
    pub max_write_attempts: usize,

    /// Serialize calls for the same phone number within this process
    #[arg(long, env = "SERIALIZE_PER_KEY", default_value = "false")]
    pub serialize_per_key: bool,

    /// Refresh an entry's timestamp when only its duration is updated
    #[arg(
        long,
        env = "TOUCH_TIMESTAMP_ON_DURATION_UPDATE",
        default_value = "true",
        action = clap::ArgAction::Set
    )]
    pub touch_timestamp_on_duration_update: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Register a thread for a phone number, optionally with a duration
    Record {
        phone_number: String,
        thread_id: String,
        #[arg(long)]
        duration: Option<String>,
    },
    /// Update the playback duration of a registered thread
    UpdateDuration {
        phone_number: String,
        thread_id: String,
        duration: String,
    },
    /// Print the record for a phone number as JSON
    Show { phone_number: String },
    /// Rewrite legacy string-encoded thread lists
    Migrate,
}

impl Args {
    /// Engine options derived from the arguments
    pub fn registry_options(&self) -> RegistryOptions {
        RegistryOptions {
            write_mode: self.write_mode,
            max_write_attempts: self.max_write_attempts,
            serialize_per_key: self.serialize_per_key,
            touch_timestamp_on_duration_update: self.touch_timestamp_on_duration_update,
            clock: Arc::new(SystemClock),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_write_attempts == 0 {
            return Err("MAX_WRITE_ATTEMPTS must be at least 1".to_string());
        }

        if self.mongodb_db.trim().is_empty() {
            return Err("MONGODB_DB must not be empty".to_string());
        }

        if self.mongodb_collection.trim().is_empty() {
            return Err("MONGODB_COLLECTION must not be empty".to_string());
        }

        if self.dev_mode && self.command == Command::Migrate {
            return Err("migrate needs MongoDB; it cannot run in dev mode".to_string());
        }

        Ok(())
    }
}
