//! Thread Registry command-line front end
//!
//! Thin transport over the merge engine: parses arguments, runs one
//! operation, and maps the outcome to a message and exit code.

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use thread_registry::{
    clock::SystemClock,
    config::{Args, Command},
    db::{migrate_legacy_threads, MongoClient},
    InMemoryRecordStore, MongoRecordStore, Outcome, PlaybackDuration, RecordStore, RegistryError,
    ThreadRegistry,
};

/// Exit code for caller errors (bad identifier, unknown phone or thread)
const EXIT_CLIENT_ERROR: i32 = 2;
/// Exit code for store failures
const EXIT_SERVER_ERROR: i32 = 1;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("thread_registry={},info", args.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if args.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(EXIT_CLIENT_ERROR);
    }

    info!(
        "Store: {}",
        if args.dev_mode {
            "in-memory (DEV_MODE)".to_string()
        } else {
            format!("{} / {}.{}", args.mongodb_uri, args.mongodb_db, args.mongodb_collection)
        }
    );
    info!("Write mode: {:?}", args.write_mode);

    if args.dev_mode {
        return run(&args, Arc::new(InMemoryRecordStore::new()), None).await;
    }

    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => client,
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(EXIT_SERVER_ERROR);
        }
    };
    let store = Arc::new(MongoRecordStore::new(&mongo, &args.mongodb_collection).await?);

    run(&args, store.clone(), Some(store.as_ref())).await
}

/// Run the requested command. `mongo` is the backing MongoDB store, if any;
/// only `migrate` needs it directly.
async fn run(
    args: &Args,
    store: Arc<dyn RecordStore>,
    mongo: Option<&MongoRecordStore>,
) -> anyhow::Result<()> {
    let registry = ThreadRegistry::new(store, args.registry_options());

    let result = match &args.command {
        Command::Record {
            phone_number,
            thread_id,
            duration,
        } => registry
            .record_thread_event(
                phone_number,
                thread_id,
                duration.as_deref().map(PlaybackDuration::parse),
            )
            .await
            .map(|outcome| record_message(outcome).to_string()),
        Command::UpdateDuration {
            phone_number,
            thread_id,
            duration,
        } => registry
            .update_playback_duration(phone_number, thread_id, PlaybackDuration::parse(duration))
            .await
            .map(|_| "Playback duration added successfully.".to_string()),
        Command::Show { phone_number } => match registry.get(phone_number).await {
            Ok(record) => Ok(serde_json::to_string_pretty(&record)?),
            Err(e) => Err(e),
        },
        Command::Migrate => {
            let Some(mongo) = mongo else {
                anyhow::bail!("migrate requires a MongoDB store");
            };
            match migrate_legacy_threads(mongo.collection(), &SystemClock).await {
                Ok(report) => Ok(serde_json::to_string_pretty(&report)?),
                Err(e) => Err(RegistryError::from(e)),
            }
        }
    };

    match result {
        Ok(message) => {
            println!("{}", message);
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            let code = if e.is_client_error() {
                EXIT_CLIENT_ERROR
            } else {
                EXIT_SERVER_ERROR
            };
            std::process::exit(code);
        }
    }
}

fn record_message(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Created => "Thread ID added successfully.",
        Outcome::Updated => "Playback duration added successfully.",
        Outcome::AlreadyExists => "Thread ID already exists. Not added again.",
    }
}
