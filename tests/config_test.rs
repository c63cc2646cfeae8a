//! Argument parsing and validation

use clap::Parser;

use thread_registry::config::{Args, Command};
use thread_registry::WriteMode;

fn parse(argv: &[&str]) -> Args {
    let mut full = vec!["thread-registry"];
    full.extend_from_slice(argv);
    Args::try_parse_from(full).expect("arguments should parse")
}

#[test]
fn test_defaults() {
    let args = parse(&["show", "2125550100"]);

    assert_eq!(args.mongodb_db, "thread_registry");
    assert_eq!(args.mongodb_collection, "phone_records");
    assert_eq!(args.write_mode, WriteMode::Optimistic);
    assert_eq!(args.max_write_attempts, 5);
    assert!(!args.serialize_per_key);
    assert!(args.touch_timestamp_on_duration_update);
    assert!(args.validate().is_ok());
}

#[test]
fn test_record_command_with_duration() {
    let args = parse(&["record", "+1 212 555 0100", "T1", "--duration", "42.5"]);

    assert_eq!(
        args.command,
        Command::Record {
            phone_number: "+1 212 555 0100".into(),
            thread_id: "T1".into(),
            duration: Some("42.5".into()),
        }
    );
}

#[test]
fn test_concurrency_flags() {
    let args = parse(&[
        "--write-mode",
        "last-writer-wins",
        "--serialize-per-key",
        "--touch-timestamp-on-duration-update",
        "false",
        "update-duration",
        "2125550100",
        "T1",
        "10",
    ]);

    let options = args.registry_options();
    assert_eq!(options.write_mode, WriteMode::LastWriterWins);
    assert!(options.serialize_per_key);
    assert!(!options.touch_timestamp_on_duration_update);
}

#[test]
fn test_validate_rejects_zero_attempts() {
    let args = parse(&["--max-write-attempts", "0", "show", "2125550100"]);
    assert!(args.validate().is_err());
}

#[test]
fn test_validate_rejects_migrate_in_dev_mode() {
    let args = parse(&["--dev-mode", "migrate"]);
    assert!(args.validate().unwrap_err().contains("migrate"));
}

#[test]
fn test_unknown_write_mode_is_rejected() {
    let result = Args::try_parse_from(["thread-registry", "--write-mode", "yolo", "migrate"]);
    assert!(result.is_err());
}
