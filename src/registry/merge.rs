//! Merge rules
//!
//! Pure functions deciding what a thread event does to the current
//! record. They never touch the store.

use chrono::{DateTime, Utc};

use crate::model::{new_record_id, PhoneRecord, PlaybackDuration, ThreadEntry};
use crate::phone::PhoneKey;
use crate::types::{NotFoundReason, Outcome, RegistryError};

/// Result of applying an event to the current record
#[derive(Debug, Clone, PartialEq)]
pub enum MergeDecision {
    /// Write this record back
    Write(PhoneRecord, Outcome),
    /// Leave the store untouched
    Skip(Outcome),
}

/// Register a thread, or refresh its duration when one is supplied.
///
/// - no record: create one holding just this thread
/// - thread known, no duration: `AlreadyExists`, nothing to write
/// - thread known, duration given: update duration and timestamp
/// - thread unknown: append it
pub fn apply_thread_event(
    current: Option<PhoneRecord>,
    key: &PhoneKey,
    thread_id: &str,
    playback_duration: Option<PlaybackDuration>,
    now: DateTime<Utc>,
) -> MergeDecision {
    let Some(mut record) = current else {
        let entry = ThreadEntry::new(thread_id, playback_duration, now);
        let record = PhoneRecord::new(new_record_id(), key.clone(), entry);
        return MergeDecision::Write(record, Outcome::Created);
    };

    if let Some(entry) = record.thread_mut(thread_id) {
        return match playback_duration {
            None => MergeDecision::Skip(Outcome::AlreadyExists),
            Some(duration) => {
                entry.playback_duration = Some(duration);
                entry.timestamp = now;
                MergeDecision::Write(record, Outcome::Updated)
            }
        };
    }

    record.push_thread(ThreadEntry::new(thread_id, playback_duration, now));
    MergeDecision::Write(record, Outcome::Created)
}

/// Set the duration of an already registered thread.
///
/// `touched_at` refreshes the entry timestamp when given. Never creates a
/// record or an entry.
pub fn apply_duration_update(
    current: Option<PhoneRecord>,
    key: &PhoneKey,
    thread_id: &str,
    playback_duration: PlaybackDuration,
    touched_at: Option<DateTime<Utc>>,
) -> Result<MergeDecision, RegistryError> {
    let mut record = current.ok_or_else(|| {
        RegistryError::NotFound(NotFoundReason::PhoneNumber(key.to_string()))
    })?;

    let entry = record
        .thread_mut(thread_id)
        .ok_or_else(|| RegistryError::NotFound(NotFoundReason::Thread(thread_id.to_string())))?;

    entry.playback_duration = Some(playback_duration);
    if let Some(at) = touched_at {
        entry.timestamp = at;
    }

    Ok(MergeDecision::Write(record, Outcome::Updated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phone::normalize;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn key() -> PhoneKey {
        normalize("2125550100").unwrap()
    }

    fn existing() -> PhoneRecord {
        let mut record = PhoneRecord::new("r1".into(), key(), ThreadEntry::new("T1", None, at(0)));
        record.push_thread(ThreadEntry::new(
            "T2",
            Some(PlaybackDuration::Seconds(5.0)),
            at(1),
        ));
        record
    }

    #[test]
    fn test_first_event_creates_record_with_one_entry() {
        let decision = apply_thread_event(None, &key(), "T1", None, at(10));

        let MergeDecision::Write(record, outcome) = decision else {
            panic!("expected a write");
        };
        assert_eq!(outcome, Outcome::Created);
        assert_eq!(record.phone_number, key());
        assert_eq!(record.threads(), &[ThreadEntry::new("T1", None, at(10))]);
        assert_eq!(record.id.len(), 32);
    }

    #[test]
    fn test_known_thread_without_duration_is_skipped() {
        let decision = apply_thread_event(Some(existing()), &key(), "T1", None, at(10));
        assert_eq!(decision, MergeDecision::Skip(Outcome::AlreadyExists));
    }

    #[test]
    fn test_known_thread_with_duration_updates_in_place() {
        let duration = Some(PlaybackDuration::Text("42.5".into()));
        let decision = apply_thread_event(Some(existing()), &key(), "T1", duration.clone(), at(10));

        let MergeDecision::Write(record, outcome) = decision else {
            panic!("expected a write");
        };
        assert_eq!(outcome, Outcome::Updated);
        assert_eq!(record.id, "r1");
        assert_eq!(record.threads()[0], ThreadEntry::new("T1", duration, at(10)));
        assert_eq!(record.threads()[1], existing().threads()[1]);
    }

    #[test]
    fn test_unknown_thread_is_appended() {
        let decision = apply_thread_event(Some(existing()), &key(), "T3", None, at(10));

        let MergeDecision::Write(record, outcome) = decision else {
            panic!("expected a write");
        };
        assert_eq!(outcome, Outcome::Created);
        let ids: Vec<_> = record.threads().iter().map(|t| t.thread_id.as_str()).collect();
        assert_eq!(ids, vec!["T1", "T2", "T3"]);
    }

    #[test]
    fn test_duration_update_requires_record() {
        let err = apply_duration_update(None, &key(), "T1", PlaybackDuration::Seconds(1.0), None)
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::NotFound(NotFoundReason::PhoneNumber("2125550100".into()))
        );
    }

    #[test]
    fn test_duration_update_requires_thread() {
        let err = apply_duration_update(
            Some(existing()),
            &key(),
            "T9",
            PlaybackDuration::Seconds(1.0),
            None,
        )
        .unwrap_err();
        assert_eq!(err, RegistryError::NotFound(NotFoundReason::Thread("T9".into())));
    }

    #[test]
    fn test_duration_update_timestamp_is_optional() {
        let untouched = apply_duration_update(
            Some(existing()),
            &key(),
            "T2",
            PlaybackDuration::Seconds(9.0),
            None,
        )
        .unwrap();
        let MergeDecision::Write(record, _) = untouched else {
            panic!("expected a write");
        };
        assert_eq!(record.thread("T2").unwrap().timestamp, at(1));

        let touched = apply_duration_update(
            Some(existing()),
            &key(),
            "T2",
            PlaybackDuration::Seconds(9.0),
            Some(at(20)),
        )
        .unwrap();
        let MergeDecision::Write(record, outcome) = touched else {
            panic!("expected a write");
        };
        assert_eq!(outcome, Outcome::Updated);
        let entry = record.thread("T2").unwrap();
        assert_eq!(entry.timestamp, at(20));
        assert_eq!(entry.playback_duration, Some(PlaybackDuration::Seconds(9.0)));
    }
}
