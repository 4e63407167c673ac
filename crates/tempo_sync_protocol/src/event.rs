//! Timed focus/break events.

use crate::time::Millis;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// The kind of a timed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A focus (work) interval.
    Focus,
    /// A rest (break) interval.
    Rest,
    /// An open-ended count-up interval.
    CountUp,
    /// A user-defined interval.
    Custom,
}

/// A timed focus/break event.
///
/// Events are keyed by `uuid`, globally unique per user. `updated_at` never
/// decreases for a given uuid as observed by a single writer; the merge
/// engine relies on that to implement last-write-wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedEvent {
    /// Globally unique event id.
    pub uuid: Uuid,
    /// Display title.
    pub title: String,
    /// Start of the interval.
    pub start_time: Millis,
    /// End of the interval. Always `>= start_time`.
    pub end_time: Millis,
    /// Event kind.
    #[serde(rename = "event_type")]
    pub kind: EventKind,
    /// Whether the interval ran to completion.
    pub is_completed: bool,
    /// Creation time.
    pub created_at: Millis,
    /// Last modification time.
    pub updated_at: Millis,
    /// Soft-deletion marker.
    ///
    /// Only the server sets this, so that deletions travel inside
    /// `server_changes` and peer devices can drop their copies. Clients
    /// upload deletions as a uuid list instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Millis>,
}

impl TimedEvent {
    /// Creates a new event with `created_at == updated_at == now`.
    pub fn new(
        title: impl Into<String>,
        kind: EventKind,
        start_time: Millis,
        end_time: Millis,
        now: Millis,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            title: title.into(),
            start_time,
            end_time,
            kind,
            is_completed: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Returns true if the server has tombstoned this record.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Checks the interval invariant.
    pub fn validate(&self) -> Result<(), InvalidInterval> {
        if self.start_time > self.end_time {
            return Err(InvalidInterval {
                uuid: self.uuid,
                start_time: self.start_time,
                end_time: self.end_time,
            });
        }
        Ok(())
    }
}

/// Error returned when an event's interval is inverted.
#[derive(Debug, Error)]
#[error("event {uuid}: start_time {start_time} is after end_time {end_time}")]
pub struct InvalidInterval {
    /// The offending event.
    pub uuid: Uuid,
    /// Interval start.
    pub start_time: Millis,
    /// Interval end.
    pub end_time: Millis,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_event_defaults() {
        let event = TimedEvent::new("deep work", EventKind::Focus, 100, 200, 100);
        assert_eq!(event.created_at, event.updated_at);
        assert!(!event.is_completed);
        assert!(!event.is_deleted());
        assert!(event.validate().is_ok());
    }

    #[test]
    fn inverted_interval_rejected() {
        let event = TimedEvent::new("bad", EventKind::Custom, 200, 100, 100);
        let err = event.validate().unwrap_err();
        assert_eq!(err.start_time, 200);
        assert_eq!(err.end_time, 100);
    }

    #[test]
    fn wire_field_names() {
        let event = TimedEvent::new("focus", EventKind::CountUp, 1, 2, 3);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event_type"], "count_up");
        assert!(json.get("start_time").is_some());
        assert!(json.get("is_completed").is_some());
        // Live records must not carry a deleted_at key at all.
        assert!(json.get("deleted_at").is_none());
    }

    #[test]
    fn tombstone_roundtrip() {
        let mut event = TimedEvent::new("gone", EventKind::Rest, 1, 2, 3);
        event.deleted_at = Some(50);

        let json = serde_json::to_string(&event).unwrap();
        let back: TimedEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.deleted_at, Some(50));
        assert!(back.is_deleted());
    }

    #[test]
    fn kind_codes() {
        for (kind, name) in [
            (EventKind::Focus, "\"focus\""),
            (EventKind::Rest, "\"rest\""),
            (EventKind::CountUp, "\"count_up\""),
            (EventKind::Custom, "\"custom\""),
        ] {
            assert_eq!(serde_json::to_string(&kind).unwrap(), name);
        }
    }
}
