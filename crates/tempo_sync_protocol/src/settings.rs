//! Timer configuration.

use crate::time::Millis;
use serde::{Deserialize, Serialize};

/// A user's timer configuration.
///
/// Exactly one global instance exists per user; conflicting writes resolve
/// whole-record by last-write-wins on `updated_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    /// Focus interval length in seconds.
    pub pomodoro_time: i64,
    /// Short break length in seconds.
    pub short_break_time: i64,
    /// Long break length in seconds.
    pub long_break_time: i64,
    /// Last modification time.
    pub updated_at: Millis,
}

impl TimerSettings {
    /// Creates settings with the given interval lengths.
    pub fn new(pomodoro_time: i64, short_break_time: i64, long_break_time: i64, now: Millis) -> Self {
        Self {
            pomodoro_time,
            short_break_time,
            long_break_time,
            updated_at: now,
        }
    }
}

impl Default for TimerSettings {
    fn default() -> Self {
        // 25 / 5 / 15 minutes.
        Self::new(25 * 60, 5 * 60, 15 * 60, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_intervals() {
        let settings = TimerSettings::default();
        assert_eq!(settings.pomodoro_time, 1500);
        assert_eq!(settings.short_break_time, 300);
        assert_eq!(settings.long_break_time, 900);
    }

    #[test]
    fn roundtrip() {
        let settings = TimerSettings::new(1500, 300, 900, 42);
        let json = serde_json::to_string(&settings).unwrap();
        let back: TimerSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }
}
