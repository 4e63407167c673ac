//! Outbound change sets.

use crate::activity::ActivityEvent;
use crate::event::TimedEvent;
use crate::settings::TimerSettings;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Changes to timed events since the client's cursor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventChanges {
    /// Records created after the cursor.
    #[serde(default)]
    pub created: Vec<TimedEvent>,
    /// Records updated after the cursor but created before it.
    #[serde(default)]
    pub updated: Vec<TimedEvent>,
    /// Uuids of records deleted locally (the tombstone log).
    #[serde(default)]
    pub deleted: Vec<Uuid>,
}

impl EventChanges {
    /// Number of individual changes carried.
    pub fn len(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len()
    }

    /// Returns true if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Changes to activity events since the client's cursor.
///
/// Activity events are append-only, so only creations travel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityChanges {
    /// Records created after the cursor.
    #[serde(default)]
    pub created: Vec<ActivityEvent>,
}

impl ActivityChanges {
    /// Number of individual changes carried.
    pub fn len(&self) -> usize {
        self.created.len()
    }

    /// Returns true if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
    }
}

/// The full outbound delta for one sync round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Timed event changes.
    #[serde(default)]
    pub pomodoro_events: EventChanges,
    /// Activity event changes.
    #[serde(default)]
    pub system_events: ActivityChanges,
    /// Settings, present only when modified after the cursor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_settings: Option<TimerSettings>,
}

impl ChangeSet {
    /// Total number of records carried, settings counting as one.
    pub fn len(&self) -> usize {
        self.pomodoro_events.len()
            + self.system_events.len()
            + usize::from(self.timer_settings.is_some())
    }

    /// Returns true if the delta carries nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
