//! Lightweight activity telemetry events.

use crate::time::Millis;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A system activity event (screen lock, app focus change, and so on).
///
/// Activity events are append-only: once created they are never updated,
/// only soft-deleted server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Globally unique event id.
    pub uuid: Uuid,
    /// Free-form event kind, e.g. `"screen_lock"`.
    #[serde(rename = "event_type")]
    pub kind: String,
    /// When the activity happened.
    pub timestamp: Millis,
    /// Free-form key/value payload.
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    /// Creation time. Doubles as the change watermark since activity
    /// events are never updated.
    pub created_at: Millis,
    /// Soft-deletion marker, server-side only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Millis>,
}

impl ActivityEvent {
    /// Creates a new activity event.
    pub fn new(kind: impl Into<String>, timestamp: Millis, now: Millis) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            kind: kind.into(),
            timestamp,
            data: BTreeMap::new(),
            created_at: now,
            deleted_at: None,
        }
    }

    /// Attaches a key/value pair to the payload.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Returns true if the server has tombstoned this record.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
