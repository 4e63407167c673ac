//! Request and response envelopes for the sync endpoints.

use crate::activity::ActivityEvent;
use crate::changes::ChangeSet;
use crate::conflict::Conflict;
use crate::event::TimedEvent;
use crate::settings::TimerSettings;
use crate::time::Millis;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Response to a full-sync request: the complete live dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FullSyncResponse {
    /// All live timed events.
    #[serde(default)]
    pub pomodoro_events: Vec<TimedEvent>,
    /// All live activity events.
    #[serde(default)]
    pub system_events: Vec<ActivityEvent>,
    /// Timer settings, when the user has stored any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_settings: Option<TimerSettings>,
    /// The dataset watermark; clients store this as their new cursor.
    pub server_timestamp: Millis,
}

/// An incremental sync round: the client's cursor plus its outbound delta.
///
/// A `last_sync_timestamp` of [`crate::FORCE_OVERWRITE_CURSOR`] is the
/// force-overwrite sentinel: the server drops the user's stored data and
/// replaces it verbatim with `changes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncrementalSyncRequest {
    /// The client's sync cursor.
    pub last_sync_timestamp: Millis,
    /// Local changes made after the cursor.
    #[serde(default)]
    pub changes: ChangeSet,
}

/// Changes the server accumulated after the client's cursor.
///
/// Deleted records appear here as full rows with `deleted_at` set, so peer
/// devices can drop their copies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerChanges {
    /// Timed events created, updated, or tombstoned after the cursor.
    #[serde(default)]
    pub pomodoro_events: Vec<TimedEvent>,
    /// Activity events created or tombstoned after the cursor.
    #[serde(default)]
    pub system_events: Vec<ActivityEvent>,
    /// Settings, present only when modified after the cursor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_settings: Option<TimerSettings>,
}

impl ServerChanges {
    /// Returns true if the server had nothing newer than the cursor.
    pub fn is_empty(&self) -> bool {
        self.pomodoro_events.is_empty()
            && self.system_events.is_empty()
            && self.timer_settings.is_none()
    }
}

/// Response to an incremental sync round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncrementalSyncResponse {
    /// Client writes the server rejected or overrode. Informational only;
    /// their presence never fails the round.
    #[serde(default)]
    pub conflicts: Vec<Conflict>,
    /// Server-side changes newer than the client's cursor.
    #[serde(default)]
    pub server_changes: ServerChanges,
    /// The new cursor for the client to store.
    pub server_timestamp: Millis,
}

/// Lightweight account overview, cheap enough to poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryResponse {
    /// Count of live timed events.
    pub pomodoro_event_count: u64,
    /// Count of live activity events.
    pub system_event_count: u64,
    /// Whether the user has stored timer settings.
    pub has_timer_settings: bool,
    /// The dataset watermark.
    pub server_timestamp: Millis,
    /// The most recent timed events, newest first.
    #[serde(default)]
    pub recent_events: Vec<TimedEvent>,
}

/// Request to register a device and obtain a session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterDeviceRequest {
    /// Stable per-install device id.
    pub device_uuid: Uuid,
    /// Human-readable device name.
    pub device_name: String,
    /// Platform tag, e.g. `"macos"`.
    pub platform: String,
    /// Existing account to attach to; a fresh account is created when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_uuid: Option<Uuid>,
}

/// Response to device registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterDeviceResponse {
    /// The account this device now belongs to.
    pub user_uuid: Uuid,
    /// Bearer token for subsequent sync calls.
    pub session_token: String,
    /// When the token expires.
    pub expires_at: Millis,
}

/// Request to import data from the legacy single-device store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrateRequest {
    /// The device requesting migration. Each device migrates at most once.
    pub device_uuid: Uuid,
    /// Legacy store schema version the client exported from.
    pub from_version: u32,
}

/// Per-entity migration counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSummary {
    /// Timed events imported.
    pub pomodoro_events_migrated: u64,
    /// Activity events imported.
    pub system_events_migrated: u64,
    /// Records skipped because their uuid already existed.
    pub skipped_duplicates: u64,
    /// Whether legacy settings were imported.
    pub settings_migrated: bool,
}

/// Response to a migration request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrateResponse {
    /// Whether the import ran; a repeat attempt is rejected instead.
    pub migrated: bool,
    /// What was imported.
    #[serde(default)]
    pub summary: MigrationSummary,
    /// The dataset watermark after the import.
    pub server_timestamp: Millis,
}
