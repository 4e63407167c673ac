//! Server-detected sync conflicts.

use crate::time::Millis;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of entity a conflict refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A timed focus/break event.
    PomodoroEvent,
    /// An activity telemetry event.
    SystemEvent,
    /// The timer configuration record.
    TimerSettings,
}

/// Why the server rejected or flagged a client write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// A created record's uuid already exists server-side.
    DuplicateUuid,
    /// The stored row was modified after the client's cursor; the server
    /// copy won and the client write was dropped whole-record.
    ConcurrentModification,
    /// The server already held a strictly newer version.
    ServerNewer,
}

/// An informational conflict record.
///
/// Conflicts never fail the sync round that reports them and are never
/// auto-resolved; they exist so the UI can tell the user which writes lost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    /// Entity kind.
    #[serde(rename = "type")]
    pub entity: EntityKind,
    /// The contested uuid.
    pub uuid: Uuid,
    /// Why this write conflicted.
    pub reason: ConflictReason,
    /// The server row's `updated_at`, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_updated_at: Option<Millis>,
    /// The client record's `updated_at`, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_updated_at: Option<Millis>,
}

impl Conflict {
    /// A duplicate-uuid conflict for a created record.
    pub fn duplicate_uuid(entity: EntityKind, uuid: Uuid) -> Self {
        Self {
            entity,
            uuid,
            reason: ConflictReason::DuplicateUuid,
            server_updated_at: None,
            client_updated_at: None,
        }
    }

    /// A concurrent-modification conflict for an updated record.
    pub fn concurrent_modification(
        entity: EntityKind,
        uuid: Uuid,
        server_updated_at: Millis,
        client_updated_at: Millis,
    ) -> Self {
        Self {
            entity,
            uuid,
            reason: ConflictReason::ConcurrentModification,
            server_updated_at: Some(server_updated_at),
            client_updated_at: Some(client_updated_at),
        }
    }
}
