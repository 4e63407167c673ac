//! Per-user datasets and the transactional store.

use crate::error::{ServerError, ServerResult};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tempo_merge::{merge_timed_events, merge_timer_settings, MergeStrategy};
use tempo_sync_protocol::{
    ActivityEvent, ChangeSet, Conflict, EntityKind, Millis, TimedEvent, TimerSettings,
};
use uuid::Uuid;

/// A registered device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    /// Stable per-install device id.
    pub device_uuid: Uuid,
    /// Human-readable device name.
    pub device_name: String,
    /// Platform tag.
    pub platform: String,
    /// The cursor this device last synced to.
    pub last_sync_timestamp: Millis,
    /// When the device registered.
    pub registered_at: Millis,
}

/// One user's complete server-side dataset.
#[derive(Debug, Clone, Default)]
pub struct UserData {
    /// Timed events, including soft-deleted rows.
    pub events: HashMap<Uuid, TimedEvent>,
    /// Activity events, including soft-deleted rows.
    pub activity: HashMap<Uuid, ActivityEvent>,
    /// Timer settings, when stored.
    pub settings: Option<TimerSettings>,
    /// Registered devices by uuid.
    pub devices: HashMap<Uuid, DeviceRecord>,
    /// Devices that already ran their one-time legacy migration.
    pub migrated_devices: HashSet<Uuid>,
}

impl UserData {
    /// Live (not soft-deleted) timed events, ordered by start time.
    pub fn live_events(&self) -> Vec<TimedEvent> {
        let mut events: Vec<_> = self
            .events
            .values()
            .filter(|e| !e.is_deleted())
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.start_time, e.uuid));
        events
    }

    /// Live activity events, ordered by timestamp.
    pub fn live_activity(&self) -> Vec<ActivityEvent> {
        let mut activity: Vec<_> = self
            .activity
            .values()
            .filter(|e| !e.is_deleted())
            .cloned()
            .collect();
        activity.sort_by_key(|e| (e.timestamp, e.uuid));
        activity
    }

    /// The dataset watermark: the maximum timestamp across all stored
    /// rows, deleted ones included.
    ///
    /// Clients use this value verbatim as their next cursor, so it must
    /// track data, not the wall clock; otherwise boundary records would be
    /// missed or duplicated. Only an empty dataset falls back to `now`,
    /// which also keeps the watermark clear of the cursor-0 sentinel.
    pub fn data_timestamp(&self, now: Millis) -> Millis {
        let events = self
            .events
            .values()
            .flat_map(|e| [Some(e.created_at), Some(e.updated_at), e.deleted_at])
            .flatten();
        let activity = self
            .activity
            .values()
            .flat_map(|e| [Some(e.created_at), e.deleted_at])
            .flatten();
        let settings = self.settings.map(|s| s.updated_at);

        events.chain(activity).chain(settings).max().unwrap_or(now)
    }

    /// Timed events changed (created, updated, or tombstoned) after the
    /// cursor, tombstones included so deletes propagate to peers.
    pub fn events_after(&self, cursor: Millis) -> Vec<TimedEvent> {
        let mut events: Vec<_> = self
            .events
            .values()
            .filter(|e| e.updated_at > cursor || e.deleted_at.is_some_and(|d| d > cursor))
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.updated_at, e.uuid));
        events
    }

    /// Activity events created or tombstoned after the cursor.
    pub fn activity_after(&self, cursor: Millis) -> Vec<ActivityEvent> {
        let mut activity: Vec<_> = self
            .activity
            .values()
            .filter(|e| e.created_at > cursor || e.deleted_at.is_some_and(|d| d > cursor))
            .cloned()
            .collect();
        activity.sort_by_key(|e| (e.created_at, e.uuid));
        activity
    }

    /// Settings, when modified after the cursor.
    pub fn settings_after(&self, cursor: Millis) -> Option<TimerSettings> {
        self.settings.filter(|s| s.updated_at > cursor)
    }

    /// Applies a client delta, returning any conflicts.
    ///
    /// Created rows whose uuid already exists raise `duplicate_uuid`.
    /// Updated rows whose stored copy changed after the client's cursor
    /// raise `concurrent_modification`; the server copy wins and the
    /// client write is dropped whole-record. Accepted writes go through
    /// the shared merge engine. Deletions soft-delete, keeping the row so
    /// it travels to peer devices.
    pub fn apply_changes(
        &mut self,
        changes: &ChangeSet,
        cursor: Millis,
        now: Millis,
    ) -> ServerResult<Vec<Conflict>> {
        let mut conflicts = Vec::new();
        let mut accepted: Vec<TimedEvent> = Vec::new();

        for event in &changes.pomodoro_events.created {
            event
                .validate()
                .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
            if self.events.contains_key(&event.uuid) {
                conflicts.push(Conflict::duplicate_uuid(
                    EntityKind::PomodoroEvent,
                    event.uuid,
                ));
            } else {
                accepted.push(event.clone());
            }
        }

        for event in &changes.pomodoro_events.updated {
            event
                .validate()
                .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
            match self.events.get(&event.uuid) {
                Some(stored) if stored.updated_at > cursor => {
                    conflicts.push(Conflict::concurrent_modification(
                        EntityKind::PomodoroEvent,
                        event.uuid,
                        stored.updated_at,
                        event.updated_at,
                    ));
                }
                _ => accepted.push(event.clone()),
            }
        }

        merge_timed_events(&mut self.events, &accepted, MergeStrategy::Delta);

        for uuid in &changes.pomodoro_events.deleted {
            if let Some(stored) = self.events.get_mut(uuid) {
                if stored.deleted_at.is_none() {
                    stored.deleted_at = Some(now);
                    stored.updated_at = now;
                }
            }
            // Unknown uuids are ignored; the record may have been deleted
            // from another device already.
        }

        for event in &changes.system_events.created {
            // Append-only: an existing uuid is silently skipped.
            self.activity.entry(event.uuid).or_insert_with(|| event.clone());
        }

        self.settings = merge_timer_settings(self.settings, changes.timer_settings);

        Ok(conflicts)
    }

    /// Hard-deletes everything and inserts the payload verbatim, bypassing
    /// merge. The cursor-0 force-overwrite path.
    pub fn replace_with(&mut self, changes: &ChangeSet) -> ServerResult<()> {
        self.events.clear();
        self.activity.clear();
        self.settings = None;

        for event in changes
            .pomodoro_events
            .created
            .iter()
            .chain(&changes.pomodoro_events.updated)
        {
            event
                .validate()
                .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
            self.events.insert(event.uuid, event.clone());
        }
        for event in &changes.system_events.created {
            self.activity.insert(event.uuid, event.clone());
        }
        self.settings = changes.timer_settings;
        Ok(())
    }
}

/// All user datasets behind one lock, with copy-commit transactions.
#[derive(Debug, Default)]
pub struct UserStore {
    users: RwLock<HashMap<Uuid, UserData>>,
}

impl UserStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against a copy of the user's data and commits only on
    /// `Ok` — any error rolls the whole request back.
    ///
    /// Requests for the same user serialize on the store lock, so `f`
    /// always sees the state as of transaction start; simultaneous
    /// commits resolve last-commit-wins.
    pub fn with_transaction<R>(
        &self,
        user_uuid: Uuid,
        f: impl FnOnce(&mut UserData) -> ServerResult<R>,
    ) -> ServerResult<R> {
        let mut users = self.users.write();
        let data = users.entry(user_uuid).or_default();
        let mut scratch = data.clone();
        match f(&mut scratch) {
            Ok(result) => {
                *data = scratch;
                Ok(result)
            }
            Err(error) => {
                tracing::warn!(%user_uuid, %error, "transaction rolled back");
                Err(error)
            }
        }
    }

    /// Runs a read-only closure against the user's data.
    pub fn read<R>(&self, user_uuid: Uuid, f: impl FnOnce(&UserData) -> R) -> R {
        let users = self.users.read();
        match users.get(&user_uuid) {
            Some(data) => f(data),
            None => f(&UserData::default()),
        }
    }

    /// Returns true if the user has a dataset.
    pub fn contains(&self, user_uuid: &Uuid) -> bool {
        self.users.read().contains_key(user_uuid)
    }
}
