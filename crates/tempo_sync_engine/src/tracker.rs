//! Change tracking and the tombstone log.

use crate::store::LocalStore;
use parking_lot::RwLock;
use tempo_sync_protocol::{
    ActivityChanges, ChangeSet, DeletionTombstone, EventChanges, Millis, TimedEvent,
};
use uuid::Uuid;

/// Derives the outbound delta and owns the tombstone log.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    tombstones: RwLock<Vec<DeletionTombstone>>,
}

impl ChangeTracker {
    /// Creates a tracker with an empty tombstone log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a local deletion.
    ///
    /// `applying_remote_merge` must be true when the caller is removing a
    /// record because a remote merge said so. Without the guard a merge
    /// removal would be misread as a user deletion and re-uploaded,
    /// deleting the record on every other device too.
    pub fn track_deletion(
        &self,
        event: &TimedEvent,
        deleted_at: Millis,
        applying_remote_merge: bool,
    ) {
        if applying_remote_merge {
            return;
        }
        let mut tombstones = self.tombstones.write();
        if tombstones.iter().any(|t| t.uuid == event.uuid) {
            return;
        }
        tombstones.push(DeletionTombstone::for_event(event, deleted_at));
    }

    /// Snapshot of the pending tombstone log.
    pub fn pending_tombstones(&self) -> Vec<DeletionTombstone> {
        self.tombstones.read().clone()
    }

    /// Builds the outbound delta for everything changed after `cursor`.
    ///
    /// Created means `created_at > cursor`; updated means
    /// `updated_at > cursor` but `created_at <= cursor`; deleted is the
    /// current tombstone uuid set.
    pub fn collect_changes_since(&self, store: &LocalStore, cursor: Millis) -> ChangeSet {
        let mut created = Vec::new();
        let mut updated = Vec::new();
        for event in store.events().into_values() {
            if event.created_at > cursor {
                created.push(event);
            } else if event.updated_at > cursor {
                updated.push(event);
            }
        }
        created.sort_by_key(|e| (e.created_at, e.uuid));
        updated.sort_by_key(|e| (e.updated_at, e.uuid));

        let deleted: Vec<Uuid> = self.tombstones.read().iter().map(|t| t.uuid).collect();

        let mut activity_created: Vec<_> = store
            .activity()
            .into_values()
            .filter(|event| event.created_at > cursor)
            .collect();
        activity_created.sort_by_key(|e| (e.created_at, e.uuid));

        ChangeSet {
            pomodoro_events: EventChanges {
                created,
                updated,
                deleted,
            },
            system_events: ActivityChanges {
                created: activity_created,
            },
            timer_settings: store.settings().filter(|s| s.updated_at > cursor),
        }
    }

    /// Purges exactly the tombstones the server acknowledged.
    ///
    /// Runs only after a sync round reports success; deletions made while
    /// the round was in flight stay pending for the next one.
    pub fn clear_acknowledged(&self, acknowledged: &[Uuid]) {
        self.tombstones
            .write()
            .retain(|t| !acknowledged.contains(&t.uuid));
    }

    /// Drops the whole tombstone log.
    ///
    /// Used by the force-overwrite modes, where pending deletions become
    /// moot.
    pub fn clear_all(&self) {
        self.tombstones.write().clear();
    }
}
