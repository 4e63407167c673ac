//! The pending-difference projection shown before a sync runs.

use std::collections::HashMap;
use tempo_sync_protocol::{Conflict, DeletionTombstone, Millis, TimedEvent};
use uuid::Uuid;

/// How a workspace item differs from the synced baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeTag {
    /// The record did not exist at the last sync.
    Added,
    /// The record existed and was modified after the last sync.
    Modified,
    /// The record was deleted locally and awaits upload.
    Deleted,
}

/// One pending difference, enough for a list row.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceItem {
    /// The record's uuid.
    pub uuid: Uuid,
    /// Display title; empty when the tombstone carried none.
    pub title: String,
    /// The difference kind.
    pub tag: ChangeTag,
    /// When the difference happened, for newest-first ordering.
    pub timestamp: Millis,
}

/// The pending-difference projection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncWorkspace {
    /// Local changes awaiting upload, newest first.
    pub staged: Vec<WorkspaceItem>,
    /// Cached remote records newer than (or absent from) the local data,
    /// newest first.
    pub remote_changes: Vec<WorkspaceItem>,
    /// Conflicts live on sync outcomes and history; outside an actual sync
    /// round there are none to show, so the projection reports none.
    pub conflicts: Vec<Conflict>,
    /// The cursor this projection was computed against.
    pub cursor: Millis,
}

impl SyncWorkspace {
    /// Total pending local changes.
    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    /// Returns true if nothing differs in either direction.
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.remote_changes.is_empty()
    }
}

/// Computes the projection from local state and the cached remote view.
///
/// Pure: touches no network and mutates nothing.
pub fn analyze(
    cursor: Millis,
    local: &HashMap<Uuid, TimedEvent>,
    tombstones: &[DeletionTombstone],
    remote: &[TimedEvent],
) -> SyncWorkspace {
    let mut staged = Vec::new();
    for event in local.values() {
        if event.updated_at > cursor {
            staged.push(WorkspaceItem {
                uuid: event.uuid,
                title: event.title.clone(),
                tag: if event.created_at > cursor {
                    ChangeTag::Added
                } else {
                    ChangeTag::Modified
                },
                timestamp: event.updated_at,
            });
        }
    }
    for tombstone in tombstones {
        staged.push(WorkspaceItem {
            uuid: tombstone.uuid,
            title: tombstone.title.clone().unwrap_or_default(),
            tag: ChangeTag::Deleted,
            timestamp: tombstone.deleted_at,
        });
    }
    staged.sort_by_key(|item| (std::cmp::Reverse(item.timestamp), item.uuid));

    let mut remote_changes = Vec::new();
    for event in remote {
        if event.is_deleted() {
            continue;
        }
        let tag = match local.get(&event.uuid) {
            None => ChangeTag::Added,
            Some(ours) if event.updated_at > ours.updated_at => ChangeTag::Modified,
            Some(_) => continue,
        };
        remote_changes.push(WorkspaceItem {
            uuid: event.uuid,
            title: event.title.clone(),
            tag,
            timestamp: event.updated_at,
        });
    }
    remote_changes.sort_by_key(|item| (std::cmp::Reverse(item.timestamp), item.uuid));

    SyncWorkspace {
        staged,
        remote_changes,
        conflicts: Vec::new(),
        cursor,
    }
}
