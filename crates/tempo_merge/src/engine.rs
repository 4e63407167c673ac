//! Merge functions for each entity kind.

use crate::outcome::{MergeOutcome, MergeStrategy};
use std::collections::{HashMap, HashSet};
use tempo_sync_protocol::{ActivityEvent, TimedEvent, TimerSettings};
use uuid::Uuid;

/// Merges remote timed events into the local map.
///
/// Each remote record resolves whole-record against the local copy by
/// `updated_at`; ties keep the local copy. Remote records carrying
/// `deleted_at` remove the local copy instead of upserting it. Under
/// [`MergeStrategy::Snapshot`] local records absent from the payload are
/// removed as well.
pub fn merge_timed_events(
    local: &mut HashMap<Uuid, TimedEvent>,
    remote: &[TimedEvent],
    strategy: MergeStrategy,
) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    if strategy == MergeStrategy::Snapshot {
        let remote_uuids: HashSet<Uuid> = remote.iter().map(|event| event.uuid).collect();
        let before = local.len();
        local.retain(|uuid, _| remote_uuids.contains(uuid));
        outcome.deleted += (before - local.len()) as u64;
    }

    for event in remote {
        if event.is_deleted() {
            if local.remove(&event.uuid).is_some() {
                outcome.deleted += 1;
            } else {
                outcome.skipped += 1;
            }
            continue;
        }

        match local.get(&event.uuid) {
            None => {
                local.insert(event.uuid, event.clone());
                outcome.inserted += 1;
            }
            Some(ours) if event.updated_at > ours.updated_at => {
                local.insert(event.uuid, event.clone());
                outcome.updated += 1;
            }
            Some(_) => outcome.skipped += 1,
        }
    }

    outcome
}

/// Merges remote activity events into the local map.
///
/// Activity events are append-only, so a remote record only inserts when
/// the uuid is locally unknown. Remote tombstones still remove.
pub fn merge_activity_events(
    local: &mut HashMap<Uuid, ActivityEvent>,
    remote: &[ActivityEvent],
    strategy: MergeStrategy,
) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    if strategy == MergeStrategy::Snapshot {
        let remote_uuids: HashSet<Uuid> = remote.iter().map(|event| event.uuid).collect();
        let before = local.len();
        local.retain(|uuid, _| remote_uuids.contains(uuid));
        outcome.deleted += (before - local.len()) as u64;
    }

    for event in remote {
        if event.is_deleted() {
            if local.remove(&event.uuid).is_some() {
                outcome.deleted += 1;
            } else {
                outcome.skipped += 1;
            }
            continue;
        }

        if local.contains_key(&event.uuid) {
            outcome.skipped += 1;
        } else {
            local.insert(event.uuid, event.clone());
            outcome.inserted += 1;
        }
    }

    outcome
}

/// Resolves two settings copies whole-record by `updated_at`.
///
/// A tie keeps the local copy. Either side may be absent.
pub fn merge_timer_settings(
    local: Option<TimerSettings>,
    remote: Option<TimerSettings>,
) -> Option<TimerSettings> {
    match (local, remote) {
        (Some(ours), Some(theirs)) if theirs.updated_at > ours.updated_at => Some(theirs),
        (Some(ours), _) => Some(ours),
        (None, theirs) => theirs,
    }
}

/// Removes the given uuids from the local map, returning how many existed.
///
/// Unknown uuids are ignored; deleting twice is harmless.
pub fn apply_deletions(local: &mut HashMap<Uuid, TimedEvent>, deleted: &[Uuid]) -> u64 {
    deleted
        .iter()
        .filter(|uuid| local.remove(uuid).is_some())
        .count() as u64
}
