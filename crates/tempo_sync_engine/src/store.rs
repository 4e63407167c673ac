//! The client's in-memory data store.

use parking_lot::RwLock;
use std::collections::HashMap;
use tempo_merge::{
    merge_activity_events, merge_timed_events, merge_timer_settings, MergeOutcome, MergeStrategy,
};
use tempo_sync_protocol::{ActivityEvent, Millis, TimedEvent, TimerSettings};
use uuid::Uuid;

#[derive(Debug, Default)]
struct StoreInner {
    events: HashMap<Uuid, TimedEvent>,
    activity: HashMap<Uuid, ActivityEvent>,
    settings: Option<TimerSettings>,
    cursor: Millis,
}

/// The device's local dataset plus the mirrored sync cursor.
///
/// Constructed explicitly and passed into the [`crate::SyncClient`]; there
/// are no process-wide store singletons. All methods take `&self`; state
/// lives behind one lock so merges apply atomically.
#[derive(Debug, Default)]
pub struct LocalStore {
    inner: RwLock<StoreInner>,
}

impl LocalStore {
    /// Creates an empty store with cursor 0 (never synced).
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a timed event.
    pub fn upsert_event(&self, event: TimedEvent) {
        self.inner.write().events.insert(event.uuid, event);
    }

    /// Removes a timed event, returning it when present.
    pub fn remove_event(&self, uuid: &Uuid) -> Option<TimedEvent> {
        self.inner.write().events.remove(uuid)
    }

    /// Returns a timed event by uuid.
    pub fn event(&self, uuid: &Uuid) -> Option<TimedEvent> {
        self.inner.read().events.get(uuid).cloned()
    }

    /// Records an activity event.
    pub fn record_activity(&self, event: ActivityEvent) {
        self.inner.write().activity.insert(event.uuid, event);
    }

    /// Replaces the timer settings.
    pub fn set_settings(&self, settings: TimerSettings) {
        self.inner.write().settings = Some(settings);
    }

    /// Snapshot of all timed events.
    pub fn events(&self) -> HashMap<Uuid, TimedEvent> {
        self.inner.read().events.clone()
    }

    /// Snapshot of all activity events.
    pub fn activity(&self) -> HashMap<Uuid, ActivityEvent> {
        self.inner.read().activity.clone()
    }

    /// The stored timer settings, if any.
    pub fn settings(&self) -> Option<TimerSettings> {
        self.inner.read().settings
    }

    /// Number of timed events held.
    pub fn event_count(&self) -> usize {
        self.inner.read().events.len()
    }

    /// The mirrored sync cursor.
    pub fn cursor(&self) -> Millis {
        self.inner.read().cursor
    }

    /// Advances the mirrored sync cursor.
    pub fn set_cursor(&self, cursor: Millis) {
        self.inner.write().cursor = cursor;
    }

    /// Merges a remote payload into the store under one lock acquisition.
    ///
    /// Under [`MergeStrategy::Snapshot`] the remote settings replace the
    /// local copy unconditionally, absence included; the snapshot is the
    /// whole remote dataset, so locally held settings it lacks are gone.
    pub fn merge_remote(
        &self,
        events: &[TimedEvent],
        activity: &[ActivityEvent],
        settings: Option<TimerSettings>,
        strategy: MergeStrategy,
    ) -> MergeOutcome {
        let mut inner = self.inner.write();
        let mut outcome = merge_timed_events(&mut inner.events, events, strategy);
        outcome.absorb(merge_activity_events(&mut inner.activity, activity, strategy));

        let merged = match strategy {
            MergeStrategy::Snapshot => settings,
            MergeStrategy::Delta => merge_timer_settings(inner.settings, settings),
        };
        if merged != inner.settings {
            if merged.is_none() {
                outcome.deleted += 1;
            } else {
                outcome.updated += 1;
            }
            inner.settings = merged;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempo_sync_protocol::EventKind;

    #[test]
    fn crud_roundtrip() {
        let store = LocalStore::new();
        let event = TimedEvent::new("focus", EventKind::Focus, 1, 2, 3);

        store.upsert_event(event.clone());
        assert_eq!(store.event_count(), 1);
        assert_eq!(store.event(&event.uuid), Some(event.clone()));

        assert_eq!(store.remove_event(&event.uuid), Some(event.clone()));
        assert_eq!(store.remove_event(&event.uuid), None);
        assert_eq!(store.event_count(), 0);
    }

    #[test]
    fn cursor_starts_at_zero() {
        let store = LocalStore::new();
        assert_eq!(store.cursor(), 0);
        store.set_cursor(1234);
        assert_eq!(store.cursor(), 1234);
    }

    #[test]
    fn merge_updates_settings_by_lww() {
        let store = LocalStore::new();
        store.set_settings(TimerSettings::new(1500, 300, 900, 100));

        let outcome = store.merge_remote(
            &[],
            &[],
            Some(TimerSettings::new(3000, 600, 1200, 200)),
            MergeStrategy::Delta,
        );
        assert_eq!(outcome.updated, 1);
        assert_eq!(store.settings().map(|s| s.pomodoro_time), Some(3000));

        // Older remote settings are a no-op.
        let outcome = store.merge_remote(
            &[],
            &[],
            Some(TimerSettings::new(1, 2, 3, 50)),
            MergeStrategy::Delta,
        );
        assert!(outcome.is_noop());
    }

    #[test]
    fn snapshot_replaces_settings_wholesale() {
        let store = LocalStore::new();
        store.set_settings(TimerSettings::new(1500, 300, 900, 500));

        // Older remote settings still win under a snapshot.
        let older = TimerSettings::new(3000, 600, 1200, 100);
        store.merge_remote(&[], &[], Some(older), MergeStrategy::Snapshot);
        assert_eq!(store.settings(), Some(older));

        // A snapshot without settings clears the local copy.
        let outcome = store.merge_remote(&[], &[], None, MergeStrategy::Snapshot);
        assert_eq!(outcome.deleted, 1);
        assert!(store.settings().is_none());
    }

    #[test]
    fn snapshot_merge_drops_local_extras() {
        let store = LocalStore::new();
        store.upsert_event(TimedEvent::new("mine", EventKind::Focus, 1, 2, 3));
        let shared = TimedEvent::new("shared", EventKind::Rest, 4, 5, 6);
        store.upsert_event(shared.clone());

        let outcome = store.merge_remote(&[shared], &[], None, MergeStrategy::Snapshot);
        assert_eq!(outcome.deleted, 1);
        assert_eq!(store.event_count(), 1);
    }
}
