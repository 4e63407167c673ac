//! The sync mode orchestrator.

use crate::auth::{self, AuthToken, TokenProvider};
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::history::{SyncHistory, SyncMode, SyncRecord};
use crate::remote::RemoteCache;
use crate::store::LocalStore;
use crate::tracker::ChangeTracker;
use crate::transport::SyncTransport;
use crate::workspace::{self, SyncWorkspace};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tempo_merge::{MergeOutcome, MergeStrategy};
use tempo_sync_protocol::{
    now_millis, ActivityChanges, ChangeSet, Conflict, EventChanges, FullSyncResponse,
    IncrementalSyncRequest, Millis, ServerChanges, SummaryResponse, TimedEvent,
    FORCE_OVERWRITE_CURSOR,
};
use uuid::Uuid;

/// Where the client currently is in its sync lifecycle.
///
/// `Success` and `Error` persist until the next round flips the phase back
/// to `Syncing`; there is no automatic return to `Idle`, so UI code can
/// keep showing the last outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No sync has run since construction.
    Idle,
    /// A sync round is in flight.
    Syncing,
    /// The last round succeeded.
    Success,
    /// The last round failed.
    Error,
}

/// What one successful sync round did.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    /// The mode that ran.
    pub mode: SyncMode,
    /// Records uploaded (settings counting as one).
    pub uploaded: u64,
    /// Records downloaded.
    pub downloaded: u64,
    /// Conflicts the server reported. Informational; the round still
    /// succeeded.
    pub conflicts: Vec<Conflict>,
    /// What the merge did to the local store.
    pub detail: MergeOutcome,
    /// The cursor the round ended on.
    pub server_timestamp: Millis,
}

impl SyncOutcome {
    /// Number of conflicts reported.
    pub fn conflict_count(&self) -> u64 {
        self.conflicts.len() as u64
    }
}

/// Orchestrates the five sync modes against the sync server.
///
/// The store, transport, and token provider are injected; the client owns
/// the change tracker, the remote cache, the history, and the single-flight
/// flag. A sync request arriving while one is in flight fails with
/// [`SyncError::InProgress`] and is not queued.
pub struct SyncClient<T: SyncTransport, P: TokenProvider> {
    config: SyncConfig,
    transport: Arc<T>,
    tokens: Arc<P>,
    store: Arc<LocalStore>,
    tracker: ChangeTracker,
    remote: RemoteCache,
    history: RwLock<SyncHistory>,
    workspace: RwLock<SyncWorkspace>,
    phase: RwLock<SyncPhase>,
    in_flight: AtomicBool,
}

impl<T: SyncTransport, P: TokenProvider> SyncClient<T, P> {
    /// Creates a client over the given store, transport, and tokens.
    pub fn new(config: SyncConfig, store: Arc<LocalStore>, transport: T, tokens: P) -> Self {
        let history = SyncHistory::new(config.history_limit);
        Self {
            config,
            transport: Arc::new(transport),
            tokens: Arc::new(tokens),
            store,
            tracker: ChangeTracker::new(),
            remote: RemoteCache::new(),
            history: RwLock::new(history),
            workspace: RwLock::new(SyncWorkspace::default()),
            phase: RwLock::new(SyncPhase::Idle),
            in_flight: AtomicBool::new(false),
        }
    }

    /// The injected local store.
    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    /// The client configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SyncPhase {
        *self.phase.read()
    }

    /// Returns true while a sync round is in flight.
    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Snapshot of the sync history, newest first.
    pub fn history(&self) -> Vec<SyncRecord> {
        self.history.read().records()
    }

    /// The current pending-difference projection.
    pub fn workspace(&self) -> SyncWorkspace {
        self.workspace.read().clone()
    }

    /// Deletes a timed event locally and records a tombstone for upload.
    ///
    /// Returns false if the uuid was unknown.
    pub fn delete_event(&self, uuid: &Uuid) -> bool {
        match self.store.remove_event(uuid) {
            Some(event) => {
                self.tracker
                    .track_deletion(&event, now_millis(), false);
                self.refresh_workspace();
                true
            }
            None => false,
        }
    }

    /// Recomputes the workspace projection from current state.
    pub fn refresh_workspace(&self) {
        let projection = workspace::analyze(
            self.store.cursor(),
            &self.store.events(),
            &self.tracker.pending_tombstones(),
            &self.remote.latest(),
        );
        *self.workspace.write() = projection;
    }

    /// Fetches the lightweight account summary.
    ///
    /// Read-only; does not count as a sync round and ignores the
    /// single-flight flag.
    pub fn summary(&self) -> SyncResult<SummaryResponse> {
        let token = auth::fresh_token(self.tokens.as_ref(), now_millis())?;
        self.transport.summary(&token.token)
    }

    /// Runs one sync round in the given mode.
    pub fn sync(&self, mode: SyncMode) -> SyncResult<SyncOutcome> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SyncError::InProgress);
        }

        let started_at = now_millis();
        let start = Instant::now();
        *self.phase.write() = SyncPhase::Syncing;
        tracing::info!(mode = mode.as_str(), "sync round started");

        let result = self.run(mode);
        let duration = start.elapsed();

        let record = match &result {
            Ok(outcome) => {
                *self.phase.write() = SyncPhase::Success;
                tracing::info!(
                    mode = mode.as_str(),
                    uploaded = outcome.uploaded,
                    downloaded = outcome.downloaded,
                    conflicts = outcome.conflict_count(),
                    "sync round succeeded"
                );
                SyncRecord {
                    mode,
                    success: true,
                    uploaded: outcome.uploaded,
                    downloaded: outcome.downloaded,
                    conflicts: outcome.conflict_count(),
                    duration,
                    timestamp: started_at,
                    error: None,
                }
            }
            Err(error) => {
                *self.phase.write() = SyncPhase::Error;
                tracing::warn!(mode = mode.as_str(), %error, "sync round failed");
                SyncRecord {
                    mode,
                    success: false,
                    uploaded: 0,
                    downloaded: 0,
                    conflicts: 0,
                    duration,
                    timestamp: started_at,
                    error: Some(error.to_string()),
                }
            }
        };
        self.history.write().push(record);
        self.in_flight.store(false, Ordering::SeqCst);

        result
    }

    fn run(&self, mode: SyncMode) -> SyncResult<SyncOutcome> {
        let token = auth::fresh_token(self.tokens.as_ref(), now_millis())?;
        match mode {
            SyncMode::ForceOverwriteLocal => self.force_overwrite_local(mode, &token),
            SyncMode::ForceOverwriteRemote => self.force_overwrite_remote(mode, &token),
            SyncMode::SmartMerge => self.merge_sync(mode, &token, true),
            SyncMode::Incremental | SyncMode::AutoIncremental => {
                self.merge_sync(mode, &token, false)
            }
        }
    }

    /// Replaces local data with the server snapshot.
    fn force_overwrite_local(&self, mode: SyncMode, token: &AuthToken) -> SyncResult<SyncOutcome> {
        let full = self.transport.full_sync(&token.token)?;
        let downloaded = full_count(&full);

        let detail = self.store.merge_remote(
            &full.pomodoro_events,
            &full.system_events,
            full.timer_settings,
            MergeStrategy::Snapshot,
        );
        self.remote
            .store_snapshot(full.server_timestamp, full.pomodoro_events.clone());
        // Pending deletions are moot once the server snapshot is the truth.
        self.tracker.clear_all();
        self.store.set_cursor(full.server_timestamp);
        self.refresh_workspace();

        Ok(SyncOutcome {
            mode,
            uploaded: 0,
            downloaded,
            conflicts: Vec::new(),
            detail,
            server_timestamp: full.server_timestamp,
        })
    }

    /// Replaces the server's dataset with local data via the cursor-0
    /// sentinel.
    fn force_overwrite_remote(&self, mode: SyncMode, token: &AuthToken) -> SyncResult<SyncOutcome> {
        let mut created: Vec<TimedEvent> = self.store.events().into_values().collect();
        created.sort_by_key(|e| (e.created_at, e.uuid));
        let mut activity: Vec<_> = self.store.activity().into_values().collect();
        activity.sort_by_key(|e| (e.created_at, e.uuid));

        let changes = ChangeSet {
            pomodoro_events: EventChanges {
                created: created.clone(),
                updated: Vec::new(),
                deleted: Vec::new(),
            },
            system_events: ActivityChanges { created: activity },
            timer_settings: self.store.settings(),
        };
        let uploaded = changes.len() as u64;

        let request = IncrementalSyncRequest {
            last_sync_timestamp: FORCE_OVERWRITE_CURSOR,
            changes,
        };
        let response = self.transport.incremental_sync(&token.token, &request)?;

        // The server now mirrors this device exactly.
        self.remote
            .store_snapshot(response.server_timestamp, created);
        self.tracker.clear_all();
        self.store.set_cursor(response.server_timestamp);
        self.refresh_workspace();

        Ok(SyncOutcome {
            mode,
            uploaded,
            downloaded: 0,
            conflicts: response.conflicts,
            detail: MergeOutcome::default(),
            server_timestamp: response.server_timestamp,
        })
    }

    /// The delta-exchanging modes: smart merge, incremental, auto.
    ///
    /// All network calls complete before any local mutation, so a failure
    /// anywhere leaves the store, tombstones, and cursor untouched. A
    /// never-synced device (cursor 0) always fetches the full dataset
    /// first; sending cursor 0 in the incremental request would trip the
    /// force-overwrite sentinel and wipe the server.
    ///
    /// The incremental request keeps the device's old cursor even when a
    /// full fetch ran: the snapshot carries only live rows, so deletions
    /// tombstoned after the old cursor arrive solely through
    /// `server_changes`. Rows echoed by both responses merge idempotently.
    /// Only the never-synced case substitutes the fetched watermark, to
    /// stay clear of the sentinel.
    fn merge_sync(
        &self,
        mode: SyncMode,
        token: &AuthToken,
        fetch_full: bool,
    ) -> SyncResult<SyncOutcome> {
        let old_cursor = self.store.cursor();
        let fetch_full = fetch_full || old_cursor == FORCE_OVERWRITE_CURSOR;

        let full = if fetch_full {
            Some(self.transport.full_sync(&token.token)?)
        } else {
            None
        };
        let request_cursor = if old_cursor == FORCE_OVERWRITE_CURSOR {
            full.as_ref().map_or(old_cursor, |f| f.server_timestamp)
        } else {
            old_cursor
        };

        // Collected against the old cursor, before the snapshot merge, so
        // only genuine local edits upload.
        let changes = self.tracker.collect_changes_since(&self.store, old_cursor);
        let uploaded = changes.len() as u64;
        let acknowledged: Vec<Uuid> = changes.pomodoro_events.deleted.clone();

        let request = IncrementalSyncRequest {
            last_sync_timestamp: request_cursor,
            changes,
        };
        let response = self.transport.incremental_sync(&token.token, &request)?;

        let mut downloaded = 0;
        let mut detail = MergeOutcome::default();
        if let Some(full) = full {
            downloaded += full_count(&full);
            detail.absorb(self.store.merge_remote(
                &full.pomodoro_events,
                &full.system_events,
                full.timer_settings,
                MergeStrategy::Delta,
            ));
            self.remote
                .store_snapshot(full.server_timestamp, full.pomodoro_events);
        }
        downloaded += server_changes_count(&response.server_changes);
        detail.absorb(self.store.merge_remote(
            &response.server_changes.pomodoro_events,
            &response.server_changes.system_events,
            response.server_changes.timer_settings,
            MergeStrategy::Delta,
        ));
        self.remote.store_delta(
            response.server_timestamp,
            response.server_changes.pomodoro_events.clone(),
        );
        self.tracker.clear_acknowledged(&acknowledged);
        self.store.set_cursor(response.server_timestamp);
        self.refresh_workspace();

        Ok(SyncOutcome {
            mode,
            uploaded,
            downloaded,
            conflicts: response.conflicts,
            detail,
            server_timestamp: response.server_timestamp,
        })
    }
}

impl<T: SyncTransport + 'static, P: TokenProvider + 'static> SyncClient<T, P> {
    /// Spawns the periodic auto-sync task.
    ///
    /// Ticks every [`SyncConfig::auto_sync_interval`]; a tick while a sync
    /// is in flight is a no-op. There is no backoff beyond the fixed
    /// interval.
    pub fn spawn_auto_sync(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let client = Arc::clone(self);
        let interval = client.config.auto_sync_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick fires immediately; consume it so the task
            // waits a full interval before its first sync.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match client.sync(SyncMode::AutoIncremental) {
                    Ok(outcome) => tracing::debug!(
                        uploaded = outcome.uploaded,
                        downloaded = outcome.downloaded,
                        "auto sync completed"
                    ),
                    Err(SyncError::InProgress) => {
                        tracing::debug!("sync in flight, auto tick skipped");
                    }
                    Err(error) => tracing::warn!(%error, "auto sync failed"),
                }
            }
        })
    }
}

fn full_count(full: &FullSyncResponse) -> u64 {
    (full.pomodoro_events.len() + full.system_events.len()) as u64
        + u64::from(full.timer_settings.is_some())
}

fn server_changes_count(changes: &ServerChanges) -> u64 {
    (changes.pomodoro_events.len() + changes.system_events.len()) as u64
        + u64::from(changes.timer_settings.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;
    use crate::transport::MockTransport;
    use crate::workspace::ChangeTag;
    use tempo_sync_protocol::{EventKind, IncrementalSyncResponse};

    const FAR_FUTURE: Millis = i64::MAX / 2;

    fn client_with(
        store: Arc<LocalStore>,
        transport: MockTransport,
    ) -> SyncClient<MockTransport, StaticTokenProvider> {
        let config = SyncConfig::new("https://sync.example.com", Uuid::new_v4());
        let tokens = StaticTokenProvider::new(AuthToken::new("token", FAR_FUTURE));
        SyncClient::new(config, store, transport, tokens)
    }

    fn dirty_event(title: &str, at: Millis) -> TimedEvent {
        TimedEvent::new(title, EventKind::Focus, at, at + 100, at)
    }

    #[test]
    fn incremental_round_uploads_delta_and_advances_cursor() {
        let store = Arc::new(LocalStore::new());
        store.set_cursor(100);
        store.upsert_event(dirty_event("local edit", 150));

        let remote_event = dirty_event("from peer", 180);
        let transport = MockTransport::new();
        transport.set_incremental_response(IncrementalSyncResponse {
            conflicts: Vec::new(),
            server_changes: ServerChanges {
                pomodoro_events: vec![remote_event.clone()],
                system_events: Vec::new(),
                timer_settings: None,
            },
            server_timestamp: 200,
        });

        let client = client_with(Arc::clone(&store), transport);
        let outcome = client.sync(SyncMode::Incremental).unwrap();

        assert_eq!(outcome.uploaded, 1);
        assert_eq!(outcome.downloaded, 1);
        assert!(outcome.conflicts.is_empty());
        assert_eq!(store.cursor(), 200);
        assert!(store.event(&remote_event.uuid).is_some());
        assert_eq!(client.phase(), SyncPhase::Success);

        let history = client.history();
        assert_eq!(history.len(), 1);
        assert!(history[0].success);
        assert_eq!(history[0].mode, SyncMode::Incremental);
    }

    #[test]
    fn failure_leaves_everything_untouched() {
        let store = Arc::new(LocalStore::new());
        store.set_cursor(100);
        let doomed = dirty_event("to delete", 50);
        store.upsert_event(doomed.clone());

        let transport = MockTransport::new();
        transport.fail_with("connection reset");

        let client = client_with(Arc::clone(&store), transport);
        assert!(client.delete_event(&doomed.uuid));

        let err = client.sync(SyncMode::Incremental).unwrap_err();
        assert!(matches!(err, SyncError::Network(_)));

        assert_eq!(store.cursor(), 100);
        assert_eq!(client.tracker.pending_tombstones().len(), 1);
        assert_eq!(client.phase(), SyncPhase::Error);

        let history = client.history();
        assert_eq!(history.len(), 1);
        assert!(!history[0].success);
        assert!(history[0].error.as_deref().unwrap().contains("connection reset"));
    }

    #[test]
    fn first_incremental_escalates_to_full_fetch() {
        // Cursor 0 means never synced; sending it in the incremental
        // request would wipe the server.
        let store = Arc::new(LocalStore::new());
        let transport = MockTransport::new();
        transport.set_full_response(FullSyncResponse {
            pomodoro_events: vec![dirty_event("server event", 300)],
            system_events: Vec::new(),
            timer_settings: None,
            server_timestamp: 300,
        });
        transport.set_incremental_response(IncrementalSyncResponse {
            server_timestamp: 300,
            ..Default::default()
        });

        let client = client_with(Arc::clone(&store), transport);
        let outcome = client.sync(SyncMode::Incremental).unwrap();

        assert_eq!(outcome.downloaded, 1);
        assert_eq!(store.cursor(), 300);
        let sent = client.transport.incremental_requests();
        assert_eq!(sent[0].last_sync_timestamp, 300);
    }

    #[test]
    fn smart_merge_keeps_old_cursor_so_tombstones_arrive() {
        // The full snapshot only carries live rows; asking for server
        // changes from the fetched watermark instead of the old cursor
        // would skip every deletion tombstoned in between.
        let store = Arc::new(LocalStore::new());
        store.set_cursor(100);
        let doomed = dirty_event("deleted on a peer", 80);
        store.upsert_event(doomed.clone());

        let mut tombstone = doomed.clone();
        tombstone.deleted_at = Some(250);
        tombstone.updated_at = 250;

        let transport = MockTransport::new();
        transport.set_full_response(FullSyncResponse {
            pomodoro_events: Vec::new(),
            system_events: Vec::new(),
            timer_settings: None,
            server_timestamp: 300,
        });
        transport.set_incremental_response(IncrementalSyncResponse {
            conflicts: Vec::new(),
            server_changes: ServerChanges {
                pomodoro_events: vec![tombstone],
                system_events: Vec::new(),
                timer_settings: None,
            },
            server_timestamp: 300,
        });

        let client = client_with(Arc::clone(&store), transport);
        client.sync(SyncMode::SmartMerge).unwrap();

        let sent = client.transport.incremental_requests();
        assert_eq!(sent[0].last_sync_timestamp, 100);
        assert!(store.event(&doomed.uuid).is_none());
        assert_eq!(store.cursor(), 300);
    }

    #[test]
    fn force_overwrite_local_replaces_store() {
        let store = Arc::new(LocalStore::new());
        store.set_cursor(100);
        store.upsert_event(dirty_event("local only 1", 150));
        store.upsert_event(dirty_event("local only 2", 160));
        store.set_settings(tempo_sync_protocol::TimerSettings::new(1500, 300, 900, 150));

        let server_events = vec![dirty_event("server 1", 10), dirty_event("server 2", 20)];
        let transport = MockTransport::new();
        transport.set_full_response(FullSyncResponse {
            pomodoro_events: server_events.clone(),
            system_events: Vec::new(),
            timer_settings: None,
            server_timestamp: 500,
        });

        let client = client_with(Arc::clone(&store), transport);
        let outcome = client.sync(SyncMode::ForceOverwriteLocal).unwrap();

        assert_eq!(store.event_count(), 2);
        for event in &server_events {
            assert!(store.event(&event.uuid).is_some());
        }
        assert_eq!(store.cursor(), 500);
        // Two local-only events plus the settings the snapshot lacked.
        assert_eq!(outcome.detail.deleted, 3);
        assert!(store.settings().is_none());
    }

    #[test]
    fn force_overwrite_remote_sends_sentinel_cursor() {
        let store = Arc::new(LocalStore::new());
        store.set_cursor(400);
        store.upsert_event(dirty_event("mine", 10));

        let transport = MockTransport::new();
        transport.set_incremental_response(IncrementalSyncResponse {
            server_timestamp: 450,
            ..Default::default()
        });

        let client = client_with(Arc::clone(&store), transport);
        let outcome = client.sync(SyncMode::ForceOverwriteRemote).unwrap();

        assert_eq!(outcome.uploaded, 1);
        assert_eq!(store.cursor(), 450);
        let sent = client.transport.incremental_requests();
        assert_eq!(sent[0].last_sync_timestamp, FORCE_OVERWRITE_CURSOR);
        assert_eq!(sent[0].changes.pomodoro_events.created.len(), 1);
    }

    #[test]
    fn overlapping_sync_is_dropped() {
        let store = Arc::new(LocalStore::new());
        store.set_cursor(100);
        let transport = MockTransport::new();
        transport.set_incremental_response(IncrementalSyncResponse {
            server_timestamp: 150,
            ..Default::default()
        });

        let client = client_with(store, transport);
        client.in_flight.store(true, Ordering::SeqCst);
        let err = client.sync(SyncMode::Incremental).unwrap_err();
        assert!(matches!(err, SyncError::InProgress));
        // A dropped request leaves no history record.
        assert!(client.history().is_empty());

        client.in_flight.store(false, Ordering::SeqCst);
        assert!(client.sync(SyncMode::Incremental).is_ok());
    }

    #[test]
    fn workspace_reflects_new_baseline_after_sync() {
        let store = Arc::new(LocalStore::new());
        store.set_cursor(100);
        store.upsert_event(dirty_event("pending", 150));

        let transport = MockTransport::new();
        transport.set_incremental_response(IncrementalSyncResponse {
            server_timestamp: 200,
            ..Default::default()
        });

        let client = client_with(Arc::clone(&store), transport);
        client.refresh_workspace();
        assert_eq!(client.workspace().staged_count(), 1);

        client.sync(SyncMode::Incremental).unwrap();
        assert!(client.workspace().is_clean());
        assert_eq!(client.workspace().cursor, 200);
    }

    #[test]
    fn deletion_uploads_and_clears_tombstone() {
        let store = Arc::new(LocalStore::new());
        store.set_cursor(100);
        let doomed = dirty_event("doomed", 50);
        store.upsert_event(doomed.clone());

        let transport = MockTransport::new();
        transport.set_incremental_response(IncrementalSyncResponse {
            server_timestamp: 150,
            ..Default::default()
        });

        let client = client_with(Arc::clone(&store), transport);
        client.delete_event(&doomed.uuid);
        assert_eq!(client.workspace().staged[0].tag, ChangeTag::Deleted);

        client.sync(SyncMode::Incremental).unwrap();

        assert!(client.tracker.pending_tombstones().is_empty());
        let sent = client.transport.incremental_requests();
        assert_eq!(sent[0].changes.pomodoro_events.deleted, vec![doomed.uuid]);
    }

    #[test]
    fn expired_token_fails_as_not_authenticated() {
        struct ExpiredProvider;
        impl TokenProvider for ExpiredProvider {
            fn current(&self) -> SyncResult<AuthToken> {
                Ok(AuthToken::new("stale", 0))
            }
            fn refresh(&self) -> SyncResult<AuthToken> {
                Err(SyncError::Network("refresh endpoint down".into()))
            }
        }

        let store = Arc::new(LocalStore::new());
        store.set_cursor(100);
        let config = SyncConfig::new("https://sync.example.com", Uuid::new_v4());
        let client = SyncClient::new(config, Arc::clone(&store), MockTransport::new(), ExpiredProvider);

        let err = client.sync(SyncMode::Incremental).unwrap_err();
        assert!(matches!(err, SyncError::NotAuthenticated(_)));
        assert_eq!(store.cursor(), 100);
        assert!(!client.history()[0].success);
    }
}
