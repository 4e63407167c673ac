//! Request handlers for the sync endpoints.
//!
//! Handlers are framework-free: the HTTP layer hands them decoded
//! requests and claims, and every handler runs its work in one store
//! transaction with full rollback on error.

use crate::auth::{TokenClaims, TokenValidator};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::migrate::{self, LegacyStore};
use crate::store::{DeviceRecord, UserData, UserStore};
use std::sync::Arc;
use tempo_sync_protocol::{
    FullSyncResponse, IncrementalSyncRequest, IncrementalSyncResponse, MigrateRequest,
    MigrateResponse, MigrationSummary, Millis, RegisterDeviceRequest, RegisterDeviceResponse,
    ServerChanges, SummaryResponse, FORCE_OVERWRITE_CURSOR,
};
use uuid::Uuid;

/// Shared state for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Per-user datasets.
    pub store: Arc<UserStore>,
    /// Legacy datasets awaiting migration.
    pub legacy: Arc<LegacyStore>,
    /// Session token issuer and validator.
    pub validator: TokenValidator,
}

impl HandlerContext {
    /// Creates a context from a configuration.
    pub fn new(config: ServerConfig, store: Arc<UserStore>, legacy: Arc<LegacyStore>) -> Self {
        let validator = TokenValidator::new(config.auth_secret.clone(), config.token_expiry);
        Self {
            config,
            store,
            legacy,
            validator,
        }
    }
}

/// Handler for sync requests.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a handler over the given context.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Validates a bearer token and returns its claims.
    pub fn authenticate(&self, bearer: &str, now: Millis) -> ServerResult<TokenClaims> {
        if bearer.is_empty() {
            return Err(ServerError::NotAuthorized("missing bearer token".into()));
        }
        self.context.validator.validate(bearer, now)
    }

    /// Registers a device, creating the account when none was given, and
    /// issues its session token. The only unauthenticated data route.
    pub fn handle_register(
        &self,
        request: RegisterDeviceRequest,
        now: Millis,
    ) -> ServerResult<RegisterDeviceResponse> {
        if request.device_name.is_empty() {
            return Err(ServerError::InvalidRequest("empty device name".into()));
        }
        let user_uuid = request.user_uuid.unwrap_or_else(Uuid::new_v4);

        self.context.store.with_transaction(user_uuid, |data| {
            data.devices
                .entry(request.device_uuid)
                .or_insert_with(|| DeviceRecord {
                    device_uuid: request.device_uuid,
                    device_name: request.device_name.clone(),
                    platform: request.platform.clone(),
                    last_sync_timestamp: 0,
                    registered_at: now,
                });
            Ok(())
        })?;

        let (session_token, expires_at) =
            self.context
                .validator
                .create_token(user_uuid, request.device_uuid, now);
        tracing::info!(%user_uuid, device_uuid = %request.device_uuid, "device registered");

        Ok(RegisterDeviceResponse {
            user_uuid,
            session_token,
            expires_at,
        })
    }

    /// Returns the user's entire live dataset.
    pub fn handle_full_sync(
        &self,
        claims: TokenClaims,
        now: Millis,
    ) -> ServerResult<FullSyncResponse> {
        self.context
            .store
            .with_transaction(claims.user_uuid, |data| {
                let server_timestamp = data.data_timestamp(now);
                touch_device(data, claims.device_uuid, server_timestamp);
                Ok(FullSyncResponse {
                    pomodoro_events: data.live_events(),
                    system_events: data.live_activity(),
                    timer_settings: data.settings,
                    server_timestamp,
                })
            })
    }

    /// Exchanges deltas, or replaces the user's dataset when the request
    /// carries the cursor-0 sentinel.
    pub fn handle_incremental(
        &self,
        claims: TokenClaims,
        request: &IncrementalSyncRequest,
        now: Millis,
    ) -> ServerResult<IncrementalSyncResponse> {
        if request.changes.len() > self.context.config.max_batch {
            return Err(ServerError::InvalidRequest(format!(
                "batch of {} exceeds limit {}",
                request.changes.len(),
                self.context.config.max_batch
            )));
        }
        if request.last_sync_timestamp < FORCE_OVERWRITE_CURSOR {
            return Err(ServerError::InvalidRequest(format!(
                "negative cursor {}",
                request.last_sync_timestamp
            )));
        }

        if request.last_sync_timestamp == FORCE_OVERWRITE_CURSOR {
            return self.force_overwrite(claims, request, now);
        }

        let cursor = request.last_sync_timestamp;
        self.context
            .store
            .with_transaction(claims.user_uuid, |data| {
                // Computed before the client's writes land, so the client
                // never gets its own upload echoed back.
                let server_changes = ServerChanges {
                    pomodoro_events: data.events_after(cursor),
                    system_events: data.activity_after(cursor),
                    timer_settings: data.settings_after(cursor),
                };

                let conflicts = data.apply_changes(&request.changes, cursor, now)?;
                if !conflicts.is_empty() {
                    tracing::debug!(
                        user_uuid = %claims.user_uuid,
                        conflicts = conflicts.len(),
                        "incremental sync reported conflicts"
                    );
                }

                let server_timestamp = data.data_timestamp(now);
                touch_device(data, claims.device_uuid, server_timestamp);

                Ok(IncrementalSyncResponse {
                    conflicts,
                    server_changes,
                    server_timestamp,
                })
            })
    }

    fn force_overwrite(
        &self,
        claims: TokenClaims,
        request: &IncrementalSyncRequest,
        now: Millis,
    ) -> ServerResult<IncrementalSyncResponse> {
        tracing::info!(user_uuid = %claims.user_uuid, "force overwrite of user dataset");
        self.context
            .store
            .with_transaction(claims.user_uuid, |data| {
                data.replace_with(&request.changes)?;
                let server_timestamp = data.data_timestamp(now);
                touch_device(data, claims.device_uuid, server_timestamp);
                Ok(IncrementalSyncResponse {
                    conflicts: Vec::new(),
                    server_changes: ServerChanges::default(),
                    server_timestamp,
                })
            })
    }

    /// Returns counts and a short recent-events preview. Read-only.
    pub fn handle_summary(&self, claims: TokenClaims, now: Millis) -> ServerResult<SummaryResponse> {
        let preview = self.context.config.recent_preview;
        Ok(self.context.store.read(claims.user_uuid, |data| {
            let mut recent = data.live_events();
            recent.sort_by_key(|e| std::cmp::Reverse((e.start_time, e.uuid)));
            recent.truncate(preview);

            SummaryResponse {
                pomodoro_event_count: data.live_events().len() as u64,
                system_event_count: data.live_activity().len() as u64,
                has_timer_settings: data.settings.is_some(),
                server_timestamp: data.data_timestamp(now),
                recent_events: recent,
            }
        }))
    }

    /// Runs the one-time legacy migration for the requesting device.
    pub fn handle_migrate(
        &self,
        claims: TokenClaims,
        request: &MigrateRequest,
        now: Millis,
    ) -> ServerResult<MigrateResponse> {
        if request.device_uuid != claims.device_uuid {
            return Err(ServerError::NotAuthorized(
                "token does not belong to the migrating device".into(),
            ));
        }
        if request.from_version != migrate::SUPPORTED_LEGACY_VERSION {
            return Err(ServerError::InvalidRequest(format!(
                "unsupported legacy schema version {}",
                request.from_version
            )));
        }

        let legacy = self.context.legacy.get(&request.device_uuid);
        let response = self
            .context
            .store
            .with_transaction(claims.user_uuid, |data| {
                if data.migrated_devices.contains(&request.device_uuid) {
                    return Err(ServerError::AlreadyMigrated(request.device_uuid));
                }

                let summary = match &legacy {
                    Some(dataset) => migrate::import_dataset(data, dataset)?,
                    None => MigrationSummary::default(),
                };
                data.migrated_devices.insert(request.device_uuid);

                Ok(MigrateResponse {
                    migrated: true,
                    summary,
                    server_timestamp: data.data_timestamp(now),
                })
            })?;

        // Committed; the legacy copy is no longer needed.
        self.context.legacy.take(&request.device_uuid);
        tracing::info!(
            device_uuid = %request.device_uuid,
            events = response.summary.pomodoro_events_migrated,
            "legacy migration completed"
        );
        Ok(response)
    }
}

fn touch_device(data: &mut UserData, device_uuid: Uuid, cursor: Millis) {
    if let Some(device) = data.devices.get_mut(&device_uuid) {
        device.last_sync_timestamp = cursor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::LegacyDataset;
    use tempo_sync_protocol::{ChangeSet, EventChanges, EventKind, TimedEvent};

    fn handler() -> RequestHandler {
        let context = HandlerContext::new(
            ServerConfig::default().with_max_batch(10),
            Arc::new(UserStore::new()),
            Arc::new(LegacyStore::new()),
        );
        RequestHandler::new(Arc::new(context))
    }

    fn register(handler: &RequestHandler, now: Millis) -> TokenClaims {
        let response = handler
            .handle_register(
                RegisterDeviceRequest {
                    device_uuid: Uuid::new_v4(),
                    device_name: "laptop".into(),
                    platform: "macos".into(),
                    user_uuid: None,
                },
                now,
            )
            .unwrap();
        handler.authenticate(&response.session_token, now).unwrap()
    }

    fn event_at(title: &str, at: Millis) -> TimedEvent {
        TimedEvent::new(title, EventKind::Focus, at, at + 100, at)
    }

    fn created(events: Vec<TimedEvent>) -> ChangeSet {
        ChangeSet {
            pomodoro_events: EventChanges {
                created: events,
                updated: Vec::new(),
                deleted: Vec::new(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn register_issues_working_token() {
        let handler = handler();
        let claims = register(&handler, 1_000);
        assert_ne!(claims.user_uuid, Uuid::nil());
    }

    #[test]
    fn missing_token_rejected() {
        let handler = handler();
        assert!(matches!(
            handler.authenticate("", 0),
            Err(ServerError::NotAuthorized(_))
        ));
    }

    #[test]
    fn upload_then_peer_receives_in_server_changes() {
        let handler = handler();
        let uploader = register(&handler, 1);

        let event = event_at("A", 1500);
        let request = IncrementalSyncRequest {
            last_sync_timestamp: 1000,
            changes: created(vec![event.clone()]),
        };
        let response = handler.handle_incremental(uploader, &request, 1600).unwrap();
        assert!(response.conflicts.is_empty());
        assert!(response.server_changes.is_empty());
        assert_eq!(response.server_timestamp, 1500);

        // A peer device of the same user syncing from an older cursor.
        let peer = TokenClaims {
            device_uuid: Uuid::new_v4(),
            ..uploader
        };
        let peer_request = IncrementalSyncRequest {
            last_sync_timestamp: 1000,
            changes: ChangeSet::default(),
        };
        let peer_response = handler
            .handle_incremental(peer, &peer_request, 1700)
            .unwrap();
        assert_eq!(peer_response.server_changes.pomodoro_events.len(), 1);
        assert_eq!(peer_response.server_changes.pomodoro_events[0].uuid, event.uuid);
        assert_eq!(peer_response.server_timestamp, 1500);
    }

    #[test]
    fn force_overwrite_replaces_dataset() {
        let handler = handler();
        let claims = register(&handler, 1);

        let old = created(vec![event_at("old 1", 100), event_at("old 2", 200)]);
        handler
            .handle_incremental(
                claims,
                &IncrementalSyncRequest {
                    last_sync_timestamp: 50,
                    changes: old,
                },
                300,
            )
            .unwrap();

        let fresh = vec![event_at("new", 500)];
        handler
            .handle_incremental(
                claims,
                &IncrementalSyncRequest {
                    last_sync_timestamp: FORCE_OVERWRITE_CURSOR,
                    changes: created(fresh.clone()),
                },
                600,
            )
            .unwrap();

        let full = handler.handle_full_sync(claims, 700).unwrap();
        assert_eq!(full.pomodoro_events.len(), 1);
        assert_eq!(full.pomodoro_events[0].uuid, fresh[0].uuid);
    }

    #[test]
    fn oversized_batch_rejected() {
        let handler = handler();
        let claims = register(&handler, 1);

        let events = (0..11).map(|i| event_at("bulk", i * 10)).collect();
        let request = IncrementalSyncRequest {
            last_sync_timestamp: 1,
            changes: created(events),
        };
        let err = handler.handle_incremental(claims, &request, 500).unwrap_err();
        assert!(matches!(err, ServerError::InvalidRequest(_)));
    }

    #[test]
    fn summary_counts_and_preview() {
        let handler = handler();
        let claims = register(&handler, 1);

        let events: Vec<_> = (1..=8).map(|i| event_at("e", i * 100)).collect();
        handler
            .handle_incremental(
                claims,
                &IncrementalSyncRequest {
                    last_sync_timestamp: 1,
                    changes: created(events),
                },
                900,
            )
            .unwrap();

        let summary = handler.handle_summary(claims, 1_000).unwrap();
        assert_eq!(summary.pomodoro_event_count, 8);
        assert_eq!(summary.recent_events.len(), 5);
        // Newest first.
        assert_eq!(summary.recent_events[0].start_time, 800);
        assert!(!summary.has_timer_settings);
    }

    #[test]
    fn migrate_runs_once_per_device() {
        let handler = handler();
        let claims = register(&handler, 1);
        handler.context.legacy.seed_device(
            claims.device_uuid,
            LegacyDataset {
                schema_version: migrate::SUPPORTED_LEGACY_VERSION,
                events: vec![event_at("legacy", 100)],
                activity: Vec::new(),
                settings: None,
            },
        );

        let request = MigrateRequest {
            device_uuid: claims.device_uuid,
            from_version: migrate::SUPPORTED_LEGACY_VERSION,
        };
        let response = handler.handle_migrate(claims, &request, 200).unwrap();
        assert!(response.migrated);
        assert_eq!(response.summary.pomodoro_events_migrated, 1);

        let err = handler.handle_migrate(claims, &request, 300).unwrap_err();
        assert!(matches!(err, ServerError::AlreadyMigrated(_)));
    }

    #[test]
    fn migrate_rejects_foreign_device() {
        let handler = handler();
        let claims = register(&handler, 1);

        let request = MigrateRequest {
            device_uuid: Uuid::new_v4(),
            from_version: migrate::SUPPORTED_LEGACY_VERSION,
        };
        let err = handler.handle_migrate(claims, &request, 200).unwrap_err();
        assert!(matches!(err, ServerError::NotAuthorized(_)));
    }
}
