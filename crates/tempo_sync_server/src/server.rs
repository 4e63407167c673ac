//! The server facade: owns the stores and routes decoded requests.
//!
//! [`SyncServer::dispatch`] is framework-free request routing over raw
//! method, path, bearer, and body. The HTTP layer in [`crate::routes`] is a
//! thin adapter over it, and in-process tests can call it directly.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{HandlerContext, RequestHandler};
use crate::migrate::LegacyStore;
use crate::store::UserStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tempo_sync_protocol::now_millis;

/// The sync server: configuration, stores, and request handling.
pub struct SyncServer {
    handler: RequestHandler,
    store: Arc<UserStore>,
    legacy: Arc<LegacyStore>,
}

impl SyncServer {
    /// Creates a server with empty stores.
    pub fn new(config: ServerConfig) -> Self {
        let store = Arc::new(UserStore::new());
        let legacy = Arc::new(LegacyStore::new());
        let context = Arc::new(HandlerContext::new(
            config,
            Arc::clone(&store),
            Arc::clone(&legacy),
        ));
        Self {
            handler: RequestHandler::new(context),
            store,
            legacy,
        }
    }

    /// The per-user data store.
    pub fn store(&self) -> &Arc<UserStore> {
        &self.store
    }

    /// The legacy datasets awaiting migration.
    pub fn legacy(&self) -> &Arc<LegacyStore> {
        &self.legacy
    }

    /// The request handler.
    pub fn handler(&self) -> &RequestHandler {
        &self.handler
    }

    /// Routes one request and returns the status code and JSON body.
    pub fn dispatch(&self, method: &str, path: &str, bearer: &str, body: &[u8]) -> (u16, Vec<u8>) {
        let now = now_millis();
        match (method, path) {
            ("GET", "/health") => (200, br#"{"status":"ok"}"#.to_vec()),
            ("POST", "/devices/register") => respond(decode(body).and_then(|request| {
                self.handler.handle_register(request, now)
            })),
            ("GET", "/sync/full") => respond(
                self.handler
                    .authenticate(bearer, now)
                    .and_then(|claims| self.handler.handle_full_sync(claims, now)),
            ),
            ("POST", "/sync/incremental") => {
                respond(self.handler.authenticate(bearer, now).and_then(|claims| {
                    let request = decode(body)?;
                    self.handler.handle_incremental(claims, &request, now)
                }))
            }
            ("GET", "/sync/summary") => respond(
                self.handler
                    .authenticate(bearer, now)
                    .and_then(|claims| self.handler.handle_summary(claims, now)),
            ),
            ("POST", "/sync/migrate") => {
                respond(self.handler.authenticate(bearer, now).and_then(|claims| {
                    let request = decode(body)?;
                    self.handler.handle_migrate(claims, &request, now)
                }))
            }
            _ => {
                tracing::debug!(method, path, "no route");
                (404, br#"{"error":"not found"}"#.to_vec())
            }
        }
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> ServerResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| ServerError::InvalidRequest(format!("malformed request body: {e}")))
}

fn respond<T: Serialize>(result: ServerResult<T>) -> (u16, Vec<u8>) {
    match result {
        Ok(value) => match serde_json::to_vec(&value) {
            Ok(body) => (200, body),
            Err(e) => {
                tracing::error!(error = %e, "response encoding failed");
                (500, br#"{"error":"response encoding failed"}"#.to_vec())
            }
        },
        Err(error) => {
            if !error.is_client_error() {
                tracing::error!(%error, "request failed");
            }
            let body = serde_json::json!({ "error": error.to_string() });
            (
                error.status_code(),
                serde_json::to_vec(&body).unwrap_or_default(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempo_sync_protocol::{FullSyncResponse, RegisterDeviceResponse};
    use uuid::Uuid;

    fn register(server: &SyncServer) -> RegisterDeviceResponse {
        let body = serde_json::to_vec(&json!({
            "device_uuid": Uuid::new_v4(),
            "device_name": "laptop",
            "platform": "linux",
        }))
        .unwrap();
        let (status, body) = server.dispatch("POST", "/devices/register", "", &body);
        assert_eq!(status, 200);
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn health_check() {
        let server = SyncServer::new(ServerConfig::default());
        let (status, body) = server.dispatch("GET", "/health", "", &[]);
        assert_eq!(status, 200);
        assert_eq!(body, br#"{"status":"ok"}"#);
    }

    #[test]
    fn unknown_route_is_404() {
        let server = SyncServer::new(ServerConfig::default());
        let (status, _) = server.dispatch("GET", "/nope", "", &[]);
        assert_eq!(status, 404);
    }

    #[test]
    fn register_then_full_sync() {
        let server = SyncServer::new(ServerConfig::default());
        let registration = register(&server);

        let (status, body) = server.dispatch("GET", "/sync/full", &registration.session_token, &[]);
        assert_eq!(status, 200);
        let response: FullSyncResponse = serde_json::from_slice(&body).unwrap();
        assert!(response.pomodoro_events.is_empty());
    }

    #[test]
    fn sync_without_token_is_401() {
        let server = SyncServer::new(ServerConfig::default());
        let (status, body) = server.dispatch("GET", "/sync/full", "", &[]);
        assert_eq!(status, 401);
        let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(error["error"].as_str().unwrap().contains("bearer"));
    }

    #[test]
    fn malformed_body_is_400() {
        let server = SyncServer::new(ServerConfig::default());
        let registration = register(&server);

        let (status, _) = server.dispatch(
            "POST",
            "/sync/incremental",
            &registration.session_token,
            b"{not json",
        );
        assert_eq!(status, 400);
    }
}
