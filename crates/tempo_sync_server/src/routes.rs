//! HTTP routing.

use crate::error::ServerError;
use crate::server::SyncServer;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tempo_sync_protocol::{
    now_millis, FullSyncResponse, IncrementalSyncRequest, IncrementalSyncResponse, MigrateRequest,
    MigrateResponse, RegisterDeviceRequest, RegisterDeviceResponse, SummaryResponse,
};
use tower_http::trace::TraceLayer;

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if !self.is_client_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Builds the router over a shared server instance.
pub fn router(server: Arc<SyncServer>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/devices/register", post(register_device))
        .route("/sync/full", get(full_sync))
        .route("/sync/incremental", post(incremental_sync))
        .route("/sync/summary", get(summary))
        .route("/sync/migrate", post(migrate))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

fn bearer(headers: &HeaderMap) -> &str {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .unwrap_or("")
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn register_device(
    State(server): State<Arc<SyncServer>>,
    Json(request): Json<RegisterDeviceRequest>,
) -> Result<Json<RegisterDeviceResponse>, ServerError> {
    let response = server.handler().handle_register(request, now_millis())?;
    Ok(Json(response))
}

async fn full_sync(
    State(server): State<Arc<SyncServer>>,
    headers: HeaderMap,
) -> Result<Json<FullSyncResponse>, ServerError> {
    let now = now_millis();
    let claims = server.handler().authenticate(bearer(&headers), now)?;
    Ok(Json(server.handler().handle_full_sync(claims, now)?))
}

async fn incremental_sync(
    State(server): State<Arc<SyncServer>>,
    headers: HeaderMap,
    Json(request): Json<IncrementalSyncRequest>,
) -> Result<Json<IncrementalSyncResponse>, ServerError> {
    let now = now_millis();
    let claims = server.handler().authenticate(bearer(&headers), now)?;
    Ok(Json(server.handler().handle_incremental(claims, &request, now)?))
}

async fn summary(
    State(server): State<Arc<SyncServer>>,
    headers: HeaderMap,
) -> Result<Json<SummaryResponse>, ServerError> {
    let now = now_millis();
    let claims = server.handler().authenticate(bearer(&headers), now)?;
    Ok(Json(server.handler().handle_summary(claims, now)?))
}

async fn migrate(
    State(server): State<Arc<SyncServer>>,
    headers: HeaderMap,
    Json(request): Json<MigrateRequest>,
) -> Result<Json<MigrateResponse>, ServerError> {
    let now = now_millis();
    let claims = server.handler().authenticate(bearer(&headers), now)?;
    Ok(Json(server.handler().handle_migrate(claims, &request, now)?))
}
