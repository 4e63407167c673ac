//! HTTP transport implementation.
//!
//! The actual HTTP client is abstracted via a trait so different libraries
//! (reqwest, ureq, an in-process loopback) can sit underneath. Bodies are
//! JSON; authentication travels as a bearer header.

use crate::error::{SyncError, SyncResult};
use crate::transport::SyncTransport;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tempo_sync_protocol::{
    FullSyncResponse, IncrementalSyncRequest, IncrementalSyncResponse, SummaryResponse,
};

/// A raw HTTP response: status code plus body bytes.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
///
/// An `Err` means the request produced no HTTP response at all (DNS,
/// connect, timeout); server-side failures come back as an [`HttpResponse`]
/// with a non-2xx status.
pub trait HttpClient: Send + Sync {
    /// Sends a GET request.
    fn get(&self, url: &str, bearer: &str) -> Result<HttpResponse, String>;

    /// Sends a POST request with a JSON body.
    fn post(&self, url: &str, bearer: &str, body: Vec<u8>) -> Result<HttpResponse, String>;
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    error: String,
}

/// JSON-over-HTTP sync transport.
pub struct HttpTransport<C: HttpClient> {
    base_url: String,
    client: C,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a transport against the given base URL.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into(),
            client,
            last_error: RwLock::new(None),
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The last transport-level error message, if any.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn handle<Res: DeserializeOwned>(
        &self,
        result: Result<HttpResponse, String>,
    ) -> SyncResult<Res> {
        let response = result.map_err(|e| {
            *self.last_error.write() = Some(e.clone());
            SyncError::Network(e)
        })?;
        *self.last_error.write() = None;

        if !response.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&response.body)
                .map(|b| b.error)
                .unwrap_or_else(|_| String::from_utf8_lossy(&response.body).into_owned());
            if response.status == 401 {
                return Err(SyncError::NotAuthenticated(message));
            }
            return Err(SyncError::Server {
                status: response.status,
                message,
            });
        }

        serde_json::from_slice(&response.body)
            .map_err(|e| SyncError::Protocol(format!("failed to decode response: {e}")))
    }

    fn get_json<Res: DeserializeOwned>(&self, endpoint: &str, bearer: &str) -> SyncResult<Res> {
        self.handle(self.client.get(&self.url(endpoint), bearer))
    }

    fn post_json<Req: Serialize, Res: DeserializeOwned>(
        &self,
        endpoint: &str,
        bearer: &str,
        request: &Req,
    ) -> SyncResult<Res> {
        let body = serde_json::to_vec(request)
            .map_err(|e| SyncError::Protocol(format!("failed to encode request: {e}")))?;
        self.handle(self.client.post(&self.url(endpoint), bearer, body))
    }
}

impl<C: HttpClient> SyncTransport for HttpTransport<C> {
    fn full_sync(&self, token: &str) -> SyncResult<FullSyncResponse> {
        self.get_json("/sync/full", token)
    }

    fn incremental_sync(
        &self,
        token: &str,
        request: &IncrementalSyncRequest,
    ) -> SyncResult<IncrementalSyncResponse> {
        self.post_json("/sync/incremental", token, request)
    }

    fn summary(&self, token: &str) -> SyncResult<SummaryResponse> {
        self.get_json("/sync/summary", token)
    }
}

/// A server reachable without a network hop.
pub trait LoopbackServer: Send + Sync {
    /// Handles one request and returns the response the HTTP layer would
    /// have produced.
    fn handle(&self, method: &str, path: &str, bearer: &str, body: &[u8]) -> HttpResponse;
}

/// An [`HttpClient`] that routes requests straight into an in-process
/// server. Used by integration tests to drive a real server without
/// network overhead.
pub struct LoopbackClient<S: LoopbackServer> {
    server: Arc<S>,
}

impl<S: LoopbackServer> LoopbackClient<S> {
    /// Creates a loopback client wired to the given server.
    pub fn new(server: Arc<S>) -> Self {
        Self { server }
    }

    /// Strips scheme and authority, leaving the request path. The host may
    /// itself contain route-looking segments, so this splits on the first
    /// `/` after `://` rather than searching for known prefixes.
    fn path(url: &str) -> &str {
        let authority = url.find("://").map_or(0, |i| i + 3);
        url[authority..]
            .find('/')
            .map_or("/", |i| &url[authority + i..])
    }
}

impl<S: LoopbackServer> HttpClient for LoopbackClient<S> {
    fn get(&self, url: &str, bearer: &str) -> Result<HttpResponse, String> {
        Ok(self.server.handle("GET", Self::path(url), bearer, &[]))
    }

    fn post(&self, url: &str, bearer: &str, body: Vec<u8>) -> Result<HttpResponse, String> {
        Ok(self.server.handle("POST", Self::path(url), bearer, &body))
    }
}
