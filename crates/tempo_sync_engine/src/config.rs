//! Configuration for the sync client.

use std::time::Duration;
use uuid::Uuid;

/// Configuration for the sync client.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the sync server.
    pub server_url: String,
    /// Stable per-install device id.
    pub device_id: Uuid,
    /// Interval between automatic sync rounds.
    pub auto_sync_interval: Duration,
    /// Transport-level connect timeout, passed to the HTTP client.
    pub connect_timeout: Duration,
    /// Transport-level total request timeout, passed to the HTTP client.
    pub request_timeout: Duration,
    /// Maximum sync records retained in history.
    pub history_limit: usize,
}

impl SyncConfig {
    /// Creates a configuration with default intervals and timeouts.
    pub fn new(server_url: impl Into<String>, device_id: Uuid) -> Self {
        Self {
            server_url: server_url.into(),
            device_id,
            auto_sync_interval: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(60),
            history_limit: 50,
        }
    }

    /// Sets the automatic sync interval.
    pub fn with_auto_sync_interval(mut self, interval: Duration) -> Self {
        self.auto_sync_interval = interval;
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the total request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the history cap.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new("", Uuid::nil())
    }
}
