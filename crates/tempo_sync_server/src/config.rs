//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for the sync server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Maximum records accepted in one incremental request.
    pub max_batch: usize,
    /// Number of recent events returned by the summary endpoint.
    pub recent_preview: usize,
    /// Secret key for session token signing.
    pub auth_secret: Vec<u8>,
    /// Session token lifetime.
    pub token_expiry: Duration,
}

impl ServerConfig {
    /// Creates a configuration with defaults.
    pub fn new(bind_addr: SocketAddr, auth_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            bind_addr,
            max_batch: 1000,
            recent_preview: 5,
            auth_secret: auth_secret.into(),
            token_expiry: Duration::from_secs(24 * 60 * 60),
        }
    }

    /// Sets the maximum incremental batch size.
    pub fn with_max_batch(mut self, max: usize) -> Self {
        self.max_batch = max;
        self
    }

    /// Sets the summary preview length.
    pub fn with_recent_preview(mut self, preview: usize) -> Self {
        self.recent_preview = preview;
        self
    }

    /// Sets the session token lifetime.
    pub fn with_token_expiry(mut self, expiry: Duration) -> Self {
        self.token_expiry = expiry;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(
            SocketAddr::from(([127, 0, 0, 1], 8080)),
            b"tempo-dev-secret".as_slice(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.max_batch, 1000);
        assert_eq!(config.recent_preview, 5);
        assert_eq!(config.token_expiry, Duration::from_secs(86_400));
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::new("0.0.0.0:9000".parse().unwrap(), b"secret".as_slice())
            .with_max_batch(50)
            .with_recent_preview(3)
            .with_token_expiry(Duration::from_secs(60));

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.max_batch, 50);
        assert_eq!(config.recent_preview, 3);
        assert_eq!(config.token_expiry, Duration::from_secs(60));
    }
}
