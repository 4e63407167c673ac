//! Error types for the sync client.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during a sync round.
#[derive(Error, Debug)]
pub enum SyncError {
    /// No usable session token; a refresh was attempted once and failed.
    #[error("not authenticated: {0}")]
    NotAuthenticated(String),

    /// The request never produced an HTTP response.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status. The message is the
    /// server's own, passed through verbatim.
    #[error("server error (status {status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Server-provided message.
        message: String,
    },

    /// A sync round was already in flight; this request was dropped.
    #[error("sync already in progress")]
    InProgress,

    /// The response body could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl SyncError {
    /// Returns true if a later attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Network(_) | SyncError::InProgress => true,
            SyncError::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns true if the failure is an authentication problem.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            SyncError::NotAuthenticated(_) | SyncError::Server { status: 401, .. }
        )
    }
}
