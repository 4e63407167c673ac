//! Transport layer abstraction for sync operations.

use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use tempo_sync_protocol::{
    FullSyncResponse, IncrementalSyncRequest, IncrementalSyncResponse, SummaryResponse,
};

/// Network communication with the sync server.
///
/// Abstracting the network layer lets the client run against HTTP, an
/// in-process loopback, or a mock in tests.
pub trait SyncTransport: Send + Sync {
    /// Fetches the user's entire live dataset.
    fn full_sync(&self, token: &str) -> SyncResult<FullSyncResponse>;

    /// Exchanges deltas since the request's cursor.
    fn incremental_sync(
        &self,
        token: &str,
        request: &IncrementalSyncRequest,
    ) -> SyncResult<IncrementalSyncResponse>;

    /// Fetches the lightweight account summary.
    fn summary(&self, token: &str) -> SyncResult<SummaryResponse>;
}

/// A scripted transport for unit tests.
#[derive(Debug, Default)]
pub struct MockTransport {
    full_response: Mutex<Option<FullSyncResponse>>,
    incremental_response: Mutex<Option<IncrementalSyncResponse>>,
    summary_response: Mutex<Option<SummaryResponse>>,
    incremental_requests: Mutex<Vec<IncrementalSyncRequest>>,
    fail_with: Mutex<Option<String>>,
}

impl MockTransport {
    /// Creates a mock with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the full-sync response.
    pub fn set_full_response(&self, response: FullSyncResponse) {
        *self.full_response.lock() = Some(response);
    }

    /// Scripts the incremental response.
    pub fn set_incremental_response(&self, response: IncrementalSyncResponse) {
        *self.incremental_response.lock() = Some(response);
    }

    /// Scripts the summary response.
    pub fn set_summary_response(&self, response: SummaryResponse) {
        *self.summary_response.lock() = Some(response);
    }

    /// Makes every call fail with a network error.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.fail_with.lock() = Some(message.into());
    }

    /// The incremental requests the client sent, oldest first.
    pub fn incremental_requests(&self) -> Vec<IncrementalSyncRequest> {
        self.incremental_requests.lock().clone()
    }

    fn check_failure(&self) -> SyncResult<()> {
        match self.fail_with.lock().clone() {
            Some(message) => Err(SyncError::Network(message)),
            None => Ok(()),
        }
    }
}

impl SyncTransport for MockTransport {
    fn full_sync(&self, _token: &str) -> SyncResult<FullSyncResponse> {
        self.check_failure()?;
        self.full_response
            .lock()
            .clone()
            .ok_or_else(|| SyncError::Protocol("no mock full-sync response set".into()))
    }

    fn incremental_sync(
        &self,
        _token: &str,
        request: &IncrementalSyncRequest,
    ) -> SyncResult<IncrementalSyncResponse> {
        self.check_failure()?;
        self.incremental_requests.lock().push(request.clone());
        self.incremental_response
            .lock()
            .clone()
            .ok_or_else(|| SyncError::Protocol("no mock incremental response set".into()))
    }

    fn summary(&self, _token: &str) -> SyncResult<SummaryResponse> {
        self.check_failure()?;
        self.summary_response
            .lock()
            .clone()
            .ok_or_else(|| SyncError::Protocol("no mock summary response set".into()))
    }
}
