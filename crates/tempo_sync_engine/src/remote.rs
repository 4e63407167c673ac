//! Cached view of the server's data.

use parking_lot::RwLock;
use tempo_sync_protocol::{Millis, TimedEvent};

#[derive(Debug, Default)]
struct CacheInner {
    snapshot: Option<(Millis, Vec<TimedEvent>)>,
    delta: Option<(Millis, Vec<TimedEvent>)>,
}

/// The freshest remote data seen by this device.
///
/// Holds the last full snapshot and the last incremental delta separately;
/// the workspace projection reads whichever carries the newer
/// `server_timestamp`. Purely a display cache, never merged from.
#[derive(Debug, Default)]
pub struct RemoteCache {
    inner: RwLock<CacheInner>,
}

impl RemoteCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a full server snapshot.
    pub fn store_snapshot(&self, server_timestamp: Millis, events: Vec<TimedEvent>) {
        self.inner.write().snapshot = Some((server_timestamp, events));
    }

    /// Stores an incremental server delta.
    pub fn store_delta(&self, server_timestamp: Millis, events: Vec<TimedEvent>) {
        self.inner.write().delta = Some((server_timestamp, events));
    }

    /// Returns the freshest cached remote events, newest timestamp wins.
    pub fn latest(&self) -> Vec<TimedEvent> {
        let inner = self.inner.read();
        match (&inner.snapshot, &inner.delta) {
            (Some((snap_ts, snap)), Some((delta_ts, delta))) => {
                if delta_ts > snap_ts {
                    delta.clone()
                } else {
                    snap.clone()
                }
            }
            (Some((_, snap)), None) => snap.clone(),
            (None, Some((_, delta))) => delta.clone(),
            (None, None) => Vec::new(),
        }
    }

    /// Timestamp of the freshest cached view, when any exists.
    pub fn latest_timestamp(&self) -> Option<Millis> {
        let inner = self.inner.read();
        let snap = inner.snapshot.as_ref().map(|(ts, _)| *ts);
        let delta = inner.delta.as_ref().map(|(ts, _)| *ts);
        snap.max(delta)
    }
}
