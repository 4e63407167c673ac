//! Sync modes and the bounded sync history.

use std::collections::VecDeque;
use std::time::Duration;
use tempo_sync_protocol::Millis;

/// The five sync modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Replace local data with the server snapshot.
    ForceOverwriteLocal,
    /// Replace the server's dataset with local data (cursor-0 sentinel).
    ForceOverwriteRemote,
    /// Fetch the full remote dataset, merge both directions.
    SmartMerge,
    /// Exchange deltas since the cursor.
    Incremental,
    /// Incremental, chosen by the periodic timer; falls back to a full
    /// merge on a never-synced device.
    AutoIncremental,
}

impl SyncMode {
    /// Short name for logging and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::ForceOverwriteLocal => "force_overwrite_local",
            SyncMode::ForceOverwriteRemote => "force_overwrite_remote",
            SyncMode::SmartMerge => "smart_merge",
            SyncMode::Incremental => "incremental",
            SyncMode::AutoIncremental => "auto_incremental",
        }
    }
}

/// One immutable history entry describing a finished sync attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRecord {
    /// The mode that ran.
    pub mode: SyncMode,
    /// Whether the round succeeded.
    pub success: bool,
    /// Records uploaded.
    pub uploaded: u64,
    /// Records downloaded.
    pub downloaded: u64,
    /// Conflicts the server reported.
    pub conflicts: u64,
    /// Wall time the round took.
    pub duration: Duration,
    /// When the round started.
    pub timestamp: Millis,
    /// The failure message, for failed rounds.
    pub error: Option<String>,
}

/// Bounded, newest-first log of sync attempts.
#[derive(Debug)]
pub struct SyncHistory {
    records: VecDeque<SyncRecord>,
    limit: usize,
}

impl SyncHistory {
    /// Creates a history keeping at most `limit` records.
    pub fn new(limit: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Prepends a record, evicting the oldest past the cap.
    pub fn push(&mut self, record: SyncRecord) {
        self.records.push_front(record);
        self.records.truncate(self.limit);
    }

    /// Snapshot of the records, newest first.
    pub fn records(&self) -> Vec<SyncRecord> {
        self.records.iter().cloned().collect()
    }

    /// The most recent record, if any.
    pub fn latest(&self) -> Option<&SyncRecord> {
        self.records.front()
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no sync has run yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for SyncHistory {
    fn default() -> Self {
        Self::new(50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(timestamp: Millis) -> SyncRecord {
        SyncRecord {
            mode: SyncMode::Incremental,
            success: true,
            uploaded: 1,
            downloaded: 0,
            conflicts: 0,
            duration: Duration::from_millis(10),
            timestamp,
            error: None,
        }
    }

    #[test]
    fn newest_first_and_capped() {
        let mut history = SyncHistory::new(3);
        for ts in 1..=5 {
            history.push(record(ts));
        }

        assert_eq!(history.len(), 3);
        let records = history.records();
        assert_eq!(records[0].timestamp, 5);
        assert_eq!(records[2].timestamp, 3);
        assert_eq!(history.latest().map(|r| r.timestamp), Some(5));
    }

    #[test]
    fn default_cap_is_fifty() {
        let mut history = SyncHistory::default();
        for ts in 0..80 {
            history.push(record(ts));
        }
        assert_eq!(history.len(), 50);
        assert_eq!(history.latest().map(|r| r.timestamp), Some(79));
    }

    #[test]
    fn mode_names() {
        assert_eq!(SyncMode::SmartMerge.as_str(), "smart_merge");
        assert_eq!(
            SyncMode::ForceOverwriteRemote.as_str(),
            "force_overwrite_remote"
        );
    }
}
