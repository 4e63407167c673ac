//! Merge strategies and outcome accounting.

/// How a remote payload relates to the full remote dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// The payload holds only records changed after the client's cursor.
    /// Local records absent from the payload are untouched.
    Delta,
    /// The payload is the complete remote dataset. Local records absent
    /// from the payload are removed.
    Snapshot,
}

/// Counts of what one merge call did to the local state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Remote records that did not exist locally and were inserted.
    pub inserted: u64,
    /// Remote records that replaced an older local copy.
    pub updated: u64,
    /// Local records removed, either by a remote tombstone or because a
    /// snapshot merge no longer contained them.
    pub deleted: u64,
    /// Remote records dropped because the local copy was same-age or newer.
    pub skipped: u64,
}

impl MergeOutcome {
    /// Total number of local mutations.
    pub fn changed(&self) -> u64 {
        self.inserted + self.updated + self.deleted
    }

    /// Returns true if the merge left local state untouched.
    pub fn is_noop(&self) -> bool {
        self.changed() == 0
    }

    /// Folds another outcome into this one.
    pub fn absorb(&mut self, other: MergeOutcome) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.skipped += other.skipped;
    }
}
