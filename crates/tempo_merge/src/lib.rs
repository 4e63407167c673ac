//! # Tempo Merge
//!
//! The last-write-wins merge engine shared by the sync client and the sync
//! server. All functions here are pure: they take local state and a remote
//! payload and mutate the local state deterministically, performing no I/O.
//!
//! Records are keyed by uuid and resolved whole-record on `updated_at`
//! (`created_at` for append-only activity events). A tie keeps the local
//! copy, so replaying the same remote payload is always a no-op.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod engine;
mod outcome;

pub use engine::{
    apply_deletions, merge_activity_events, merge_timed_events, merge_timer_settings,
};
pub use outcome::{MergeOutcome, MergeStrategy};
