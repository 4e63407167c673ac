//! # Tempo Sync Protocol
//!
//! Wire types for synchronizing tempo timer data between devices and the
//! sync server.
//!
//! This crate provides:
//! - The entity model (`TimedEvent`, `ActivityEvent`, `TimerSettings`)
//! - Change sets and sync messages (full, incremental, summary)
//! - `Conflict` records for server-detected conflicts
//! - Client-side `DeletionTombstone` records
//!
//! All timestamps are `i64` epoch milliseconds and all messages serialize to
//! snake_case JSON. This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod activity;
mod changes;
mod conflict;
mod event;
mod messages;
mod settings;
mod time;
mod tombstone;

pub use activity::ActivityEvent;
pub use changes::{ActivityChanges, ChangeSet, EventChanges};
pub use conflict::{Conflict, ConflictReason, EntityKind};
pub use event::{EventKind, InvalidInterval, TimedEvent};
pub use messages::{
    FullSyncResponse, IncrementalSyncRequest, IncrementalSyncResponse, MigrateRequest,
    MigrateResponse, MigrationSummary, RegisterDeviceRequest, RegisterDeviceResponse,
    ServerChanges, SummaryResponse,
};
pub use settings::TimerSettings;
pub use time::{now_millis, Millis, FORCE_OVERWRITE_CURSOR};
pub use tombstone::DeletionTombstone;
