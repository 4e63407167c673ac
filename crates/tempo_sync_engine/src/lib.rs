//! # Tempo Sync Engine
//!
//! Client-side sync orchestration for tempo timer data.
//!
//! This crate provides:
//! - [`LocalStore`]: the device's dataset plus the mirrored sync cursor
//! - [`ChangeTracker`]: outbound delta derivation and the tombstone log
//! - [`SyncClient`]: the five-mode sync orchestrator
//! - Workspace projection of pending differences for display
//! - Transport abstraction with HTTP, loopback, and mock implementations
//!
//! ## Key invariants
//!
//! - The server's timestamps are authoritative; the cursor only ever holds
//!   a server-returned value
//! - At most one sync round runs at a time; overlapping requests are
//!   dropped, not queued
//! - A failed round mutates nothing: no store changes, no cursor movement,
//!   no tombstone clearing
//! - Tombstones are purged only after the round that uploaded them succeeds

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod auth;
mod client;
mod config;
mod error;
mod history;
mod http;
mod remote;
mod store;
mod tracker;
mod transport;
mod workspace;

pub use auth::{fresh_token, AuthToken, StaticTokenProvider, TokenProvider, REFRESH_WINDOW_MS};
pub use client::{SyncClient, SyncOutcome, SyncPhase};
pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use history::{SyncHistory, SyncMode, SyncRecord};
pub use http::{HttpClient, HttpResponse, HttpTransport, LoopbackClient, LoopbackServer};
pub use remote::RemoteCache;
pub use store::LocalStore;
pub use tracker::ChangeTracker;
pub use transport::{MockTransport, SyncTransport};
pub use workspace::{analyze, ChangeTag, SyncWorkspace, WorkspaceItem};
