//! Transactional sync server for tempo timer data.
//!
//! Stores each user's dataset in memory behind a copy-commit transaction
//! layer: every endpoint either applies completely or leaves the data
//! untouched. Endpoints:
//!
//! - `POST /devices/register` — register a device, obtain a session token
//! - `GET /sync/full` — the complete live dataset
//! - `POST /sync/incremental` — delta exchange, or force-overwrite when the
//!   request carries the cursor-0 sentinel
//! - `GET /sync/summary` — counts plus a recent-events preview
//! - `POST /sync/migrate` — one-time legacy import per device
//!
//! Deletions are soft: rows keep a `deleted_at` tombstone so they reach
//! peer devices through the incremental channel.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod migrate;
pub mod routes;
pub mod server;
pub mod store;

pub use auth::{TokenClaims, TokenValidator};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler};
pub use migrate::{LegacyDataset, LegacyStore, SUPPORTED_LEGACY_VERSION};
pub use server::SyncServer;
pub use store::{DeviceRecord, UserData, UserStore};
