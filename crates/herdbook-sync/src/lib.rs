//! # herdbook-sync: Push Sync Engine for Herdbook
//!
//! This crate reconciles the local farm book with the remote document store.
//! Writes always land in SQLite first (see `herdbook-db`); a sync pass later
//! pushes every dirty row and marks it clean once the remote confirms it.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Herdbook Sync Architecture                        │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                   SyncManager (manager.rs)                       │  │
//! │  │                                                                  │  │
//! │  │  Sequential pass over the configured tables                      │  │
//! │  │  get_unsynced ──► push_batch ──► mark_batch_synced               │  │
//! │  └───────────────┬─────────────────────────────┬────────────────────┘  │
//! │                  │                             │                        │
//! │                  ▼                             ▼                        │
//! │  ┌────────────────────────────┐  ┌────────────────────────────────┐    │
//! │  │  RemoteStore (remote/)     │  │  herdbook-db Repository<T>     │    │
//! │  │                            │  │                                │    │
//! │  │  FirestoreClient (REST)    │  │  dirty rows, version-guarded   │    │
//! │  │  MemoryRemoteStore (tests) │  │  sync marks                    │    │
//! │  └────────────────────────────┘  └────────────────────────────────┘    │
//! │                                                                         │
//! │  ┌────────────────────────────┐  ┌────────────────────────────────┐    │
//! │  │  NetworkMonitor            │  │  SyncConfig                    │    │
//! │  │  (network.rs)              │  │  (config.rs)                   │    │
//! │  │                            │  │                                │    │
//! │  │  online/offline watch,     │  │  farm scope, tables, failure   │    │
//! │  │  TCP probe, subscriptions  │  │  policy, remote credentials    │    │
//! │  └────────────────────────────┘  └────────────────────────────────┘    │
//! │                                                                         │
//! │  WHEN to sync is the caller's decision (typically on reconnect).       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - Sync configuration (farm, remote, tables, policy)
//! - [`error`] - Sync error types
//! - [`manager`] - The `SyncManager` push pass and its report
//! - [`network`] - Connectivity monitor and TCP probe
//! - [`remote`] - Remote store trait, Firestore client, in-memory store
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use herdbook_sync::{FirestoreClient, NetworkMonitor, SyncConfig, SyncManager};
//!
//! let config = SyncConfig::load(None)?;
//! let remote = Arc::new(FirestoreClient::new(&config.remote)?);
//! let monitor = NetworkMonitor::default();
//!
//! let manager = SyncManager::new(db, remote, config)?.with_network(monitor.clone());
//!
//! let _sub = monitor.subscribe(move |online| {
//!     if online { /* schedule manager.sync_all() */ }
//! });
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod manager;
pub mod network;
pub mod remote;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{FailurePolicy, SyncConfig};
pub use error::{SyncError, SyncResult};
pub use manager::{
    NoOpEmitter, SyncEventEmitter, SyncManager, SyncReport, TableSyncCount, TableSyncFailure,
};
pub use network::{NetworkMonitor, Subscription, TcpProbe};
pub use remote::{FieldFilter, FirestoreClient, MemoryRemoteStore, RemoteDocument, RemoteStore};

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,herdbook=debug,sqlx=warn";

/// Installs the `tracing` subscriber used by the binaries.
///
/// Reads `RUST_LOG`, falling back to [`DEFAULT_LOG_FILTER`]. Calling it twice
/// is harmless.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
