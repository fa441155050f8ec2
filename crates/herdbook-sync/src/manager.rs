//! # Sync Manager
//!
//! Pushes every dirty row to the remote store, one table at a time.
//!
//! ## Sync Pass
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          One Sync Pass                                  │
//! │                                                                         │
//! │  for table in config.sync.tables (parents first):                       │
//! │                                                                         │
//! │    get_unsynced ──► none? ──► { table, synced_count: 0 }                │
//! │         │                                                               │
//! │         ▼                                                               │
//! │    RemoteDocument per row (keyed by local id)                           │
//! │         │                                                               │
//! │         ▼                                                               │
//! │    push_batch("{root}/{farm_id}/{collection}")  ── Err ──► policy       │
//! │         │                                                 abort: return │
//! │         ▼                                                 continue:     │
//! │    mark_batch_synced (version-guarded)                    record, next  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │    { table, synced_count: n }                                           │
//! │                                                                         │
//! │  EVENTS (to the UI):                                                    │
//! │  ───────────────────                                                    │
//! │  emit_progress(table, synced)   after each table                        │
//! │  emit_error(table, msg, retry)  on a failed table                       │
//! │  emit_complete(report)          when the pass returns Ok                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A row edited while its table is being pushed keeps `synced = 0` (the
//! mark is guarded by the `updated_at` that was read), so the edit goes out
//! with the next pass.

use std::sync::Arc;

use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::FromRow;
use tracing::{debug, error, info, warn};

use herdbook_core::{
    Animal, AnimalEvent, EntityKind, Expense, Income, Paddock, Production, Record,
    ReproductiveEvent, Rotation, Treatment,
};
use herdbook_db::{Database, Repository, SyncAck};

use crate::config::{FailurePolicy, SyncConfig};
use crate::error::{SyncError, SyncResult};
use crate::network::NetworkMonitor;
use crate::remote::{RemoteDocument, RemoteStore};

/// Runs `$body` with `$T` bound to the record type of `$kind`.
macro_rules! with_record_type {
    ($kind:expr, $T:ident => $body:expr) => {
        match $kind {
            EntityKind::Animals => {
                type $T = Animal;
                $body
            }
            EntityKind::Production => {
                type $T = Production;
                $body
            }
            EntityKind::Treatments => {
                type $T = Treatment;
                $body
            }
            EntityKind::Incomes => {
                type $T = Income;
                $body
            }
            EntityKind::Expenses => {
                type $T = Expense;
                $body
            }
            EntityKind::Paddocks => {
                type $T = Paddock;
                $body
            }
            EntityKind::Rotations => {
                type $T = Rotation;
                $body
            }
            EntityKind::ReproductiveEvents => {
                type $T = ReproductiveEvent;
                $body
            }
            EntityKind::AnimalEvents => {
                type $T = AnimalEvent;
                $body
            }
        }
    };
}

// =============================================================================
// Sync Report
// =============================================================================

/// Rows pushed for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSyncCount {
    pub table: EntityKind,
    pub synced_count: usize,
}

/// A table whose push failed during a `continue` pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSyncFailure {
    pub table: EntityKind,
    pub error: String,
    pub retryable: bool,
}

/// Outcome of one sync pass, in table order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub results: Vec<TableSyncCount>,
    pub failures: Vec<TableSyncFailure>,
}

impl SyncReport {
    pub fn total_synced(&self) -> usize {
        self.results.iter().map(|r| r.synced_count).sum()
    }

    /// Count for one table, `None` if the table was not synced this pass.
    pub fn synced_for(&self, table: EntityKind) -> Option<usize> {
        self.results
            .iter()
            .find(|r| r.table == table)
            .map(|r| r.synced_count)
    }

    /// True when no table failed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

// =============================================================================
// Event Emitter Trait
// =============================================================================

/// Receives sync pass events (implemented by the mobile UI bridge).
pub trait SyncEventEmitter: Send + Sync {
    /// A table finished pushing.
    fn emit_progress(&self, table: EntityKind, synced: usize);

    /// A table failed to push.
    fn emit_error(&self, table: EntityKind, message: &str, retryable: bool);

    /// The pass finished and produced a report.
    fn emit_complete(&self, report: &SyncReport);
}

/// No-op event emitter for testing.
pub struct NoOpEmitter;

impl SyncEventEmitter for NoOpEmitter {
    fn emit_progress(&self, _table: EntityKind, _synced: usize) {}
    fn emit_error(&self, _table: EntityKind, _message: &str, _retryable: bool) {}
    fn emit_complete(&self, _report: &SyncReport) {}
}

// =============================================================================
// Sync Manager
// =============================================================================

/// Pushes dirty rows of the configured tables to a [`RemoteStore`].
pub struct SyncManager {
    db: Database,
    remote: Arc<dyn RemoteStore>,
    config: Arc<SyncConfig>,
    emitter: Arc<dyn SyncEventEmitter>,
    network: Option<NetworkMonitor>,
}

impl SyncManager {
    /// Creates a manager for the farm scope in `config`.
    ///
    /// Only the scope and table list are validated; the remote section
    /// belongs to whoever built `remote`.
    pub fn new(db: Database, remote: Arc<dyn RemoteStore>, config: SyncConfig) -> SyncResult<Self> {
        Self::with_emitter(db, remote, config, Arc::new(NoOpEmitter))
    }

    /// Creates a manager with a custom event emitter.
    pub fn with_emitter(
        db: Database,
        remote: Arc<dyn RemoteStore>,
        config: SyncConfig,
        emitter: Arc<dyn SyncEventEmitter>,
    ) -> SyncResult<Self> {
        config.validate_scope()?;

        Ok(SyncManager {
            db,
            remote,
            config: Arc::new(config),
            emitter,
            network: None,
        })
    }

    /// Refuses to start a pass while `monitor` reports offline.
    pub fn with_network(mut self, monitor: NetworkMonitor) -> Self {
        self.network = Some(monitor);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Runs one pass over every configured table.
    ///
    /// ## Returns
    /// * `Ok(report)` - every table was attempted; under
    ///   [`FailurePolicy::Continue`] failed tables are listed in
    ///   `report.failures`
    /// * `Err(SyncError::PushFailed)` - under [`FailurePolicy::Abort`], the
    ///   first failed table; later tables were not attempted
    /// * `Err(SyncError::Offline)` - the network monitor reports offline
    pub async fn sync_all(&self) -> SyncResult<SyncReport> {
        if let Some(network) = &self.network {
            if !network.is_online() {
                debug!("Skipping sync pass while offline");
                return Err(SyncError::Offline);
            }
        }

        let policy = self.config.failure_policy();
        info!(
            scope = %self.config.scope(),
            tables = self.config.sync.tables.len(),
            %policy,
            "Sync pass started"
        );

        let mut report = SyncReport::default();

        for &table in &self.config.sync.tables {
            match self.sync_kind(table).await {
                Ok(synced_count) => {
                    self.emitter.emit_progress(table, synced_count);
                    report.results.push(TableSyncCount {
                        table,
                        synced_count,
                    });
                }
                Err(err) => {
                    let failure = SyncError::push_failed(table, &err);
                    let retryable = failure.is_retryable();
                    error!(%table, error = %err, retryable, "Table push failed");
                    self.emitter.emit_error(table, &err.to_string(), retryable);

                    match policy {
                        FailurePolicy::Abort => return Err(failure),
                        FailurePolicy::Continue => report.failures.push(TableSyncFailure {
                            table,
                            error: err.to_string(),
                            retryable,
                        }),
                    }
                }
            }
        }

        info!(
            synced = report.total_synced(),
            failed = report.failures.len(),
            "Sync pass finished"
        );
        self.emitter.emit_complete(&report);

        Ok(report)
    }

    /// Pushes the dirty rows of one table, returning how many were pushed.
    pub async fn sync_kind(&self, kind: EntityKind) -> SyncResult<usize> {
        with_record_type!(kind, T => self.sync_table::<T>().await)
    }

    /// Pushes the dirty rows of `T::TABLE`.
    pub async fn sync_table<T>(&self) -> SyncResult<usize>
    where
        T: Record + for<'r> FromRow<'r, SqliteRow>,
    {
        let repo: Repository<T> = self.db.repository();
        let rows = repo.get_unsynced().await?;

        if rows.is_empty() {
            debug!(table = T::TABLE, "Nothing to push");
            return Ok(0);
        }

        let documents = rows
            .iter()
            .map(RemoteDocument::from_record)
            .collect::<SyncResult<Vec<_>>>()?;

        let path = self.config.collection_path(T::KIND);
        debug!(table = T::TABLE, path = %path, count = documents.len(), "Pushing rows");

        let remote_ids = self.remote.push_batch(&path, &documents).await?;
        if remote_ids.len() != rows.len() {
            return Err(SyncError::InvalidResponse(format!(
                "remote confirmed {} of {} documents",
                remote_ids.len(),
                rows.len()
            )));
        }

        let acks: Vec<SyncAck> = rows
            .iter()
            .zip(remote_ids)
            .map(|(row, remote_id)| SyncAck::for_record(row, remote_id))
            .collect();
        let marked = repo.mark_batch_synced(&acks).await?;

        if (marked as usize) < rows.len() {
            warn!(
                table = T::TABLE,
                edited = rows.len() - marked as usize,
                "Rows edited during push stay dirty"
            );
        }

        info!(table = T::TABLE, pushed = rows.len(), "Table synced");
        Ok(rows.len())
    }

    /// Dirty row count per configured table.
    pub async fn pending_counts(&self) -> SyncResult<Vec<(EntityKind, i64)>> {
        let mut counts = Vec::with_capacity(self.config.sync.tables.len());
        for &kind in &self.config.sync.tables {
            let pending = with_record_type!(kind, T => {
                self.db.repository::<T>().count_unsynced().await?
            });
            counts.push((kind, pending));
        }
        Ok(counts)
    }

    /// Dirty rows across every configured table.
    pub async fn total_pending(&self) -> SyncResult<i64> {
        Ok(self.pending_counts().await?.iter().map(|(_, n)| n).sum())
    }
}
