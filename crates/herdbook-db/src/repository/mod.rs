//! # Repository Module
//!
//! Table-agnostic record lifecycle plus one repository per domain table.
//!
//! ## Repository Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  UI screen                          Sync pass                           │
//! │     │  db.production().upsert(..)      │  db.repository::<T>()          │
//! │     ▼                                  │                                │
//! │  ProductionRepository ── Deref ──┐     │                                │
//! │  ├── create / update / upsert    │     │                                │
//! │  └── by_date, total_by_range ... ▼     ▼                                │
//! │                           Repository<T>  (generic)                      │
//! │                           ├── get_all / get_by_id                      │
//! │                           ├── get_unsynced / count_unsynced            │
//! │                           ├── mark_synced / mark_batch_synced          │
//! │                           └── soft_delete / count                      │
//! │                                  │                                      │
//! │                                  ▼                                      │
//! │                           SQLite (T::TABLE)                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle Rules (every table)
//! - Every local write sets `synced = 0` and advances `updated_at`.
//! - Only a confirmed push sets `synced = 1`, and only for the exact
//!   version that was pushed (`updated_at` guard).
//! - Tombstones (`deleted = 1`) are hidden from reads, still pushed, and
//!   never written to again by `update`, `soft_delete` or `upsert`.
//!
//! ## Available Repositories
//!
//! - [`Repository`] - Generic lifecycle operations
//! - [`AnimalRepository`], [`ProductionRepository`], [`TreatmentRepository`],
//!   [`ReproductiveEventRepository`], [`AnimalEventRepository`]
//! - [`IncomeRepository`], [`ExpenseRepository`]
//! - [`PaddockRepository`], [`RotationRepository`]

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Encode, FromRow, QueryBuilder, Sqlite, SqlitePool, Type};
use tracing::debug;
use uuid::Uuid;

use herdbook_core::Record;

use crate::error::{DbError, DbResult};

pub mod animal;
pub mod animal_event;
pub mod expense;
pub mod income;
pub mod paddock;
pub mod production;
pub mod reproductive;
pub mod rotation;
pub mod treatment;

pub use animal::AnimalRepository;
pub use animal_event::AnimalEventRepository;
pub use expense::ExpenseRepository;
pub use income::IncomeRepository;
pub use paddock::PaddockRepository;
pub use production::ProductionRepository;
pub use reproductive::ReproductiveEventRepository;
pub use rotation::RotationRepository;
pub use treatment::TreatmentRepository;

// =============================================================================
// Helpers
// =============================================================================

/// Generates a new record ID.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Timestamp for a local write.
///
/// Strictly increasing within the process, so two writes to the same row in
/// the same clock tick still produce distinct `updated_at` versions.
pub(crate) fn write_timestamp() -> DateTime<Utc> {
    static LAST_NANOS: AtomicI64 = AtomicI64::new(0);

    let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX - 1);
    let issued = match LAST_NANOS.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
        Some(now.max(last + 1))
    }) {
        Ok(last) | Err(last) => now.max(last + 1),
    };
    DateTime::from_timestamp_nanos(issued)
}

/// Confirmation that one row was pushed to the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncAck {
    pub id: String,
    /// Identifier the remote store confirmed (the document id).
    pub remote_id: String,
    /// `updated_at` of the row as it was read for the push.
    pub version: DateTime<Utc>,
}

impl SyncAck {
    /// Acknowledges a record as read, with the remote id it was stored under.
    pub fn for_record<T: Record>(record: &T, remote_id: impl Into<String>) -> Self {
        SyncAck {
            id: record.id().to_string(),
            remote_id: remote_id.into(),
            version: record.updated_at(),
        }
    }
}

// =============================================================================
// Generic Repository
// =============================================================================

/// Lifecycle operations shared by every synchronized table.
///
/// ## Usage
/// ```rust,ignore
/// let repo: Repository<Animal> = db.repository();
///
/// let dirty = repo.get_unsynced().await?;
/// repo.soft_delete(&dirty[0].id).await?;
/// ```
pub struct Repository<T> {
    pool: SqlitePool,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Repository {
            pool: self.pool.clone(),
            _record: PhantomData,
        }
    }
}

impl<T: Record> fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository").field("table", &T::TABLE).finish()
    }
}

impl<T> Repository<T> {
    /// Creates a new Repository over `T::TABLE`.
    pub fn new(pool: SqlitePool) -> Self {
        Repository {
            pool,
            _record: PhantomData,
        }
    }

    /// The pool this repository writes through.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl<T> Repository<T>
where
    T: Record + for<'r> FromRow<'r, SqliteRow>,
{
    /// All live rows, most recently created first.
    pub async fn get_all(&self) -> DbResult<Vec<T>> {
        let sql = format!(
            "SELECT * FROM {} WHERE deleted = 0 ORDER BY created_at DESC, rowid DESC",
            T::TABLE
        );
        let rows = sqlx::query_as::<_, T>(&sql).fetch_all(&self.pool).await?;

        debug!(table = T::TABLE, count = rows.len(), "Loaded rows");
        Ok(rows)
    }

    /// Gets a live row by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(T))` - Row found
    /// * `Ok(None)` - Row missing or soft-deleted
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<T>> {
        let sql = format!("SELECT * FROM {} WHERE id = ?1 AND deleted = 0", T::TABLE);
        let row = sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    /// Every row the remote store has not confirmed, tombstones included.
    ///
    /// No ordering guarantee.
    pub async fn get_unsynced(&self) -> DbResult<Vec<T>> {
        let sql = format!("SELECT * FROM {} WHERE synced = 0", T::TABLE);
        let rows = sqlx::query_as::<_, T>(&sql).fetch_all(&self.pool).await?;

        debug!(table = T::TABLE, count = rows.len(), "Loaded unsynced rows");
        Ok(rows)
    }

    /// Marks one row as confirmed by the remote store.
    ///
    /// Sets `synced = 1` and `remote_id`; touches no other column (in
    /// particular `updated_at` is left alone).
    ///
    /// ## Returns
    /// * `Ok(())` - Row marked
    /// * `Err(DbError::NotFound)` - No row with this id (live or tombstone)
    pub async fn mark_synced(&self, id: &str, remote_id: &str) -> DbResult<()> {
        debug!(table = T::TABLE, id = %id, remote_id = %remote_id, "Marking synced");

        let sql = format!(
            "UPDATE {} SET synced = 1, remote_id = ?1 WHERE id = ?2",
            T::TABLE
        );
        let result = sqlx::query(&sql)
            .bind(remote_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(T::TABLE, id));
        }

        Ok(())
    }

    /// Marks a pushed batch as synced in one transaction.
    ///
    /// A row is only marked when its `updated_at` still equals the pushed
    /// version; a row edited while the push was in flight stays dirty and
    /// goes out again on the next pass.
    ///
    /// ## Returns
    /// Number of rows actually marked.
    pub async fn mark_batch_synced(&self, acks: &[SyncAck]) -> DbResult<u64> {
        if acks.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "UPDATE {} SET synced = 1, remote_id = ?1 WHERE id = ?2 AND updated_at = ?3",
            T::TABLE
        );

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let mut marked = 0;
        for ack in acks {
            let result = sqlx::query(&sql)
                .bind(&ack.remote_id)
                .bind(&ack.id)
                .bind(ack.version)
                .execute(&mut *tx)
                .await?;
            marked += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(
            table = T::TABLE,
            acknowledged = acks.len(),
            marked,
            "Marked batch synced"
        );
        Ok(marked)
    }

    /// Soft-deletes a row: `deleted = 1`, `synced = 0`, fresh `updated_at`.
    ///
    /// ## Why Soft Delete?
    /// - The remote store must learn about the deletion (tombstone is pushed)
    /// - Production and treatments still reference deleted animals
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Row missing or already a tombstone
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(table = T::TABLE, id = %id, "Soft-deleting record");

        let sql = format!(
            "UPDATE {} SET deleted = 1, synced = 0, updated_at = ?1 WHERE id = ?2 AND deleted = 0",
            T::TABLE
        );
        let result = sqlx::query(&sql)
            .bind(write_timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(T::TABLE, id));
        }

        Ok(())
    }

    /// Counts live rows.
    pub async fn count(&self) -> DbResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE deleted = 0", T::TABLE);
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;

        Ok(count)
    }

    /// Counts rows waiting for the next push, tombstones included.
    pub async fn count_unsynced(&self) -> DbResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE synced = 0", T::TABLE);
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;

        Ok(count)
    }
}

// =============================================================================
// Patch Assignments
// =============================================================================

/// Builds `UPDATE {table} SET ... WHERE id = ? AND deleted = 0` from the
/// supplied fields of a typed patch.
///
/// `updated_at` and `synced = 0` are always appended by [`Assignments::execute`].
pub(crate) struct Assignments<'args> {
    builder: QueryBuilder<'args, Sqlite>,
    columns: usize,
}

impl<'args> Assignments<'args> {
    pub(crate) fn new(table: &str) -> Self {
        Assignments {
            builder: QueryBuilder::new(format!("UPDATE {} SET ", table)),
            columns: 0,
        }
    }

    /// Starts `column = ` and hands back the builder for the right-hand side.
    pub(crate) fn assign(&mut self, column: &str) -> &mut QueryBuilder<'args, Sqlite> {
        if self.columns > 0 {
            self.builder.push(", ");
        }
        self.columns += 1;
        self.builder.push(column).push(" = ")
    }

    /// Adds `column = ?` when the patch supplied a value.
    pub(crate) fn set<V>(&mut self, column: &str, value: Option<V>) -> &mut Self
    where
        V: 'args + Encode<'args, Sqlite> + Type<Sqlite>,
    {
        if let Some(value) = value {
            self.assign(column).push_bind(value);
        }
        self
    }

    /// Runs the update against one live row.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Row missing or a tombstone
    pub(crate) async fn execute(mut self, pool: &SqlitePool, entity: &str, id: &'args str) -> DbResult<()> {
        self.assign("updated_at").push_bind(write_timestamp());
        self.builder
            .push(", synced = 0 WHERE id = ")
            .push_bind(id)
            .push(" AND deleted = 0");

        let result = self.builder.build().execute(pool).await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(entity, id));
        }

        Ok(())
    }
}

// =============================================================================
// Entity Repository Boilerplate
// =============================================================================

/// Declares an entity repository wrapping `Repository<$record>`.
///
/// Generic operations are reachable through `Deref`.
macro_rules! entity_repository {
    ($(#[$meta:meta])* $name:ident, $record:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            base: $crate::repository::Repository<$record>,
        }

        impl $name {
            pub fn new(pool: ::sqlx::SqlitePool) -> Self {
                $name {
                    base: $crate::repository::Repository::new(pool),
                }
            }
        }

        impl ::std::ops::Deref for $name {
            type Target = $crate::repository::Repository<$record>;

            fn deref(&self) -> &Self::Target {
                &self.base
            }
        }
    };
}

pub(crate) use entity_repository;

// =============================================================================
// Unit Tests
// =============================================================================
