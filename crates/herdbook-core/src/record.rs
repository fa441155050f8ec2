//! # Record Lifecycle
//!
//! Every domain table shares one record shape: a client-generated `id`,
//! business fields, `created_at`/`updated_at`, a `synced` dirty flag, the
//! confirmed `remote_id` and a `deleted` tombstone marker.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   create ──► Dirty ──push──► Clean ──edit──► Dirty ──push──► Clean     │
//! │                                                                         │
//! │   soft_delete ──► DirtyTombstone ──push──► CleanTombstone (terminal)   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`Record`] is the seam between the typed domain records and the generic
//! repository / sync manager: it names the table and exposes the common
//! columns. [`EntityKind`] is the registry of synchronized tables.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreError;

// =============================================================================
// Entity Kind (table registry)
// =============================================================================

/// One synchronized table and its remote collection.
///
/// Declaration order is the default sync order: parents (animals, paddocks)
/// are pushed before rows that reference them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum EntityKind {
    Animals,
    Production,
    Treatments,
    Incomes,
    Expenses,
    Paddocks,
    Rotations,
    ReproductiveEvents,
    AnimalEvents,
}

impl EntityKind {
    /// Every synchronized table, in default sync order.
    pub const ALL: [EntityKind; 9] = [
        EntityKind::Animals,
        EntityKind::Production,
        EntityKind::Treatments,
        EntityKind::Incomes,
        EntityKind::Expenses,
        EntityKind::Paddocks,
        EntityKind::Rotations,
        EntityKind::ReproductiveEvents,
        EntityKind::AnimalEvents,
    ];

    /// Local SQLite table name.
    pub const fn table_name(&self) -> &'static str {
        match self {
            EntityKind::Animals => "animals",
            EntityKind::Production => "production",
            EntityKind::Treatments => "treatments",
            EntityKind::Incomes => "incomes",
            EntityKind::Expenses => "expenses",
            EntityKind::Paddocks => "paddocks",
            EntityKind::Rotations => "rotations",
            EntityKind::ReproductiveEvents => "reproductive_events",
            EntityKind::AnimalEvents => "animal_events",
        }
    }

    /// Remote collection name under the farm scope.
    ///
    /// Currently identical to the table name; kept separate so either side
    /// can be renamed without touching the other.
    pub const fn collection(&self) -> &'static str {
        self.table_name()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

impl FromStr for EntityKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.table_name() == s.trim())
            .ok_or_else(|| CoreError::UnknownTable(s.to_string()))
    }
}

// =============================================================================
// Sync State
// =============================================================================

/// Where a row sits in the push lifecycle, derived from `synced`/`deleted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SyncState {
    /// Live row with local changes not yet confirmed remotely.
    Dirty,
    /// Live row whose current version the remote store has confirmed.
    Clean,
    /// Soft-deleted row whose deletion has not been pushed yet.
    DirtyTombstone,
    /// Soft-deleted row whose deletion was pushed. Terminal.
    CleanTombstone,
}

impl SyncState {
    pub const fn from_flags(synced: bool, deleted: bool) -> Self {
        match (synced, deleted) {
            (false, false) => SyncState::Dirty,
            (true, false) => SyncState::Clean,
            (false, true) => SyncState::DirtyTombstone,
            (true, true) => SyncState::CleanTombstone,
        }
    }

    /// Whether the next sync pass will push this row.
    pub const fn needs_push(&self) -> bool {
        matches!(self, SyncState::Dirty | SyncState::DirtyTombstone)
    }
}

// =============================================================================
// Record Trait
// =============================================================================

/// A row of a synchronized table.
///
/// Implemented for every domain record via [`impl_record!`](crate::impl_record).
/// The serialized form (`serde_json::to_value`) is the remote document body.
pub trait Record: Serialize + Send + Sync + Unpin + 'static {
    /// Which table this record lives in.
    const KIND: EntityKind;

    /// Local table name (shorthand for `KIND.table_name()`).
    const TABLE: &'static str = Self::KIND.table_name();

    fn id(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;
    fn is_synced(&self) -> bool;
    fn remote_id(&self) -> Option<&str>;
    fn is_deleted(&self) -> bool;

    fn sync_state(&self) -> SyncState {
        SyncState::from_flags(self.is_synced(), self.is_deleted())
    }
}

/// Implements [`Record`] for a struct carrying the common columns
/// (`id`, `created_at`, `updated_at`, `synced`, `remote_id`, `deleted`).
#[macro_export]
macro_rules! impl_record {
    ($ty:ty, $kind:expr) => {
        impl $crate::record::Record for $ty {
            const KIND: $crate::record::EntityKind = $kind;

            fn id(&self) -> &str {
                &self.id
            }
            fn created_at(&self) -> $crate::__chrono::DateTime<$crate::__chrono::Utc> {
                self.created_at
            }
            fn updated_at(&self) -> $crate::__chrono::DateTime<$crate::__chrono::Utc> {
                self.updated_at
            }
            fn is_synced(&self) -> bool {
                self.synced
            }
            fn remote_id(&self) -> Option<&str> {
                self.remote_id.as_deref()
            }
            fn is_deleted(&self) -> bool {
                self.deleted
            }
        }
    };
}

// =============================================================================
// Unit Tests
// =============================================================================
