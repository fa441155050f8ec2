//! # herdbook-db: Local Store for Herdbook
//!
//! SQLite persistence for the farm book. Every write goes to the local
//! database first; the sync crate later pushes whatever is dirty.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Herdbook Data Flow                               │
//! │                                                                         │
//! │  Milking form (upsert production)        Sync pass (herdbook-sync)     │
//! │       │                                        │                        │
//! │       ▼                                        ▼                        │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   herdbook-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────────┐  ┌────────────┐  │   │
//! │  │   │   Database    │    │    Repositories    │  │ Migrations │  │   │
//! │  │   │   (pool.rs)   │    │                    │  │ (embedded) │  │   │
//! │  │   │               │    │ Repository<T>      │  │            │  │   │
//! │  │   │ SqlitePool    │◄───│ AnimalRepository   │  │ 001_init   │  │   │
//! │  │   │ WAL, FKs on   │    │ ProductionRepo ... │  │            │  │   │
//! │  │   └───────────────┘    └────────────────────┘  └────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          SQLite file on the device (herdbook.db)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and schema initialization
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Generic lifecycle repository and one repository per table
//!
//! ## Usage
//!
//! ```rust,ignore
//! use herdbook_db::{Database, DbConfig};
//! use herdbook_core::{NewAnimal, NewProduction};
//!
//! let db = Database::new(DbConfig::new("herdbook.db")).await?;
//!
//! let cow = db.animals().create(NewAnimal::new("A1", "Holstein")).await?;
//! db.production().upsert(NewProduction::new(&cow, today, 10.0, 8.0)).await?;
//!
//! let dirty = db.animals().count_unsynced().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    AnimalEventRepository, AnimalRepository, ExpenseRepository, IncomeRepository,
    PaddockRepository, ProductionRepository, Repository, ReproductiveEventRepository,
    RotationRepository, SyncAck, TreatmentRepository,
};
