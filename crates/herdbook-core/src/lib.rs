//! # herdbook-core: Pure Domain Types for Herdbook
//!
//! This crate holds the records, inputs, patches and rules of the farm book
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Herdbook Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Mobile UI (external)                         │   │
//! │  │    Herd list ──► Milking form ──► Finances ──► Sync status      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ herdbook-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  record   │  │   money   │  │ validation│  │   │
//! │  │   │  Animal   │  │  Record   │  │   Money   │  │   rules   │  │   │
//! │  │   │ Production│  │ EntityKind│  │           │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          herdbook-db (store)  ──►  herdbook-sync (push)          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Records, create inputs and typed patches per table
//! - [`record`] - The `Record` trait, sync lifecycle and table registry
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use herdbook_core::{EntityKind, NewAnimal};
//!
//! let cow = NewAnimal::new("A1", "Holstein");
//! assert!(cow.validate().is_ok());
//!
//! assert_eq!(EntityKind::Production.collection(), "production");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod record;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use herdbook_core::Money` instead of
// `use herdbook_core::money::Money`

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use record::{EntityKind, Record, SyncState};
pub use types::*;

#[doc(hidden)]
pub use chrono as __chrono;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default root collection for a farm's remote documents
/// (`{root}/{farm_id}/{collection}`).
pub const DEFAULT_ROOT_COLLECTION: &str = "farms";

/// Number of recent events shown on an animal's detail screen.
pub const RECENT_EVENTS_LIMIT: i64 = 5;
