//! # Domain Types
//!
//! Records, inputs and patches for every table of the farm book.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  livestock                    finance                 pasture           │
//! │  ─────────────────            ──────────────          ──────────────    │
//! │  Animal ◄──┬── Production     Income                  Paddock ◄──┐     │
//! │            ├── Treatment      Expense                            │     │
//! │            ├── ReproductiveEvent                      Rotation ──┘     │
//! │            └── AnimalEvent    FinanceSummary                            │
//! │                                                                         │
//! │  Per table:   Record  (row as stored, implements `Record`)             │
//! │               NewX    (create input, validated)                        │
//! │               XPatch  (typed partial update, only Some fields written) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Patch Fields
//! Required columns are `Option<T>` in a patch (`None` = leave unchanged).
//! Nullable columns are `Option<Option<T>>` so a patch can clear them:
//! `None` leaves the column, `Some(None)` writes NULL.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub mod finance;
pub mod livestock;
pub mod pasture;

pub use finance::*;
pub use livestock::*;
pub use pasture::*;

// =============================================================================
// Date Range
// =============================================================================

/// Inclusive calendar date range used by range and aggregate queries.
///
/// A reversed range (`from > to`) is not an error; it simply matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DateRange {
    #[ts(as = "String")]
    pub from: NaiveDate,
    #[ts(as = "String")]
    pub to: NaiveDate,
}

impl DateRange {
    pub const fn new(from: NaiveDate, to: NaiveDate) -> Self {
        DateRange { from, to }
    }

    /// A range covering exactly one day.
    pub const fn day(date: NaiveDate) -> Self {
        DateRange { from: date, to: date }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }

    pub fn is_reversed(&self) -> bool {
        self.from > self.to
    }
}

// =============================================================================
// Serde helpers
// =============================================================================

/// Patch field codec for nullable columns (`#[serde(default, with = "double_option")]`).
///
/// Distinguishes an explicit `null` (`Some(None)`) from a missing field
/// (`None`, via `#[serde(default)]`). Both serialize as `null`.
pub(crate) mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, ser: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(ser),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(de).map(Some)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
