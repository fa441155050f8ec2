//! # Production Repository
//!
//! Daily milk records: one live row per animal per day.
//!
//! ## Upsert Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  upsert(A1, 2024-03-01, 12.0, 8.0)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │  UPDATE production SET ... WHERE animal_id = ? AND date = ?            │
//! │                            AND deleted = 0 RETURNING id                │
//! │       │                                                                 │
//! │       ├── row returned ──► keep its id                                 │
//! │       └── nothing      ──► INSERT new row (same transaction)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The first statement of the transaction is a write, so SQLite takes the
//! write lock before the existence check and two concurrent upserts of the
//! same key cannot both insert.

use chrono::NaiveDate;
use sqlx::{Sqlite, Transaction};
use tracing::{debug, info};

use herdbook_core::{DateRange, NewProduction, Production, ProductionPatch, ProductionWithAnimal};

use super::{entity_repository, generate_id, write_timestamp, Assignments};
use crate::error::{DbError, DbResult};

entity_repository!(
    /// Repository for the `production` table.
    ProductionRepository,
    Production
);

impl ProductionRepository {
    /// Records a new day of production.
    ///
    /// `total_liters` is computed from the two sessions. A live row for the
    /// same animal and date already existing is a
    /// [`DbError::UniqueViolation`]; use [`ProductionRepository::upsert`]
    /// from the milking form.
    pub async fn create(&self, input: NewProduction) -> DbResult<String> {
        input.validate()?;

        let mut tx = self.begin().await?;
        let id = Self::insert(&mut tx, &input).await?;
        Self::commit(tx).await?;

        info!(id = %id, animal_id = %input.animal_id, date = %input.date, "Production recorded");
        Ok(id)
    }

    /// Writes the day's production for an animal, creating or replacing the
    /// live row for (`animal_id`, `date`).
    ///
    /// ## Returns
    /// The id of the row now holding the values. Repeated upserts of the same
    /// key always return the same id.
    pub async fn upsert(&self, input: NewProduction) -> DbResult<String> {
        input.validate()?;

        let mut tx = self.begin().await?;

        let existing: Option<String> = sqlx::query_scalar(
            r#"
            UPDATE production
            SET morning_liters = ?1, evening_liters = ?2, total_liters = ?3,
                notes = ?4, updated_at = ?5, synced = 0
            WHERE animal_id = ?6 AND date = ?7 AND deleted = 0
            RETURNING id
            "#,
        )
        .bind(input.morning_liters)
        .bind(input.evening_liters)
        .bind(input.total_liters())
        .bind(&input.notes)
        .bind(write_timestamp())
        .bind(&input.animal_id)
        .bind(input.date)
        .fetch_optional(&mut *tx)
        .await?;

        let id = match existing {
            Some(id) => {
                debug!(id = %id, date = %input.date, "Replaced production");
                id
            }
            None => Self::insert(&mut tx, &input).await?,
        };

        Self::commit(tx).await?;

        debug!(id = %id, animal_id = %input.animal_id, total = input.total_liters(), "Production upserted");
        Ok(id)
    }

    /// Applies the supplied fields of `patch`.
    ///
    /// When either session is supplied `total_liters` is recomputed from the
    /// new value and the stored value of the other session.
    pub async fn update(&self, id: &str, patch: ProductionPatch) -> DbResult<()> {
        patch.validate()?;
        if patch.is_empty() {
            return Ok(());
        }

        debug!(id = %id, "Updating production");

        let recompute = patch.morning_liters.is_some() || patch.evening_liters.is_some();

        let mut changes = Assignments::new("production");
        changes
            .set("date", patch.date)
            .set("morning_liters", patch.morning_liters)
            .set("evening_liters", patch.evening_liters)
            .set("notes", patch.notes);

        if recompute {
            // Right-hand sides see the row as it was before this UPDATE
            changes
                .assign("total_liters")
                .push("COALESCE(")
                .push_bind(patch.morning_liters)
                .push(", morning_liters) + COALESCE(")
                .push_bind(patch.evening_liters)
                .push(", evening_liters)");
        }

        changes.execute(self.pool(), "Production", id).await
    }

    /// Production of one day joined with animal code and name, by code.
    pub async fn by_date(&self, date: NaiveDate) -> DbResult<Vec<ProductionWithAnimal>> {
        let rows = sqlx::query_as::<_, ProductionWithAnimal>(
            r#"
            SELECT p.*, a.code AS animal_code, a.name AS animal_name
            FROM production p
            JOIN animals a ON a.id = p.animal_id
            WHERE p.date = ?1 AND p.deleted = 0
            ORDER BY a.code
            "#,
        )
        .bind(date)
        .fetch_all(self.pool())
        .await?;

        debug!(date = %date, count = rows.len(), "Loaded daily production");
        Ok(rows)
    }

    /// Liters produced by the whole herd on one day.
    pub async fn total_by_date(&self, date: NaiveDate) -> DbResult<f64> {
        self.total_by_range(DateRange::day(date)).await
    }

    /// Liters produced by the whole herd over a range.
    pub async fn total_by_range(&self, range: DateRange) -> DbResult<f64> {
        let total: f64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total_liters), 0.0)
            FROM production
            WHERE date BETWEEN ?1 AND ?2 AND deleted = 0
            "#,
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_one(self.pool())
        .await?;

        Ok(total)
    }

    /// Average daily liters of one animal over a range (0 when no records).
    pub async fn average_by_animal(&self, animal_id: &str, range: DateRange) -> DbResult<f64> {
        let average: f64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(AVG(total_liters), 0.0)
            FROM production
            WHERE animal_id = ?1 AND date BETWEEN ?2 AND ?3 AND deleted = 0
            "#,
        )
        .bind(animal_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_one(self.pool())
        .await?;

        Ok(average)
    }

    /// One animal's records over a range, newest day first.
    pub async fn by_animal(&self, animal_id: &str, range: DateRange) -> DbResult<Vec<Production>> {
        let rows = sqlx::query_as::<_, Production>(
            r#"
            SELECT * FROM production
            WHERE animal_id = ?1 AND date BETWEEN ?2 AND ?3 AND deleted = 0
            ORDER BY date DESC
            "#,
        )
        .bind(animal_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        self.pool()
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }

    async fn commit(tx: Transaction<'static, Sqlite>) -> DbResult<()> {
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }

    async fn insert(tx: &mut Transaction<'static, Sqlite>, input: &NewProduction) -> DbResult<String> {
        let id = generate_id();
        let now = write_timestamp();

        sqlx::query(
            r#"
            INSERT INTO production (
                id, animal_id, date, morning_liters, evening_liters, total_liters, notes,
                created_at, updated_at, synced, remote_id, deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, 0, NULL, 0)
            "#,
        )
        .bind(&id)
        .bind(&input.animal_id)
        .bind(input.date)
        .bind(input.morning_liters)
        .bind(input.evening_liters)
        .bind(input.total_liters())
        .bind(&input.notes)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        Ok(id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
