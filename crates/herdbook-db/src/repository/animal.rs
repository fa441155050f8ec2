//! # Animal Repository
//!
//! Registration, edits and herd lookups for animals.
//!
//! ## Herd Views
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  status      │ get_all │ active() │ producing()                        │
//! │──────────────┼─────────┼──────────┼─────────────                       │
//! │  active      │    ✓    │    ✓     │                                    │
//! │  producing   │    ✓    │    ✓     │     ✓                              │
//! │  dry         │    ✓    │    ✓     │                                    │
//! │  pregnant    │    ✓    │    ✓     │                                    │
//! │  sold/dead/  │    ✓    │          │                                    │
//! │  culled      │         │          │                                    │
//! │  (tombstone) │         │          │                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info};

use herdbook_core::{Animal, AnimalPatch, AnimalStatus, NewAnimal};

use super::{entity_repository, generate_id, write_timestamp, Assignments};
use crate::error::{DbError, DbResult};

entity_repository!(
    /// Repository for the `animals` table.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let id = db.animals().create(NewAnimal::new("A1", "Holstein")).await?;
    /// let herd = db.animals().active().await?;
    /// ```
    AnimalRepository,
    Animal
);

impl AnimalRepository {
    /// Registers an animal.
    ///
    /// ## Returns
    /// * `Ok(id)` - New UUID of the animal
    /// * `Err(DbError::Validation)` - Input rejected
    /// * `Err(DbError::UniqueViolation)` - Ear-tag code already in use
    pub async fn create(&self, input: NewAnimal) -> DbResult<String> {
        input.validate()?;

        let id = generate_id();
        let now = write_timestamp();

        debug!(id = %id, code = %input.code, "Registering animal");

        sqlx::query(
            r#"
            INSERT INTO animals (
                id, code, name, breed, birth_date, sex, status, weight_kg,
                mother_id, father_id, photo_uri, notes,
                created_at, updated_at, synced, remote_id, deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13, 0, NULL, 0)
            "#,
        )
        .bind(&id)
        .bind(&input.code)
        .bind(&input.name)
        .bind(&input.breed)
        .bind(input.birth_date)
        .bind(input.sex)
        .bind(input.status)
        .bind(input.weight_kg)
        .bind(&input.mother_id)
        .bind(&input.father_id)
        .bind(&input.photo_uri)
        .bind(&input.notes)
        .bind(now)
        .execute(self.pool())
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("code", &input.code),
            other => other,
        })?;

        info!(id = %id, code = %input.code, "Animal registered");
        Ok(id)
    }

    /// Applies the supplied fields of `patch` to a live animal.
    ///
    /// An empty patch is a no-op: nothing is written and the row stays
    /// in its current sync state.
    pub async fn update(&self, id: &str, patch: AnimalPatch) -> DbResult<()> {
        patch.validate()?;
        if patch.is_empty() {
            return Ok(());
        }

        debug!(id = %id, "Updating animal");

        let code = patch.code.clone();
        let mut changes = Assignments::new("animals");
        changes.set("code", patch.code)
            .set("name", patch.name)
            .set("breed", patch.breed)
            .set("birth_date", patch.birth_date)
            .set("sex", patch.sex)
            .set("status", patch.status)
            .set("weight_kg", patch.weight_kg)
            .set("mother_id", patch.mother_id)
            .set("father_id", patch.father_id)
            .set("photo_uri", patch.photo_uri)
            .set("notes", patch.notes);

        changes.execute(self.pool(), "Animal", id)
            .await
            .map_err(|e| match (e, code) {
                (DbError::UniqueViolation { .. }, Some(code)) => DbError::duplicate("code", code),
                (e, _) => e,
            })
    }

    /// Live animal by ear-tag code.
    pub async fn by_code(&self, code: &str) -> DbResult<Option<Animal>> {
        let animal = sqlx::query_as::<_, Animal>(
            "SELECT * FROM animals WHERE code = ?1 AND deleted = 0",
        )
        .bind(code)
        .fetch_optional(self.pool())
        .await?;

        Ok(animal)
    }

    /// Animals still on the farm (active, producing, dry, pregnant), by code.
    pub async fn active(&self) -> DbResult<Vec<Animal>> {
        let mut query: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT * FROM animals WHERE deleted = 0 AND status IN (");
        let mut statuses = query.separated(", ");
        for status in AnimalStatus::IN_HERD {
            statuses.push_bind(status);
        }
        query.push(") ORDER BY code");

        let animals = query.build_query_as::<Animal>().fetch_all(self.pool()).await?;

        debug!(count = animals.len(), "Loaded herd");
        Ok(animals)
    }

    /// Animals currently in milk, by code.
    pub async fn producing(&self) -> DbResult<Vec<Animal>> {
        let animals = sqlx::query_as::<_, Animal>(
            "SELECT * FROM animals WHERE deleted = 0 AND status = ?1 ORDER BY code",
        )
        .bind(AnimalStatus::Producing)
        .fetch_all(self.pool())
        .await?;

        Ok(animals)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
