//! # Animal Event Repository
//!
//! Free-form history of an animal (weighings, moves, observations), shown
//! on the animal detail screen.

use tracing::{debug, info};

use herdbook_core::{AnimalEvent, AnimalEventPatch, NewAnimalEvent};

use super::{entity_repository, generate_id, write_timestamp, Assignments};
use crate::error::DbResult;

entity_repository!(
    /// Repository for the `animal_events` table.
    AnimalEventRepository,
    AnimalEvent
);

impl AnimalEventRepository {
    pub async fn create(&self, input: NewAnimalEvent) -> DbResult<String> {
        input.validate()?;

        let id = generate_id();
        let now = write_timestamp();

        sqlx::query(
            r#"
            INSERT INTO animal_events (
                id, animal_id, kind, date, description, notes,
                created_at, updated_at, synced, remote_id, deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, 0, NULL, 0)
            "#,
        )
        .bind(&id)
        .bind(&input.animal_id)
        .bind(&input.kind)
        .bind(input.date)
        .bind(&input.description)
        .bind(&input.notes)
        .bind(now)
        .execute(self.pool())
        .await?;

        info!(id = %id, animal_id = %input.animal_id, kind = %input.kind, "Animal event recorded");
        Ok(id)
    }

    pub async fn update(&self, id: &str, patch: AnimalEventPatch) -> DbResult<()> {
        patch.validate()?;
        if patch.is_empty() {
            return Ok(());
        }

        debug!(id = %id, "Updating animal event");

        let mut changes = Assignments::new("animal_events");
        changes
            .set("kind", patch.kind)
            .set("date", patch.date)
            .set("description", patch.description)
            .set("notes", patch.notes);

        changes.execute(self.pool(), "AnimalEvent", id).await
    }

    /// Full history of one animal, newest first.
    pub async fn by_animal(&self, animal_id: &str) -> DbResult<Vec<AnimalEvent>> {
        let rows = sqlx::query_as::<_, AnimalEvent>(
            r#"
            SELECT * FROM animal_events
            WHERE animal_id = ?1 AND deleted = 0
            ORDER BY date DESC, created_at DESC
            "#,
        )
        .bind(animal_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    /// The `limit` most recent events of one animal.
    ///
    /// The detail screen uses [`herdbook_core::RECENT_EVENTS_LIMIT`].
    pub async fn recent_by_animal(&self, animal_id: &str, limit: i64) -> DbResult<Vec<AnimalEvent>> {
        let rows = sqlx::query_as::<_, AnimalEvent>(
            r#"
            SELECT * FROM animal_events
            WHERE animal_id = ?1 AND deleted = 0
            ORDER BY date DESC, created_at DESC
            LIMIT ?2
            "#,
        )
        .bind(animal_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    pub async fn count_by_animal(&self, animal_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM animal_events WHERE animal_id = ?1 AND deleted = 0",
        )
        .bind(animal_id)
        .fetch_one(self.pool())
        .await?;

        Ok(count)
    }
}
