//! # Reproductive Event Repository
//!
//! Heats, services, pregnancy checks and calvings per animal.

use tracing::{debug, info};

use herdbook_core::{NewReproductiveEvent, ReproductiveEvent, ReproductiveEventPatch};

use super::{entity_repository, generate_id, write_timestamp, Assignments};
use crate::error::DbResult;

entity_repository!(
    /// Repository for the `reproductive_events` table.
    ReproductiveEventRepository,
    ReproductiveEvent
);

impl ReproductiveEventRepository {
    pub async fn create(&self, input: NewReproductiveEvent) -> DbResult<String> {
        input.validate()?;

        let id = generate_id();
        let now = write_timestamp();

        sqlx::query(
            r#"
            INSERT INTO reproductive_events (
                id, animal_id, kind, date, bull_id, straw, outcome, notes,
                created_at, updated_at, synced, remote_id, deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, 0, NULL, 0)
            "#,
        )
        .bind(&id)
        .bind(&input.animal_id)
        .bind(input.kind)
        .bind(input.date)
        .bind(&input.bull_id)
        .bind(&input.straw)
        .bind(input.outcome)
        .bind(&input.notes)
        .bind(now)
        .execute(self.pool())
        .await?;

        info!(id = %id, animal_id = %input.animal_id, kind = ?input.kind, "Reproductive event recorded");
        Ok(id)
    }

    pub async fn update(&self, id: &str, patch: ReproductiveEventPatch) -> DbResult<()> {
        patch.validate()?;
        if patch.is_empty() {
            return Ok(());
        }

        debug!(id = %id, "Updating reproductive event");

        let mut changes = Assignments::new("reproductive_events");
        changes
            .set("kind", patch.kind)
            .set("date", patch.date)
            .set("bull_id", patch.bull_id)
            .set("straw", patch.straw)
            .set("outcome", patch.outcome)
            .set("notes", patch.notes);

        changes.execute(self.pool(), "ReproductiveEvent", id).await
    }

    /// Reproductive history of one animal, newest first.
    pub async fn by_animal(&self, animal_id: &str) -> DbResult<Vec<ReproductiveEvent>> {
        let rows = sqlx::query_as::<_, ReproductiveEvent>(
            r#"
            SELECT * FROM reproductive_events
            WHERE animal_id = ?1 AND deleted = 0
            ORDER BY date DESC, created_at DESC
            "#,
        )
        .bind(animal_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }
}
