//! # Paddock Repository

use tracing::{debug, info};

use herdbook_core::{NewPaddock, Paddock, PaddockPatch, PaddockStatus};

use super::{entity_repository, generate_id, write_timestamp, Assignments};
use crate::error::DbResult;

entity_repository!(
    /// Repository for the `paddocks` table.
    PaddockRepository,
    Paddock
);

impl PaddockRepository {
    pub async fn create(&self, input: NewPaddock) -> DbResult<String> {
        input.validate()?;

        let id = generate_id();
        let now = write_timestamp();

        sqlx::query(
            r#"
            INSERT INTO paddocks (
                id, name, area_ha, grass_type, status, capacity, notes,
                created_at, updated_at, synced, remote_id, deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, 0, NULL, 0)
            "#,
        )
        .bind(&id)
        .bind(&input.name)
        .bind(input.area_ha)
        .bind(&input.grass_type)
        .bind(input.status)
        .bind(input.capacity)
        .bind(&input.notes)
        .bind(now)
        .execute(self.pool())
        .await?;

        info!(id = %id, name = %input.name, "Paddock created");
        Ok(id)
    }

    pub async fn update(&self, id: &str, patch: PaddockPatch) -> DbResult<()> {
        patch.validate()?;
        if patch.is_empty() {
            return Ok(());
        }

        debug!(id = %id, "Updating paddock");

        let mut changes = Assignments::new("paddocks");
        changes
            .set("name", patch.name)
            .set("area_ha", patch.area_ha)
            .set("grass_type", patch.grass_type)
            .set("status", patch.status)
            .set("capacity", patch.capacity)
            .set("notes", patch.notes);

        changes.execute(self.pool(), "Paddock", id).await
    }

    /// Paddocks in the given status, by name.
    pub async fn by_status(&self, status: PaddockStatus) -> DbResult<Vec<Paddock>> {
        let rows = sqlx::query_as::<_, Paddock>(
            "SELECT * FROM paddocks WHERE status = ?1 AND deleted = 0 ORDER BY name",
        )
        .bind(status)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, DbError};

    #[tokio::test]
    async fn test_by_status() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.paddocks();
        repo.create(NewPaddock::new("North")).await.unwrap();
        let river = repo.create(NewPaddock::new("River")).await.unwrap();
        repo.create(NewPaddock::new("Hill")).await.unwrap();

        repo.update(
            &river,
            PaddockPatch {
                status: Some(PaddockStatus::InUse),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let available: Vec<String> = repo
            .by_status(PaddockStatus::Available)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(available, vec!["Hill", "North"]);
        assert_eq!(repo.by_status(PaddockStatus::InUse).await.unwrap()[0].id, river);
        assert!(repo.by_status(PaddockStatus::Resting).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.paddocks().create(NewPaddock::new("  ")).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }
}
