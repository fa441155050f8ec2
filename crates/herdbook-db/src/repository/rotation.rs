//! # Rotation Repository
//!
//! Grazing periods of the herd in a paddock. A rotation without an
//! `exit_date` is open (the animals are still in the paddock).

use chrono::NaiveDate;
use tracing::{debug, info};

use herdbook_core::{NewRotation, Rotation, RotationPatch};

use super::{entity_repository, generate_id, write_timestamp, Assignments};
use crate::error::DbResult;

entity_repository!(
    /// Repository for the `rotations` table.
    RotationRepository,
    Rotation
);

impl RotationRepository {
    pub async fn create(&self, input: NewRotation) -> DbResult<String> {
        input.validate()?;

        let id = generate_id();
        let now = write_timestamp();

        sqlx::query(
            r#"
            INSERT INTO rotations (
                id, paddock_id, entry_date, exit_date, animal_count, notes,
                created_at, updated_at, synced, remote_id, deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, 0, NULL, 0)
            "#,
        )
        .bind(&id)
        .bind(&input.paddock_id)
        .bind(input.entry_date)
        .bind(input.exit_date)
        .bind(input.animal_count)
        .bind(&input.notes)
        .bind(now)
        .execute(self.pool())
        .await?;

        info!(id = %id, paddock_id = %input.paddock_id, "Rotation started");
        Ok(id)
    }

    pub async fn update(&self, id: &str, patch: RotationPatch) -> DbResult<()> {
        patch.validate()?;
        if patch.is_empty() {
            return Ok(());
        }

        debug!(id = %id, "Updating rotation");

        let mut changes = Assignments::new("rotations");
        changes
            .set("entry_date", patch.entry_date)
            .set("exit_date", patch.exit_date)
            .set("animal_count", patch.animal_count)
            .set("notes", patch.notes);

        changes.execute(self.pool(), "Rotation", id).await
    }

    /// Records the day the herd left the paddock.
    pub async fn close(&self, id: &str, exit_date: NaiveDate) -> DbResult<()> {
        self.update(
            id,
            RotationPatch {
                exit_date: Some(Some(exit_date)),
                ..Default::default()
            },
        )
        .await
    }

    /// Rotations of one paddock, most recent entry first.
    pub async fn by_paddock(&self, paddock_id: &str) -> DbResult<Vec<Rotation>> {
        let rows = sqlx::query_as::<_, Rotation>(
            r#"
            SELECT * FROM rotations
            WHERE paddock_id = ?1 AND deleted = 0
            ORDER BY entry_date DESC, created_at DESC
            "#,
        )
        .bind(paddock_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    /// Rotations still in progress.
    pub async fn open(&self) -> DbResult<Vec<Rotation>> {
        let rows = sqlx::query_as::<_, Rotation>(
            r#"
            SELECT * FROM rotations
            WHERE exit_date IS NULL AND deleted = 0
            ORDER BY entry_date DESC
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, DbError};
    use herdbook_core::{NewPaddock, ValidationError};

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let paddock = db.paddocks().create(NewPaddock::new("North")).await.unwrap();
        (db, paddock)
    }

    #[tokio::test]
    async fn test_open_and_close() {
        let (db, paddock) = setup().await;
        let repo = db.rotations();
        let first = repo.create(NewRotation::new(&paddock, d(1, 1), 20)).await.unwrap();
        let second = repo.create(NewRotation::new(&paddock, d(2, 1), 18)).await.unwrap();

        assert_eq!(repo.open().await.unwrap().len(), 2);

        repo.close(&first, d(1, 20)).await.unwrap();

        let open = repo.open().await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, second);

        let history = repo.by_paddock(&paddock).await.unwrap();
        assert_eq!(history[0].id, second);
        assert!(!history[1].is_open());
    }

    #[tokio::test]
    async fn test_exit_before_entry_rejected() {
        let (db, paddock) = setup().await;
        let input = NewRotation {
            exit_date: Some(d(1, 1)),
            ..NewRotation::new(&paddock, d(1, 10), 20)
        };
        let err = db.rotations().create(input).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_paddock_is_foreign_key_violation() {
        let (db, _) = setup().await;
        let err = db
            .rotations()
            .create(NewRotation::new(crate::repository::generate_id(), d(1, 1), 5))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_close_before_entry_rejected_by_store() {
        let (db, paddock) = setup().await;
        let repo = db.rotations();
        let id = repo.create(NewRotation::new(&paddock, d(3, 10), 12)).await.unwrap();

        let err = repo.close(&id, d(3, 1)).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(ValidationError::DateOrder { .. })));

        let stored = repo.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.entry_date, d(3, 10));
        assert!(stored.exit_date.is_none());

        // Moving the entry past a stored exit date is caught the same way.
        repo.close(&id, d(3, 20)).await.unwrap();
        let err = repo
            .update(
                &id,
                RotationPatch {
                    entry_date: Some(d(3, 25)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));

        // Same day in and out is allowed.
        repo.close(&id, d(3, 10)).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_rejects_overlong_notes() {
        let (db, paddock) = setup().await;
        let repo = db.rotations();
        let id = repo.create(NewRotation::new(&paddock, d(1, 1), 8)).await.unwrap();

        let patch = RotationPatch {
            notes: Some(Some("n".repeat(herdbook_core::validation::MAX_TEXT_LEN + 1))),
            ..Default::default()
        };
        let err = repo.update(&id, patch).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(ValidationError::TooLong { .. })));
        assert!(repo.get_by_id(&id).await.unwrap().unwrap().notes.is_none());
    }
}
