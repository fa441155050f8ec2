//! # Treatment Repository
//!
//! Vaccines, dewormings and veterinary treatments, plus the follow-up
//! calendar built from `next_date`.

use chrono::NaiveDate;
use tracing::{debug, info};

use herdbook_core::{NewTreatment, Treatment, TreatmentPatch, TreatmentWithAnimal};

use super::{entity_repository, generate_id, write_timestamp, Assignments};
use crate::error::DbResult;

entity_repository!(
    /// Repository for the `treatments` table.
    TreatmentRepository,
    Treatment
);

impl TreatmentRepository {
    pub async fn create(&self, input: NewTreatment) -> DbResult<String> {
        input.validate()?;

        let id = generate_id();
        let now = write_timestamp();

        sqlx::query(
            r#"
            INSERT INTO treatments (
                id, animal_id, date, kind, medication, dose, cost_cents,
                veterinarian, next_date, notes,
                created_at, updated_at, synced, remote_id, deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11, 0, NULL, 0)
            "#,
        )
        .bind(&id)
        .bind(&input.animal_id)
        .bind(input.date)
        .bind(input.kind)
        .bind(&input.medication)
        .bind(&input.dose)
        .bind(input.cost_cents)
        .bind(&input.veterinarian)
        .bind(input.next_date)
        .bind(&input.notes)
        .bind(now)
        .execute(self.pool())
        .await?;

        info!(id = %id, animal_id = %input.animal_id, kind = ?input.kind, "Treatment recorded");
        Ok(id)
    }

    pub async fn update(&self, id: &str, patch: TreatmentPatch) -> DbResult<()> {
        patch.validate()?;
        if patch.is_empty() {
            return Ok(());
        }

        debug!(id = %id, "Updating treatment");

        let mut changes = Assignments::new("treatments");
        changes
            .set("date", patch.date)
            .set("kind", patch.kind)
            .set("medication", patch.medication)
            .set("dose", patch.dose)
            .set("cost_cents", patch.cost_cents)
            .set("veterinarian", patch.veterinarian)
            .set("next_date", patch.next_date)
            .set("notes", patch.notes);

        changes.execute(self.pool(), "Treatment", id).await
    }

    /// Treatment history of one animal, newest first.
    pub async fn by_animal(&self, animal_id: &str) -> DbResult<Vec<Treatment>> {
        let rows = sqlx::query_as::<_, Treatment>(
            r#"
            SELECT * FROM treatments
            WHERE animal_id = ?1 AND deleted = 0
            ORDER BY date DESC, created_at DESC
            "#,
        )
        .bind(animal_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    /// Follow-ups due on or after `from`, soonest first.
    ///
    /// Callers pass today's date for the "upcoming" list.
    pub async fn upcoming(&self, from: NaiveDate) -> DbResult<Vec<TreatmentWithAnimal>> {
        let rows = sqlx::query_as::<_, TreatmentWithAnimal>(
            r#"
            SELECT t.*, a.code AS animal_code, a.name AS animal_name
            FROM treatments t
            JOIN animals a ON a.id = t.animal_id
            WHERE t.next_date IS NOT NULL AND t.next_date >= ?1 AND t.deleted = 0
            ORDER BY t.next_date ASC
            "#,
        )
        .bind(from)
        .fetch_all(self.pool())
        .await?;

        debug!(from = %from, count = rows.len(), "Loaded upcoming treatments");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, DbError};
    use herdbook_core::{Money, NewAnimal, TreatmentKind};

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let animal = db.animals().create(NewAnimal::new("A1", "Holstein")).await.unwrap();
        (db, animal)
    }

    fn vaccine(animal: &str, date: NaiveDate, next: Option<NaiveDate>) -> NewTreatment {
        NewTreatment {
            medication: Some("Aftosa".to_string()),
            cost_cents: 2_500,
            next_date: next,
            ..NewTreatment::new(animal, date, TreatmentKind::Vaccine)
        }
    }

    #[tokio::test]
    async fn test_create_and_history_newest_first() {
        let (db, animal) = setup().await;
        let repo = db.treatments();
        repo.create(vaccine(&animal, d(1, 10), None)).await.unwrap();
        repo.create(NewTreatment::new(&animal, d(3, 2), TreatmentKind::Deworming))
            .await
            .unwrap();

        let history = repo.by_animal(&animal).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kind, TreatmentKind::Deworming);
        assert_eq!(history[1].cost(), Money::from_cents(2_500));
    }

    #[tokio::test]
    async fn test_negative_cost_rejected() {
        let (db, animal) = setup().await;
        let input = NewTreatment {
            cost_cents: -1,
            ..NewTreatment::new(&animal, d(1, 1), TreatmentKind::Treatment)
        };
        let err = db.treatments().create(input).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    async fn test_upcoming_filters_and_orders() {
        let (db, animal) = setup().await;
        let repo = db.treatments();
        repo.create(vaccine(&animal, d(1, 1), Some(d(7, 1)))).await.unwrap();
        repo.create(vaccine(&animal, d(1, 2), Some(d(4, 15)))).await.unwrap();
        repo.create(vaccine(&animal, d(1, 3), Some(d(2, 1)))).await.unwrap();
        repo.create(vaccine(&animal, d(1, 4), None)).await.unwrap();
        let gone = repo.create(vaccine(&animal, d(1, 5), Some(d(5, 1)))).await.unwrap();
        repo.soft_delete(&gone).await.unwrap();

        let upcoming = repo.upcoming(d(3, 1)).await.unwrap();
        let dates: Vec<Option<NaiveDate>> = upcoming.iter().map(|t| t.treatment.next_date).collect();
        assert_eq!(dates, vec![Some(d(4, 15)), Some(d(7, 1))]);
        assert_eq!(upcoming[0].animal_code, "A1");
    }

    #[tokio::test]
    async fn test_update_clears_follow_up() {
        let (db, animal) = setup().await;
        let repo = db.treatments();
        let id = repo.create(vaccine(&animal, d(1, 1), Some(d(7, 1)))).await.unwrap();

        repo.update(
            &id,
            TreatmentPatch {
                next_date: Some(None),
                veterinarian: Some(Some("Dr. Ruiz".to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let row = repo.get_by_id(&id).await.unwrap().unwrap();
        assert!(row.next_date.is_none());
        assert_eq!(row.veterinarian.as_deref(), Some("Dr. Ruiz"));
        assert!(repo.upcoming(d(1, 1)).await.unwrap().is_empty());
    }
}
