//! # Income Repository
//!
//! Milk sales, animal sales and other farm income. Amounts are integer cents.

use tracing::{debug, info};

use herdbook_core::{DateRange, Income, IncomePatch, Money, NewIncome};

use super::{entity_repository, generate_id, write_timestamp, Assignments};
use crate::error::DbResult;

entity_repository!(
    /// Repository for the `incomes` table.
    IncomeRepository,
    Income
);

impl IncomeRepository {
    pub async fn create(&self, input: NewIncome) -> DbResult<String> {
        input.validate()?;

        let id = generate_id();
        let now = write_timestamp();

        sqlx::query(
            r#"
            INSERT INTO incomes (
                id, date, kind, description, amount_cents, quantity, unit_price_cents, notes,
                created_at, updated_at, synced, remote_id, deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, 0, NULL, 0)
            "#,
        )
        .bind(&id)
        .bind(input.date)
        .bind(input.kind)
        .bind(&input.description)
        .bind(input.amount_cents)
        .bind(input.quantity)
        .bind(input.unit_price_cents)
        .bind(&input.notes)
        .bind(now)
        .execute(self.pool())
        .await?;

        info!(id = %id, amount = %Money::from_cents(input.amount_cents), "Income recorded");
        Ok(id)
    }

    pub async fn update(&self, id: &str, patch: IncomePatch) -> DbResult<()> {
        patch.validate()?;
        if patch.is_empty() {
            return Ok(());
        }

        debug!(id = %id, "Updating income");

        let mut changes = Assignments::new("incomes");
        changes
            .set("date", patch.date)
            .set("kind", patch.kind)
            .set("description", patch.description)
            .set("amount_cents", patch.amount_cents)
            .set("quantity", patch.quantity)
            .set("unit_price_cents", patch.unit_price_cents)
            .set("notes", patch.notes);

        changes.execute(self.pool(), "Income", id).await
    }

    /// Income entries within a range, newest first.
    pub async fn by_range(&self, range: DateRange) -> DbResult<Vec<Income>> {
        let rows = sqlx::query_as::<_, Income>(
            r#"
            SELECT * FROM incomes
            WHERE date BETWEEN ?1 AND ?2 AND deleted = 0
            ORDER BY date DESC, created_at DESC
            "#,
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    /// Sum of income within a range.
    pub async fn total_by_range(&self, range: DateRange) -> DbResult<Money> {
        let cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0)
            FROM incomes
            WHERE date BETWEEN ?1 AND ?2 AND deleted = 0
            "#,
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_one(self.pool())
        .await?;

        Ok(Money::from_cents(cents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, DbError};
    use chrono::NaiveDate;
    use herdbook_core::IncomeKind;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    async fn repo() -> IncomeRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().incomes()
    }

    #[tokio::test]
    async fn test_priced_sale_stores_quantity_and_amount() {
        let repo = repo().await;
        let id = repo
            .create(NewIncome::priced(d(1), IncomeKind::MilkSale, 120.0, Money::from_cents(45)))
            .await
            .unwrap();

        let income = repo.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(income.amount(), Money::from_cents(5_400));
        assert_eq!(income.quantity, Some(120.0));
        assert_eq!(income.unit_price_cents, Some(45));
    }

    #[tokio::test]
    async fn test_zero_amount_rejected() {
        let repo = repo().await;
        let err = repo
            .create(NewIncome::new(d(1), IncomeKind::Other, Money::zero()))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    async fn test_range_queries_skip_tombstones() {
        let repo = repo().await;
        repo.create(NewIncome::new(d(1), IncomeKind::MilkSale, Money::from_cents(10_000)))
            .await
            .unwrap();
        repo.create(NewIncome::new(d(15), IncomeKind::AnimalSale, Money::from_cents(90_000)))
            .await
            .unwrap();
        let gone = repo
            .create(NewIncome::new(d(20), IncomeKind::Other, Money::from_cents(1_000)))
            .await
            .unwrap();
        repo.soft_delete(&gone).await.unwrap();

        let march = DateRange::new(d(1), d(31));
        let rows = repo.by_range(march).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, d(15));

        assert_eq!(repo.total_by_range(march).await.unwrap(), Money::from_cents(100_000));
        assert_eq!(
            repo.total_by_range(DateRange::new(d(31), d(1))).await.unwrap(),
            Money::zero()
        );
    }
}
