//! # Expense Repository
//!
//! Farm costs by category. Amounts are integer cents.

use tracing::{debug, info};

use herdbook_core::{CategoryTotal, DateRange, Expense, ExpensePatch, Money, NewExpense};

use super::{entity_repository, generate_id, write_timestamp, Assignments};
use crate::error::DbResult;

entity_repository!(
    /// Repository for the `expenses` table.
    ExpenseRepository,
    Expense
);

impl ExpenseRepository {
    pub async fn create(&self, input: NewExpense) -> DbResult<String> {
        input.validate()?;

        let id = generate_id();
        let now = write_timestamp();

        sqlx::query(
            r#"
            INSERT INTO expenses (
                id, date, category, description, amount_cents, supplier, notes,
                created_at, updated_at, synced, remote_id, deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, 0, NULL, 0)
            "#,
        )
        .bind(&id)
        .bind(input.date)
        .bind(input.category)
        .bind(&input.description)
        .bind(input.amount_cents)
        .bind(&input.supplier)
        .bind(&input.notes)
        .bind(now)
        .execute(self.pool())
        .await?;

        info!(id = %id, category = ?input.category, "Expense recorded");
        Ok(id)
    }

    pub async fn update(&self, id: &str, patch: ExpensePatch) -> DbResult<()> {
        patch.validate()?;
        if patch.is_empty() {
            return Ok(());
        }

        debug!(id = %id, "Updating expense");

        let mut changes = Assignments::new("expenses");
        changes
            .set("date", patch.date)
            .set("category", patch.category)
            .set("description", patch.description)
            .set("amount_cents", patch.amount_cents)
            .set("supplier", patch.supplier)
            .set("notes", patch.notes);

        changes.execute(self.pool(), "Expense", id).await
    }

    /// Expenses within a range, newest first.
    pub async fn by_range(&self, range: DateRange) -> DbResult<Vec<Expense>> {
        let rows = sqlx::query_as::<_, Expense>(
            r#"
            SELECT * FROM expenses
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

    pub async fn total_by_range(&self, range: DateRange) -> DbResult<Money> {
        let cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0)
            FROM expenses
            WHERE date BETWEEN ?1 AND ?2 AND deleted = 0
            "#,
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_one(self.pool())
        .await?;

        Ok(Money::from_cents(cents))
    }

    /// Per-category totals within a range, largest first.
    ///
    /// Categories without expenses in the range are absent.
    pub async fn totals_by_category(&self, range: DateRange) -> DbResult<Vec<CategoryTotal>> {
        let rows = sqlx::query_as::<_, CategoryTotal>(
            r#"
            SELECT category, SUM(amount_cents) AS total_cents
            FROM expenses
            WHERE date BETWEEN ?1 AND ?2 AND deleted = 0
            GROUP BY category
            ORDER BY total_cents DESC
            "#,
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_all(self.pool())
        .await?;

        debug!(categories = rows.len(), "Loaded expense breakdown");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::NaiveDate;
    use herdbook_core::{ExpenseCategory, IncomeKind, NewIncome};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn cost(day: u32, category: ExpenseCategory, cents: i64) -> NewExpense {
        NewExpense::new(d(day), category, Money::from_cents(cents))
    }

    #[tokio::test]
    async fn test_totals_by_category_largest_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.expenses();
        repo.create(cost(1, ExpenseCategory::Feed, 30_000)).await.unwrap();
        repo.create(cost(2, ExpenseCategory::Health, 5_000)).await.unwrap();
        repo.create(cost(3, ExpenseCategory::Feed, 20_000)).await.unwrap();
        repo.create(cost(4, ExpenseCategory::Labor, 40_000)).await.unwrap();
        let gone = repo.create(cost(5, ExpenseCategory::Health, 99_000)).await.unwrap();
        repo.soft_delete(&gone).await.unwrap();

        let totals = repo.totals_by_category(DateRange::new(d(1), d(31))).await.unwrap();
        let pairs: Vec<(ExpenseCategory, i64)> =
            totals.iter().map(|t| (t.category, t.total_cents)).collect();
        assert_eq!(
            pairs,
            vec![
                (ExpenseCategory::Feed, 50_000),
                (ExpenseCategory::Labor, 40_000),
                (ExpenseCategory::Health, 5_000),
            ]
        );
        assert!(repo.totals_by_category(DateRange::new(d(31), d(1))).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_amount_changes_total() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.expenses();
        let id = repo.create(cost(1, ExpenseCategory::Feed, 30_000)).await.unwrap();

        repo.update(
            &id,
            ExpensePatch {
                amount_cents: Some(12_345),
                supplier: Some(Some("Agro Norte".to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let march = DateRange::new(d(1), d(31));
        assert_eq!(repo.total_by_range(march).await.unwrap(), Money::from_cents(12_345));
        assert_eq!(repo.by_range(march).await.unwrap()[0].supplier.as_deref(), Some("Agro Norte"));
    }

    #[tokio::test]
    async fn test_finance_summary_balance() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.incomes()
            .create(NewIncome::new(d(10), IncomeKind::MilkSale, Money::from_cents(80_000)))
            .await
            .unwrap();
        db.expenses().create(cost(11, ExpenseCategory::Feed, 30_000)).await.unwrap();
        db.expenses().create(cost(12, ExpenseCategory::Utilities, 60_000)).await.unwrap();

        let summary = db.finance_summary(DateRange::new(d(1), d(31))).await.unwrap();
        assert_eq!(summary.income, Money::from_cents(80_000));
        assert_eq!(summary.expenses, Money::from_cents(90_000));
        assert_eq!(summary.balance, Money::from_cents(-10_000));
    }
}
