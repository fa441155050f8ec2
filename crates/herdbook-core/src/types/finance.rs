//! Farm income and expenses.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::double_option;
use crate::impl_record;
use crate::money::Money;
use crate::record::EntityKind;
use crate::validation::{
    validate_amount_cents, validate_cost_cents, validate_optional_quantity, validate_patch_text,
    validate_quantity, validate_text, ValidationResult,
};

// =============================================================================
// Enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum IncomeKind {
    MilkSale,
    AnimalSale,
    ByproductSale,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Feed,
    Health,
    Labor,
    Maintenance,
    Utilities,
    Investment,
    Other,
}

// =============================================================================
// Income
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Income {
    pub id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub kind: IncomeKind,
    pub description: Option<String>,
    pub amount_cents: i64,
    /// Units sold (liters of milk, head of cattle).
    pub quantity: Option<f64>,
    pub unit_price_cents: Option<i64>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    pub synced: bool,
    pub remote_id: Option<String>,
    pub deleted: bool,
}

impl_record!(Income, EntityKind::Incomes);

impl Income {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewIncome {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub kind: IncomeKind,
    #[serde(default)]
    pub description: Option<String>,
    pub amount_cents: i64,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit_price_cents: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewIncome {
    pub fn new(date: NaiveDate, kind: IncomeKind, amount: Money) -> Self {
        NewIncome {
            date,
            kind,
            description: None,
            amount_cents: amount.cents(),
            quantity: None,
            unit_price_cents: None,
            notes: None,
        }
    }

    /// A sale priced per unit; the amount is `unit_price × quantity`.
    pub fn priced(date: NaiveDate, kind: IncomeKind, quantity: f64, unit_price: Money) -> Self {
        NewIncome {
            quantity: Some(quantity),
            unit_price_cents: Some(unit_price.cents()),
            ..NewIncome::new(date, kind, unit_price.times_quantity(quantity))
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_amount_cents("amount_cents", self.amount_cents)?;
        validate_optional_quantity("quantity", self.quantity)?;
        if let Some(price) = self.unit_price_cents {
            validate_cost_cents("unit_price_cents", price)?;
        }
        if let Some(description) = &self.description {
            validate_text("description", description)?;
        }
        if let Some(notes) = &self.notes {
            validate_text("notes", notes)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct IncomePatch {
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub kind: Option<IncomeKind>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<String>")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub amount_cents: Option<i64>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<f64>")]
    pub quantity: Option<Option<f64>>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<i64>")]
    pub unit_price_cents: Option<Option<i64>>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<String>")]
    pub notes: Option<Option<String>>,
}

impl IncomePatch {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.kind.is_none()
            && self.description.is_none()
            && self.amount_cents.is_none()
            && self.quantity.is_none()
            && self.unit_price_cents.is_none()
            && self.notes.is_none()
    }

    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(amount) = self.amount_cents {
            validate_amount_cents("amount_cents", amount)?;
        }
        if let Some(Some(q)) = self.quantity {
            validate_quantity("quantity", q)?;
        }
        if let Some(Some(price)) = self.unit_price_cents {
            validate_cost_cents("unit_price_cents", price)?;
        }
        validate_patch_text("description", &self.description)?;
        validate_patch_text("notes", &self.notes)
    }
}

// =============================================================================
// Expense
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Expense {
    pub id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    pub description: Option<String>,
    pub amount_cents: i64,
    pub supplier: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    pub synced: bool,
    pub remote_id: Option<String>,
    pub deleted: bool,
}

impl_record!(Expense, EntityKind::Expenses);

impl Expense {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewExpense {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    #[serde(default)]
    pub description: Option<String>,
    pub amount_cents: i64,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewExpense {
    pub fn new(date: NaiveDate, category: ExpenseCategory, amount: Money) -> Self {
        NewExpense {
            date,
            category,
            description: None,
            amount_cents: amount.cents(),
            supplier: None,
            notes: None,
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_amount_cents("amount_cents", self.amount_cents)?;
        if let Some(description) = &self.description {
            validate_text("description", description)?;
        }
        if let Some(supplier) = &self.supplier {
            validate_text("supplier", supplier)?;
        }
        if let Some(notes) = &self.notes {
            validate_text("notes", notes)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExpensePatch {
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub category: Option<ExpenseCategory>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<String>")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub amount_cents: Option<i64>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<String>")]
    pub supplier: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<String>")]
    pub notes: Option<Option<String>>,
}

impl ExpensePatch {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.category.is_none()
            && self.description.is_none()
            && self.amount_cents.is_none()
            && self.supplier.is_none()
            && self.notes.is_none()
    }

    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(amount) = self.amount_cents {
            validate_amount_cents("amount_cents", amount)?;
        }
        validate_patch_text("description", &self.description)?;
        validate_patch_text("supplier", &self.supplier)?;
        validate_patch_text("notes", &self.notes)
    }
}

// =============================================================================
// Aggregates
// =============================================================================

/// Expense total for one category over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CategoryTotal {
    pub category: ExpenseCategory,
    pub total_cents: i64,
}

impl CategoryTotal {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// Income, expenses and balance over a date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FinanceSummary {
    pub income: Money,
    pub expenses: Money,
    pub balance: Money,
}

impl FinanceSummary {
    pub fn new(income: Money, expenses: Money) -> Self {
        FinanceSummary {
            income,
            expenses,
            balance: income - expenses,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 15).unwrap()
    }

    #[test]
    fn test_priced_income_computes_amount() {
        let income = NewIncome::priced(day(), IncomeKind::MilkSale, 300.0, Money::from_cents(45));
        assert_eq!(income.amount_cents, 13_500);
        assert_eq!(income.quantity, Some(300.0));
        assert!(income.validate().is_ok());
    }

    #[test]
    fn test_amounts_must_be_positive() {
        let income = NewIncome::new(day(), IncomeKind::Other, Money::zero());
        assert!(income.validate().is_err());

        let expense = NewExpense::new(day(), ExpenseCategory::Feed, Money::from_cents(-10));
        assert!(expense.validate().is_err());
    }

    #[test]
    fn test_finance_summary_balance_may_be_negative() {
        let summary = FinanceSummary::new(Money::from_cents(1_000), Money::from_cents(2_500));
        assert_eq!(summary.balance.cents(), -1_500);
    }

    #[test]
    fn test_category_wire_names() {
        assert_eq!(
            serde_json::to_string(&ExpenseCategory::Utilities).unwrap(),
            "\"utilities\""
        );
        assert_eq!(
            serde_json::to_string(&IncomeKind::ByproductSale).unwrap(),
            "\"byproduct_sale\""
        );
    }

    #[test]
    fn test_expense_patch_validation() {
        let patch = ExpensePatch {
            amount_cents: Some(0),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
        assert!(ExpensePatch::default().is_empty());
    }
}
