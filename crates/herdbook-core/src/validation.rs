//! # Validation Module
//!
//! Input validation for records before they reach the store.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Mobile forms                                                 │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Entity repository create/update                              │
//! │  └── THIS MODULE: required fields, ranges, finite numbers              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  ├── UNIQUE constraints (animal code, live production key)             │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted animal code (ear tag).
pub const MAX_CODE_LEN: usize = 30;

/// Longest accepted free-text field (names, descriptions, notes).
pub const MAX_TEXT_LEN: usize = 2000;

// =============================================================================
// String Validators
// =============================================================================

/// Validates that a text field is present (non-blank) and not overlong.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    validate_text(field, value)
}

/// Validates an optional free-text field's length.
pub fn validate_text(field: &str, value: &str) -> ValidationResult<()> {
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_TEXT_LEN,
        });
    }
    Ok(())
}

/// Validates a nullable text field of a patch.
///
/// Absent (`None`) and cleared (`Some(None)`) are always valid; a new value
/// gets the same length rule as on create.
pub fn validate_patch_text(field: &str, value: &Option<Option<String>>) -> ValidationResult<()> {
    match value {
        Some(Some(text)) => validate_text(field, text),
        _ => Ok(()),
    }
}

/// Validates an animal code (the ear tag painted on the cow).
///
/// ## Rules
/// - Must not be empty
/// - At most [`MAX_CODE_LEN`] characters
/// - Letters, digits, hyphens, underscores and dots only
///
/// ## Example
/// ```rust
/// use herdbook_core::validation::validate_animal_code;
///
/// assert!(validate_animal_code("A1").is_ok());
/// assert!(validate_animal_code("V-023").is_ok());
/// assert!(validate_animal_code("").is_err());
/// assert!(validate_animal_code("A 1").is_err());
/// ```
pub fn validate_animal_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::required("code"));
    }

    if code.chars().count() > MAX_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: MAX_CODE_LEN,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, underscores and dots"
                .to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a non-negative finite quantity (liters, kilograms, hectares).
///
/// ## Example
/// ```rust
/// use herdbook_core::validation::validate_quantity;
///
/// assert!(validate_quantity("morning_liters", 12.5).is_ok());
/// assert!(validate_quantity("morning_liters", 0.0).is_ok());
/// assert!(validate_quantity("morning_liters", -1.0).is_err());
/// assert!(validate_quantity("morning_liters", f64::NAN).is_err());
/// ```
pub fn validate_quantity(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite {
            field: field.to_string(),
        });
    }

    if value < 0.0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates an optional quantity; `None` is always valid.
pub fn validate_optional_quantity(field: &str, value: Option<f64>) -> ValidationResult<()> {
    match value {
        Some(v) => validate_quantity(field, v),
        None => Ok(()),
    }
}

/// Validates a money amount that may be zero (e.g. a free vaccination).
pub fn validate_cost_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates an income or expense amount (must be positive).
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a positive head count (animals in a paddock, capacity).
pub fn validate_head_count(field: &str, count: i64) -> ValidationResult<()> {
    if count <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Date Validators
// =============================================================================

/// Validates that `later` (when present) is not before `earlier`.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use herdbook_core::validation::validate_date_order;
///
/// let entry = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
/// let exit = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
/// assert!(validate_date_order("entry_date", entry, "exit_date", Some(exit)).is_err());
/// assert!(validate_date_order("entry_date", entry, "exit_date", None).is_ok());
/// ```
pub fn validate_date_order(
    earlier_field: &str,
    earlier: NaiveDate,
    later_field: &str,
    later: Option<NaiveDate>,
) -> ValidationResult<()> {
    match later {
        Some(later) if later < earlier => Err(ValidationError::DateOrder {
            earlier: earlier_field.to_string(),
            later: later_field.to_string(),
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID reference (e.g. `animal_id`).
///
/// ## Example
/// ```rust
/// use herdbook_core::validation::validate_uuid;
///
/// assert!(validate_uuid("animal_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("animal_id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required(field));
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
