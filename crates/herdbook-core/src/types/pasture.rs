//! Paddocks and grazing rotations.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::double_option;
use crate::impl_record;
use crate::record::EntityKind;
use crate::validation::{
    validate_date_order, validate_head_count, validate_optional_quantity, validate_patch_text,
    validate_quantity, validate_required, validate_text, validate_uuid, ValidationResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaddockStatus {
    Available,
    InUse,
    Resting,
    Maintenance,
}

impl Default for PaddockStatus {
    fn default() -> Self {
        PaddockStatus::Available
    }
}

// =============================================================================
// Paddock
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Paddock {
    pub id: String,
    pub name: String,
    pub area_ha: Option<f64>,
    pub grass_type: Option<String>,
    pub status: PaddockStatus,
    /// Head of cattle the paddock supports.
    pub capacity: Option<i64>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    pub synced: bool,
    pub remote_id: Option<String>,
    pub deleted: bool,
}

impl_record!(Paddock, EntityKind::Paddocks);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPaddock {
    pub name: String,
    #[serde(default)]
    pub area_ha: Option<f64>,
    #[serde(default)]
    pub grass_type: Option<String>,
    #[serde(default)]
    pub status: PaddockStatus,
    #[serde(default)]
    pub capacity: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewPaddock {
    pub fn new(name: impl Into<String>) -> Self {
        NewPaddock {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_required("name", &self.name)?;
        validate_optional_quantity("area_ha", self.area_ha)?;
        if let Some(capacity) = self.capacity {
            validate_head_count("capacity", capacity)?;
        }
        if let Some(grass) = &self.grass_type {
            validate_text("grass_type", grass)?;
        }
        if let Some(notes) = &self.notes {
            validate_text("notes", notes)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaddockPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<f64>")]
    pub area_ha: Option<Option<f64>>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<String>")]
    pub grass_type: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<PaddockStatus>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<i64>")]
    pub capacity: Option<Option<i64>>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<String>")]
    pub notes: Option<Option<String>>,
}

impl PaddockPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.area_ha.is_none()
            && self.grass_type.is_none()
            && self.status.is_none()
            && self.capacity.is_none()
            && self.notes.is_none()
    }

    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.name {
            validate_required("name", name)?;
        }
        if let Some(Some(area)) = self.area_ha {
            validate_quantity("area_ha", area)?;
        }
        if let Some(Some(capacity)) = self.capacity {
            validate_head_count("capacity", capacity)?;
        }
        validate_patch_text("grass_type", &self.grass_type)?;
        validate_patch_text("notes", &self.notes)
    }
}

// =============================================================================
// Rotation
// =============================================================================

/// A group of animals grazing a paddock from `entry_date` until `exit_date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Rotation {
    pub id: String,
    pub paddock_id: String,
    #[ts(as = "String")]
    pub entry_date: NaiveDate,
    /// `None` while the animals are still in the paddock.
    #[ts(as = "Option<String>")]
    pub exit_date: Option<NaiveDate>,
    pub animal_count: i64,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    pub synced: bool,
    pub remote_id: Option<String>,
    pub deleted: bool,
}

impl_record!(Rotation, EntityKind::Rotations);

impl Rotation {
    pub fn is_open(&self) -> bool {
        self.exit_date.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewRotation {
    pub paddock_id: String,
    #[ts(as = "String")]
    pub entry_date: NaiveDate,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub exit_date: Option<NaiveDate>,
    pub animal_count: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewRotation {
    pub fn new(paddock_id: impl Into<String>, entry_date: NaiveDate, animal_count: i64) -> Self {
        NewRotation {
            paddock_id: paddock_id.into(),
            entry_date,
            exit_date: None,
            animal_count,
            notes: None,
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_uuid("paddock_id", &self.paddock_id)?;
        validate_head_count("animal_count", self.animal_count)?;
        validate_date_order("entry_date", self.entry_date, "exit_date", self.exit_date)?;
        if let Some(notes) = &self.notes {
            validate_text("notes", notes)?;
        }
        Ok(())
    }
}

/// Partial update of a [`Rotation`].
///
/// Closing a rotation is `exit_date: Some(Some(day))`. Date order is checked
/// here when both dates are in the patch; against the stored row it is
/// enforced by the `rotations` table itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RotationPatch {
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub entry_date: Option<NaiveDate>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<String>")]
    pub exit_date: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub animal_count: Option<i64>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<String>")]
    pub notes: Option<Option<String>>,
}

impl RotationPatch {
    pub fn is_empty(&self) -> bool {
        self.entry_date.is_none()
            && self.exit_date.is_none()
            && self.animal_count.is_none()
            && self.notes.is_none()
    }

    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(count) = self.animal_count {
            validate_head_count("animal_count", count)?;
        }
        if let (Some(entry), Some(exit)) = (self.entry_date, self.exit_date) {
            validate_date_order("entry_date", entry, "exit_date", exit)?;
        }
        validate_patch_text("notes", &self.notes)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    #[test]
    fn test_new_paddock_defaults() {
        let paddock = NewPaddock::new("North hill");
        assert_eq!(paddock.status, PaddockStatus::Available);
        assert!(paddock.validate().is_ok());
        assert!(NewPaddock::new("").validate().is_err());
    }

    #[test]
    fn test_rotation_date_order() {
        let paddock_id = uuid::Uuid::new_v4().to_string();
        let mut rotation = NewRotation::new(paddock_id, d(3, 10), 14);
        assert!(rotation.validate().is_ok());

        rotation.exit_date = Some(d(3, 1));
        assert!(rotation.validate().is_err());

        let patch = RotationPatch {
            entry_date: Some(d(3, 10)),
            exit_date: Some(Some(d(3, 9))),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn test_rotation_requires_animals() {
        let rotation = NewRotation::new(uuid::Uuid::new_v4().to_string(), d(1, 1), 0);
        assert!(rotation.validate().is_err());
    }

    #[test]
    fn test_paddock_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&PaddockStatus::InUse).unwrap(),
            "\"in_use\""
        );
    }
}
