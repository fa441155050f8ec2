//! Animals and everything recorded against a single animal: milk
//! production, treatments, reproductive events and free-form events.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::double_option;
use crate::impl_record;
use crate::money::Money;
use crate::record::EntityKind;
use crate::validation::{
    validate_animal_code, validate_cost_cents, validate_optional_quantity, validate_patch_text,
    validate_quantity, validate_required, validate_text, validate_uuid, ValidationResult,
};

// =============================================================================
// Enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Female,
    Male,
}

impl Default for Sex {
    fn default() -> Self {
        Sex::Female
    }
}

/// Herd status of an animal.
///
/// ```text
/// active ──► producing ◄──► dry        (lactation cycle)
///   │            │
///   └──► pregnant┘
///
/// any ──► sold | dead | culled         (left the herd)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AnimalStatus {
    Active,
    Producing,
    Dry,
    Pregnant,
    Sold,
    Dead,
    Culled,
}

impl AnimalStatus {
    /// Statuses of animals still on the farm.
    pub const IN_HERD: [AnimalStatus; 4] = [
        AnimalStatus::Active,
        AnimalStatus::Producing,
        AnimalStatus::Dry,
        AnimalStatus::Pregnant,
    ];
}

impl Default for AnimalStatus {
    fn default() -> Self {
        AnimalStatus::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TreatmentKind {
    Vaccine,
    Deworming,
    Treatment,
    Surgery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReproductiveEventKind {
    Heat,
    Mating,
    Insemination,
    PregnancyCheck,
    Calving,
    Abortion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    Positive,
    Negative,
    Pending,
}

// =============================================================================
// Animal
// =============================================================================

/// An animal in the herd, identified on the farm by its ear-tag `code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Animal {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Ear tag - business identifier, unique across all rows.
    pub code: String,

    pub name: Option<String>,
    pub breed: String,

    #[ts(as = "Option<String>")]
    pub birth_date: Option<NaiveDate>,

    pub sex: Sex,
    pub status: AnimalStatus,

    /// Last recorded weight.
    pub weight_kg: Option<f64>,

    pub mother_id: Option<String>,
    pub father_id: Option<String>,

    /// Local URI of the photo taken on the device.
    pub photo_uri: Option<String>,

    pub notes: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    /// `false` while the remote store has not confirmed this version.
    pub synced: bool,
    pub remote_id: Option<String>,
    pub deleted: bool,
}

impl_record!(Animal, EntityKind::Animals);

/// Input for registering an animal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewAnimal {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    pub breed: String,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub sex: Sex,
    #[serde(default)]
    pub status: AnimalStatus,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub mother_id: Option<String>,
    #[serde(default)]
    pub father_id: Option<String>,
    #[serde(default)]
    pub photo_uri: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewAnimal {
    /// Minimal input: code and breed, everything else defaulted.
    pub fn new(code: impl Into<String>, breed: impl Into<String>) -> Self {
        NewAnimal {
            code: code.into(),
            breed: breed.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_animal_code(&self.code)?;
        validate_required("breed", &self.breed)?;
        if let Some(name) = &self.name {
            validate_text("name", name)?;
        }
        validate_optional_quantity("weight_kg", self.weight_kg)?;
        if let Some(id) = &self.mother_id {
            validate_uuid("mother_id", id)?;
        }
        if let Some(id) = &self.father_id {
            validate_uuid("father_id", id)?;
        }
        if let Some(uri) = &self.photo_uri {
            validate_text("photo_uri", uri)?;
        }
        if let Some(notes) = &self.notes {
            validate_text("notes", notes)?;
        }
        Ok(())
    }
}

/// Partial update of an [`Animal`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AnimalPatch {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<String>")]
    pub name: Option<Option<String>>,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<String>")]
    pub birth_date: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub sex: Option<Sex>,
    #[serde(default)]
    pub status: Option<AnimalStatus>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<f64>")]
    pub weight_kg: Option<Option<f64>>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<String>")]
    pub mother_id: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<String>")]
    pub father_id: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<String>")]
    pub photo_uri: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<String>")]
    pub notes: Option<Option<String>>,
}

impl AnimalPatch {
    pub fn is_empty(&self) -> bool {
        self.code.is_none()
            && self.name.is_none()
            && self.breed.is_none()
            && self.birth_date.is_none()
            && self.sex.is_none()
            && self.status.is_none()
            && self.weight_kg.is_none()
            && self.mother_id.is_none()
            && self.father_id.is_none()
            && self.photo_uri.is_none()
            && self.notes.is_none()
    }

    /// Validates only the supplied fields.
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(code) = &self.code {
            validate_animal_code(code)?;
        }
        if let Some(breed) = &self.breed {
            validate_required("breed", breed)?;
        }
        if let Some(Some(w)) = self.weight_kg {
            validate_quantity("weight_kg", w)?;
        }
        if let Some(Some(id)) = &self.mother_id {
            validate_uuid("mother_id", id)?;
        }
        if let Some(Some(id)) = &self.father_id {
            validate_uuid("father_id", id)?;
        }
        validate_patch_text("name", &self.name)?;
        validate_patch_text("photo_uri", &self.photo_uri)?;
        validate_patch_text("notes", &self.notes)?;
        Ok(())
    }
}

// =============================================================================
// Production
// =============================================================================

/// Daily milk production of one animal. One live row per (animal, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Production {
    pub id: String,
    pub animal_id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub morning_liters: f64,
    pub evening_liters: f64,
    /// Always `morning_liters + evening_liters`, computed at write time.
    pub total_liters: f64,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    pub synced: bool,
    pub remote_id: Option<String>,
    pub deleted: bool,
}

impl_record!(Production, EntityKind::Production);

/// Derived daily total.
#[inline]
pub fn total_liters(morning: f64, evening: f64) -> f64 {
    morning + evening
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduction {
    pub animal_id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    #[serde(default)]
    pub morning_liters: f64,
    #[serde(default)]
    pub evening_liters: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewProduction {
    pub fn new(animal_id: impl Into<String>, date: NaiveDate, morning: f64, evening: f64) -> Self {
        NewProduction {
            animal_id: animal_id.into(),
            date,
            morning_liters: morning,
            evening_liters: evening,
            notes: None,
        }
    }

    pub fn total_liters(&self) -> f64 {
        total_liters(self.morning_liters, self.evening_liters)
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_uuid("animal_id", &self.animal_id)?;
        validate_quantity("morning_liters", self.morning_liters)?;
        validate_quantity("evening_liters", self.evening_liters)?;
        if let Some(notes) = &self.notes {
            validate_text("notes", notes)?;
        }
        Ok(())
    }
}

/// Partial update of a [`Production`] row. `total_liters` is never patched
/// directly; it is recomputed from whichever sessions are supplied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductionPatch {
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub morning_liters: Option<f64>,
    #[serde(default)]
    pub evening_liters: Option<f64>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<String>")]
    pub notes: Option<Option<String>>,
}

impl ProductionPatch {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.morning_liters.is_none()
            && self.evening_liters.is_none()
            && self.notes.is_none()
    }

    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(m) = self.morning_liters {
            validate_quantity("morning_liters", m)?;
        }
        if let Some(e) = self.evening_liters {
            validate_quantity("evening_liters", e)?;
        }
        validate_patch_text("notes", &self.notes)
    }
}

/// A production row joined with the owning animal's code and name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductionWithAnimal {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    #[ts(flatten)]
    pub production: Production,
    pub animal_code: String,
    pub animal_name: Option<String>,
}

// =============================================================================
// Treatment
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Treatment {
    pub id: String,
    pub animal_id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub kind: TreatmentKind,
    pub medication: Option<String>,
    pub dose: Option<String>,
    pub cost_cents: i64,
    pub veterinarian: Option<String>,
    /// Follow-up date (booster, re-check).
    #[ts(as = "Option<String>")]
    pub next_date: Option<NaiveDate>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    pub synced: bool,
    pub remote_id: Option<String>,
    pub deleted: bool,
}

impl_record!(Treatment, EntityKind::Treatments);

impl Treatment {
    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewTreatment {
    pub animal_id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub kind: TreatmentKind,
    #[serde(default)]
    pub medication: Option<String>,
    #[serde(default)]
    pub dose: Option<String>,
    #[serde(default)]
    pub cost_cents: i64,
    #[serde(default)]
    pub veterinarian: Option<String>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub next_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewTreatment {
    pub fn new(animal_id: impl Into<String>, date: NaiveDate, kind: TreatmentKind) -> Self {
        NewTreatment {
            animal_id: animal_id.into(),
            date,
            kind,
            medication: None,
            dose: None,
            cost_cents: 0,
            veterinarian: None,
            next_date: None,
            notes: None,
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_uuid("animal_id", &self.animal_id)?;
        validate_cost_cents("cost_cents", self.cost_cents)?;
        for (field, value) in [
            ("medication", &self.medication),
            ("dose", &self.dose),
            ("veterinarian", &self.veterinarian),
            ("notes", &self.notes),
        ] {
            if let Some(text) = value {
                validate_text(field, text)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TreatmentPatch {
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub kind: Option<TreatmentKind>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<String>")]
    pub medication: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<String>")]
    pub dose: Option<Option<String>>,
    #[serde(default)]
    pub cost_cents: Option<i64>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<String>")]
    pub veterinarian: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<String>")]
    pub next_date: Option<Option<NaiveDate>>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<String>")]
    pub notes: Option<Option<String>>,
}

impl TreatmentPatch {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.kind.is_none()
            && self.medication.is_none()
            && self.dose.is_none()
            && self.cost_cents.is_none()
            && self.veterinarian.is_none()
            && self.next_date.is_none()
            && self.notes.is_none()
    }

    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(cost) = self.cost_cents {
            validate_cost_cents("cost_cents", cost)?;
        }
        validate_patch_text("medication", &self.medication)?;
        validate_patch_text("dose", &self.dose)?;
        validate_patch_text("veterinarian", &self.veterinarian)?;
        validate_patch_text("notes", &self.notes)
    }
}

/// A treatment joined with the treated animal's code and name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TreatmentWithAnimal {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    #[ts(flatten)]
    pub treatment: Treatment,
    pub animal_code: String,
    pub animal_name: Option<String>,
}

// =============================================================================
// Reproductive Event
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ReproductiveEvent {
    pub id: String,
    pub animal_id: String,
    pub kind: ReproductiveEventKind,
    #[ts(as = "String")]
    pub date: NaiveDate,
    /// Sire used for natural mating.
    pub bull_id: Option<String>,
    /// Semen straw reference for insemination.
    pub straw: Option<String>,
    pub outcome: Option<EventOutcome>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    pub synced: bool,
    pub remote_id: Option<String>,
    pub deleted: bool,
}

impl_record!(ReproductiveEvent, EntityKind::ReproductiveEvents);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewReproductiveEvent {
    pub animal_id: String,
    pub kind: ReproductiveEventKind,
    #[ts(as = "String")]
    pub date: NaiveDate,
    #[serde(default)]
    pub bull_id: Option<String>,
    #[serde(default)]
    pub straw: Option<String>,
    #[serde(default)]
    pub outcome: Option<EventOutcome>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewReproductiveEvent {
    pub fn new(animal_id: impl Into<String>, kind: ReproductiveEventKind, date: NaiveDate) -> Self {
        NewReproductiveEvent {
            animal_id: animal_id.into(),
            kind,
            date,
            bull_id: None,
            straw: None,
            outcome: None,
            notes: None,
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_uuid("animal_id", &self.animal_id)?;
        if let Some(id) = &self.bull_id {
            validate_uuid("bull_id", id)?;
        }
        if let Some(straw) = &self.straw {
            validate_text("straw", straw)?;
        }
        if let Some(notes) = &self.notes {
            validate_text("notes", notes)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReproductiveEventPatch {
    #[serde(default)]
    pub kind: Option<ReproductiveEventKind>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<String>")]
    pub bull_id: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<String>")]
    pub straw: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<EventOutcome>")]
    pub outcome: Option<Option<EventOutcome>>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<String>")]
    pub notes: Option<Option<String>>,
}

impl ReproductiveEventPatch {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.date.is_none()
            && self.bull_id.is_none()
            && self.straw.is_none()
            && self.outcome.is_none()
            && self.notes.is_none()
    }

    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(Some(id)) = &self.bull_id {
            validate_uuid("bull_id", id)?;
        }
        validate_patch_text("straw", &self.straw)?;
        validate_patch_text("notes", &self.notes)
    }
}

// =============================================================================
// Animal Event
// =============================================================================

/// Free-form history entry for an animal (weighing, move, observation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct AnimalEvent {
    pub id: String,
    pub animal_id: String,
    pub kind: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub description: String,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    pub synced: bool,
    pub remote_id: Option<String>,
    pub deleted: bool,
}

impl_record!(AnimalEvent, EntityKind::AnimalEvents);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewAnimalEvent {
    pub animal_id: String,
    pub kind: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub description: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewAnimalEvent {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_uuid("animal_id", &self.animal_id)?;
        validate_required("kind", &self.kind)?;
        validate_required("description", &self.description)?;
        if let Some(notes) = &self.notes {
            validate_text("notes", notes)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AnimalEventPatch {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "double_option")]
    #[ts(optional = nullable, as = "Option<String>")]
    pub notes: Option<Option<String>>,
}

impl AnimalEventPatch {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.date.is_none() && self.description.is_none() && self.notes.is_none()
    }

    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(kind) = &self.kind {
            validate_required("kind", kind)?;
        }
        if let Some(description) = &self.description {
            validate_required("description", description)?;
        }
        validate_patch_text("notes", &self.notes)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
