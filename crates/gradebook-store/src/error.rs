//! Store error types.

use gradebook_core::error::{EntityKind, FormulaError};
use thiserror::Error;

/// Errors raised by validated writes to the in-memory store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced parent record does not exist.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: EntityKind, id: String },

    /// A record with this id already exists.
    #[error("{entity} '{id}' already exists")]
    DuplicateId { entity: EntityKind, id: String },

    /// Item names are unique within a unit.
    #[error("unit '{unit_id}' already has an evaluation item named '{name}'")]
    DuplicateItemName { unit_id: String, name: String },

    /// Registrations are unique within a class.
    #[error("class '{class_id}' already has a student with registration '{registration}'")]
    DuplicateRegistration {
        class_id: String,
        registration: String,
    },

    /// Grade value outside the accepted range.
    #[error("grade {value} is outside the range 0..={max}")]
    GradeOutOfRange { value: f64, max: f64 },

    /// The student and the evaluation item belong to different classes.
    #[error(
        "student '{student_id}' of class '{student_class}' cannot be graded on \
         item '{item_id}' of class '{item_class}'"
    )]
    CrossClassGrade {
        student_id: String,
        student_class: String,
        item_id: String,
        item_class: String,
    },

    /// Mode and formula disagree.
    #[error("invalid averaging configuration: {0}")]
    InvalidAveraging(String),

    /// Formulas can only be assigned to units that already have items.
    #[error("unit '{0}' has no evaluation items; add one before assigning a formula")]
    FormulaWithoutItems(String),

    /// The formula does not parse.
    #[error("invalid formula: {0}")]
    InvalidFormula(#[from] FormulaError),

    /// A batch upsert with nothing in it.
    #[error("grade batch is empty")]
    EmptyBatch,
}
