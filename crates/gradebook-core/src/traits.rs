//! Store trait consumed by the engine.
//!
//! The engine only reads. Writes, ownership of persistence, and cascade
//! deletes belong to whoever implements this trait (see `gradebook-store`).

use async_trait::async_trait;

use crate::model::{Class, EvaluationItem, Grade, Student, Unit};

/// Read-only access to the gradebook records the engine aggregates.
///
/// List methods return records in creation order; the engine relies on that
/// order for `N{i}` variable positions and for ranking tie-breaks.
#[async_trait]
pub trait GradebookStore: Send + Sync {
    /// Look up a class by id.
    async fn find_class(&self, class_id: &str) -> anyhow::Result<Option<Class>>;

    /// Units of a class, in order.
    async fn find_units_by_class(&self, class_id: &str) -> anyhow::Result<Vec<Unit>>;

    /// Look up a unit by id.
    async fn find_unit(&self, unit_id: &str) -> anyhow::Result<Option<Unit>>;

    /// Evaluation items of a unit, in order.
    async fn find_items_by_unit(&self, unit_id: &str) -> anyhow::Result<Vec<EvaluationItem>>;

    /// Students of a class, in creation order.
    async fn find_students_by_class(&self, class_id: &str) -> anyhow::Result<Vec<Student>>;

    /// Look up a student by id.
    async fn find_student(&self, student_id: &str) -> anyhow::Result<Option<Student>>;

    /// Every grade the student has for items of the given unit.
    async fn find_grades_by_student_and_unit(
        &self,
        student_id: &str,
        unit_id: &str,
    ) -> anyhow::Result<Vec<Grade>>;
}
