//! In-memory gradebook store.
//!
//! Reads go through the [`GradebookStore`] trait. Writes are validated so the
//! engine only ever sees data that satisfies the gradebook invariants:
//! parents exist, names and registrations are unique where required, grades
//! are in range and never cross classes.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use gradebook_core::error::EntityKind;
use gradebook_core::formula::Formula;
use gradebook_core::model::{
    validate_averaging, AveragingMode, Class, EvaluationItem, Grade, Student, Unit,
};
use gradebook_core::traits::GradebookStore;

use crate::error::StoreError;

/// Upper bound for grade values unless configured otherwise.
pub const DEFAULT_MAX_GRADE: f64 = 10.0;

#[derive(Debug, Default)]
struct Tables {
    classes: Vec<Class>,
    units: Vec<Unit>,
    items: Vec<EvaluationItem>,
    students: Vec<Student>,
    grades: Vec<Grade>,
}

impl Tables {
    fn class(&self, id: &str) -> Option<&Class> {
        self.classes.iter().find(|c| c.id == id)
    }

    fn unit(&self, id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    fn item(&self, id: &str) -> Option<&EvaluationItem> {
        self.items.iter().find(|i| i.id == id)
    }

    fn student(&self, id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }

    fn check_grade(&self, grade: &Grade, max_grade: f64) -> Result<(), StoreError> {
        if !(0.0..=max_grade).contains(&grade.value) {
            return Err(StoreError::GradeOutOfRange {
                value: grade.value,
                max: max_grade,
            });
        }
        let student = self
            .student(&grade.student_id)
            .ok_or_else(|| not_found(EntityKind::Student, &grade.student_id))?;
        let item = self
            .item(&grade.evaluation_item_id)
            .ok_or_else(|| not_found(EntityKind::EvaluationItem, &grade.evaluation_item_id))?;
        let unit = self
            .unit(&item.unit_id)
            .ok_or_else(|| not_found(EntityKind::Unit, &item.unit_id))?;
        if unit.class_id != student.class_id {
            return Err(StoreError::CrossClassGrade {
                student_id: student.id.clone(),
                student_class: student.class_id.clone(),
                item_id: item.id.clone(),
                item_class: unit.class_id.clone(),
            });
        }
        Ok(())
    }

    fn put_grade(&mut self, grade: Grade) {
        match self.grades.iter_mut().find(|g| {
            g.student_id == grade.student_id && g.evaluation_item_id == grade.evaluation_item_id
        }) {
            Some(existing) => *existing = grade,
            None => self.grades.push(grade),
        }
    }
}

/// A gradebook kept entirely in memory.
#[derive(Debug)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    max_grade: f64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_max_grade(DEFAULT_MAX_GRADE)
    }

    /// Create a store accepting grades in `0..=max_grade`.
    pub fn with_max_grade(max_grade: f64) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            max_grade,
        }
    }

    pub fn max_grade(&self) -> f64 {
        self.max_grade
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_class(&self, class: Class) -> Result<(), StoreError> {
        check_averaging(class.averaging_mode, class.formula.as_deref())?;
        let mut tables = self.write();
        if tables.class(&class.id).is_some() {
            return Err(duplicate(EntityKind::Class, &class.id));
        }
        tables.classes.push(class);
        Ok(())
    }

    /// Change how a class combines its unit averages.
    pub fn set_class_averaging(
        &self,
        class_id: &str,
        mode: AveragingMode,
        formula: Option<String>,
    ) -> Result<(), StoreError> {
        check_averaging(mode, formula.as_deref())?;
        let mut tables = self.write();
        let class = tables
            .classes
            .iter_mut()
            .find(|c| c.id == class_id)
            .ok_or_else(|| not_found(EntityKind::Class, class_id))?;
        class.averaging_mode = mode;
        class.formula = formula;
        Ok(())
    }

    /// Add a unit to an existing class.
    ///
    /// A new unit has no items yet, so it must start in simple mode.
    pub fn add_unit(&self, unit: Unit) -> Result<(), StoreError> {
        if unit.averaging_mode == AveragingMode::Personalized {
            return Err(StoreError::FormulaWithoutItems(unit.id));
        }
        check_averaging(unit.averaging_mode, unit.formula.as_deref())?;
        let mut tables = self.write();
        if tables.class(&unit.class_id).is_none() {
            return Err(not_found(EntityKind::Class, &unit.class_id));
        }
        if tables.unit(&unit.id).is_some() {
            return Err(duplicate(EntityKind::Unit, &unit.id));
        }
        tables.units.push(unit);
        Ok(())
    }

    /// Change how a unit combines its item grades.
    pub fn set_unit_averaging(
        &self,
        unit_id: &str,
        mode: AveragingMode,
        formula: Option<String>,
    ) -> Result<(), StoreError> {
        check_averaging(mode, formula.as_deref())?;
        let mut tables = self.write();
        if tables.unit(unit_id).is_none() {
            return Err(not_found(EntityKind::Unit, unit_id));
        }
        if mode == AveragingMode::Personalized && !tables.items.iter().any(|i| i.unit_id == unit_id)
        {
            return Err(StoreError::FormulaWithoutItems(unit_id.to_string()));
        }
        if let Some(unit) = tables.units.iter_mut().find(|u| u.id == unit_id) {
            unit.averaging_mode = mode;
            unit.formula = formula;
        }
        Ok(())
    }

    pub fn add_item(&self, item: EvaluationItem) -> Result<(), StoreError> {
        let mut tables = self.write();
        if tables.unit(&item.unit_id).is_none() {
            return Err(not_found(EntityKind::Unit, &item.unit_id));
        }
        if tables.item(&item.id).is_some() {
            return Err(duplicate(EntityKind::EvaluationItem, &item.id));
        }
        if tables
            .items
            .iter()
            .any(|i| i.unit_id == item.unit_id && i.name == item.name)
        {
            return Err(StoreError::DuplicateItemName {
                unit_id: item.unit_id,
                name: item.name,
            });
        }
        tables.items.push(item);
        Ok(())
    }

    /// Delete an evaluation item and every grade given on it.
    ///
    /// Returns the number of grades removed.
    pub fn delete_item(&self, item_id: &str) -> Result<usize, StoreError> {
        let mut tables = self.write();
        let before = tables.items.len();
        tables.items.retain(|i| i.id != item_id);
        if tables.items.len() == before {
            return Err(not_found(EntityKind::EvaluationItem, item_id));
        }
        let grades_before = tables.grades.len();
        tables.grades.retain(|g| g.evaluation_item_id != item_id);
        let removed = grades_before - tables.grades.len();
        tracing::debug!(item_id, removed, "deleted evaluation item");
        Ok(removed)
    }

    pub fn add_student(&self, student: Student) -> Result<(), StoreError> {
        let mut tables = self.write();
        if tables.class(&student.class_id).is_none() {
            return Err(not_found(EntityKind::Class, &student.class_id));
        }
        if tables.student(&student.id).is_some() {
            return Err(duplicate(EntityKind::Student, &student.id));
        }
        if tables
            .students
            .iter()
            .any(|s| s.class_id == student.class_id && s.registration == student.registration)
        {
            return Err(StoreError::DuplicateRegistration {
                class_id: student.class_id,
                registration: student.registration,
            });
        }
        tables.students.push(student);
        Ok(())
    }

    /// Create or replace the grade for a (student, item) pair.
    pub fn upsert_grade(&self, grade: Grade) -> Result<(), StoreError> {
        let mut tables = self.write();
        tables.check_grade(&grade, self.max_grade)?;
        tables.put_grade(grade);
        Ok(())
    }

    /// Upsert a batch of grades. Either every grade is stored or none is.
    pub fn upsert_grades(&self, grades: Vec<Grade>) -> Result<usize, StoreError> {
        if grades.is_empty() {
            return Err(StoreError::EmptyBatch);
        }
        let mut tables = self.write();
        for grade in &grades {
            tables.check_grade(grade, self.max_grade)?;
        }
        let count = grades.len();
        for grade in grades {
            tables.put_grade(grade);
        }
        Ok(count)
    }

    /// Total number of stored grades.
    pub fn grade_count(&self) -> usize {
        self.read().grades.len()
    }
}

#[async_trait]
impl GradebookStore for InMemoryStore {
    async fn find_class(&self, id: &str) -> anyhow::Result<Option<Class>> {
        Ok(self.read().class(id).cloned())
    }

    async fn find_units_by_class(&self, class_id: &str) -> anyhow::Result<Vec<Unit>> {
        Ok(self
            .read()
            .units
            .iter()
            .filter(|u| u.class_id == class_id)
            .cloned()
            .collect())
    }

    async fn find_unit(&self, id: &str) -> anyhow::Result<Option<Unit>> {
        Ok(self.read().unit(id).cloned())
    }

    async fn find_items_by_unit(&self, unit_id: &str) -> anyhow::Result<Vec<EvaluationItem>> {
        Ok(self
            .read()
            .items
            .iter()
            .filter(|i| i.unit_id == unit_id)
            .cloned()
            .collect())
    }

    async fn find_students_by_class(&self, class_id: &str) -> anyhow::Result<Vec<Student>> {
        Ok(self
            .read()
            .students
            .iter()
            .filter(|s| s.class_id == class_id)
            .cloned()
            .collect())
    }

    async fn find_student(&self, id: &str) -> anyhow::Result<Option<Student>> {
        Ok(self.read().student(id).cloned())
    }

    async fn find_grades_by_student_and_unit(
        &self,
        student_id: &str,
        unit_id: &str,
    ) -> anyhow::Result<Vec<Grade>> {
        let tables = self.read();
        Ok(tables
            .grades
            .iter()
            .filter(|g| g.student_id == student_id)
            .filter(|g| {
                tables
                    .item(&g.evaluation_item_id)
                    .is_some_and(|i| i.unit_id == unit_id)
            })
            .cloned()
            .collect())
    }
}

fn check_averaging(mode: AveragingMode, formula: Option<&str>) -> Result<(), StoreError> {
    validate_averaging(mode, formula).map_err(StoreError::InvalidAveraging)?;
    if let Some(text) = formula.filter(|f| !f.trim().is_empty()) {
        Formula::parse(text)?;
    }
    Ok(())
}

fn not_found(entity: EntityKind, id: &str) -> StoreError {
    StoreError::NotFound {
        entity,
        id: id.to_string(),
    }
}

fn duplicate(entity: EntityKind, id: &str) -> StoreError {
    StoreError::DuplicateId {
        entity,
        id: id.to_string(),
    }
}
