//! TOML dataset files.
//!
//! A dataset describes classes with their units, evaluation items, students
//! and grades. It can be checked with [`validate_dataset`] and loaded into an
//! [`InMemoryStore`] through the store's validated writes.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use gradebook_core::binding::{item_variable_names, unit_variable_names};
use gradebook_core::formula::Formula;
use gradebook_core::model::{
    validate_averaging, AveragingMode, Class, EvaluationItem, Grade, Student, Unit,
};

use crate::error::StoreError;
use crate::memory::InMemoryStore;

/// Parsed contents of a dataset file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub classes: Vec<DatasetClass>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetClass {
    pub id: String,
    pub name: String,
    pub teacher_id: String,
    #[serde(default)]
    pub averaging_mode: AveragingMode,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub units: Vec<DatasetUnit>,
    #[serde(default)]
    pub students: Vec<DatasetStudent>,
    #[serde(default)]
    pub grades: Vec<DatasetGrade>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetUnit {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub averaging_mode: AveragingMode,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub items: Vec<DatasetItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetItem {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStudent {
    pub id: String,
    pub name: String,
    pub registration: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetGrade {
    #[serde(rename = "student")]
    pub student_id: String,
    #[serde(rename = "item")]
    pub item_id: String,
    pub value: f64,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Read and parse a dataset file.
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset file: {}", path.display()))?;

    parse_dataset_str(&content, path)
}

/// Parse dataset TOML (useful for testing).
pub fn parse_dataset_str(content: &str, source_path: &Path) -> Result<Dataset> {
    toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))
}

impl Dataset {
    pub fn class(&self, id: &str) -> Option<&DatasetClass> {
        self.classes.iter().find(|c| c.id == id)
    }

    /// Load every record into a fresh store accepting grades up to `max_grade`.
    ///
    /// Units are created in simple mode and switched to their configured mode
    /// once their items exist.
    pub fn into_store(&self, max_grade: f64) -> Result<InMemoryStore, StoreError> {
        let store = InMemoryStore::with_max_grade(max_grade);

        for class in &self.classes {
            store.add_class(Class {
                id: class.id.clone(),
                name: class.name.clone(),
                teacher_id: class.teacher_id.clone(),
                averaging_mode: class.averaging_mode,
                formula: class.formula.clone(),
            })?;

            for unit in &class.units {
                store.add_unit(Unit {
                    id: unit.id.clone(),
                    class_id: class.id.clone(),
                    name: unit.name.clone(),
                    averaging_mode: AveragingMode::Simple,
                    formula: None,
                })?;
                for item in &unit.items {
                    store.add_item(EvaluationItem {
                        id: item.id.clone(),
                        unit_id: unit.id.clone(),
                        name: item.name.clone(),
                    })?;
                }
                if unit.averaging_mode != AveragingMode::Simple || unit.formula.is_some() {
                    store.set_unit_averaging(&unit.id, unit.averaging_mode, unit.formula.clone())?;
                }
            }

            for student in &class.students {
                store.add_student(Student {
                    id: student.id.clone(),
                    class_id: class.id.clone(),
                    name: student.name.clone(),
                    registration: student.registration.clone(),
                })?;
            }

            if !class.grades.is_empty() {
                store.upsert_grades(
                    class
                        .grades
                        .iter()
                        .map(|g| Grade {
                            student_id: g.student_id.clone(),
                            evaluation_item_id: g.item_id.clone(),
                            value: g.value,
                            comment: g.comment.clone(),
                        })
                        .collect(),
                )?;
            }
        }

        tracing::debug!(
            classes = self.classes.len(),
            grades = store.grade_count(),
            "dataset loaded into store"
        );
        Ok(store)
    }
}

/// A warning from dataset validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// Where the problem is, e.g. `class 'math' / unit 'u1'`.
    pub location: String,
    /// Warning message.
    pub message: String,
}

/// Validate a dataset for problems that would make loading or averaging fail.
pub fn validate_dataset(dataset: &Dataset, max_grade: f64) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let mut warn = |location: String, message: String| {
        warnings.push(ValidationWarning { location, message })
    };

    let mut class_ids = HashSet::new();
    let mut unit_ids = HashSet::new();
    let mut item_ids = HashSet::new();
    let mut student_ids = HashSet::new();

    for class in &dataset.classes {
        let class_loc = format!("class '{}'", class.id);
        if !class_ids.insert(class.id.as_str()) {
            warn(class_loc.clone(), format!("duplicate class ID: {}", class.id));
        }
        if let Err(e) = validate_averaging(class.averaging_mode, class.formula.as_deref()) {
            warn(class_loc.clone(), e);
        }
        if let Some(text) = &class.formula {
            if let Some(message) = check_formula(text, &unit_variable_names(class.units.len())) {
                warn(class_loc.clone(), message);
            }
        }

        // Item id -> owning unit, for grade checks below.
        let mut class_items: HashMap<&str, &str> = HashMap::new();

        for unit in &class.units {
            let unit_loc = format!("{class_loc} / unit '{}'", unit.id);
            if !unit_ids.insert(unit.id.as_str()) {
                warn(unit_loc.clone(), format!("duplicate unit ID: {}", unit.id));
            }
            if unit.items.is_empty() {
                warn(
                    unit_loc.clone(),
                    "unit has no evaluation items; its average is always 0".into(),
                );
            }
            if let Err(e) = validate_averaging(unit.averaging_mode, unit.formula.as_deref()) {
                warn(unit_loc.clone(), e);
            }
            if let Some(text) = &unit.formula {
                let available = item_variable_names(unit.items.iter().map(|i| i.name.as_str()));
                if let Some(message) = check_formula(text, &available) {
                    warn(unit_loc.clone(), message);
                }
            }

            let mut names = HashSet::new();
            for item in &unit.items {
                if !item_ids.insert(item.id.as_str()) {
                    warn(unit_loc.clone(), format!("duplicate item ID: {}", item.id));
                }
                if !names.insert(item.name.as_str()) {
                    warn(unit_loc.clone(), format!("duplicate item name: {}", item.name));
                }
                class_items.insert(item.id.as_str(), unit.id.as_str());
            }
        }

        let mut registrations = HashSet::new();
        let mut class_students = HashSet::new();
        for student in &class.students {
            if !student_ids.insert(student.id.as_str()) {
                warn(class_loc.clone(), format!("duplicate student ID: {}", student.id));
            }
            if !registrations.insert(student.registration.as_str()) {
                warn(
                    class_loc.clone(),
                    format!("duplicate registration: {}", student.registration),
                );
            }
            class_students.insert(student.id.as_str());
        }

        let mut graded = HashSet::new();
        for grade in &class.grades {
            let grade_loc = format!("{class_loc} / grade {}:{}", grade.student_id, grade.item_id);
            if !class_students.contains(grade.student_id.as_str()) {
                warn(
                    grade_loc.clone(),
                    format!("student '{}' is not in this class", grade.student_id),
                );
            }
            if !class_items.contains_key(grade.item_id.as_str()) {
                warn(
                    grade_loc.clone(),
                    format!("evaluation item '{}' is not in this class", grade.item_id),
                );
            }
            if !(0.0..=max_grade).contains(&grade.value) {
                warn(
                    grade_loc.clone(),
                    format!("grade {} is outside the range 0..={max_grade}", grade.value),
                );
            }
            if !graded.insert((grade.student_id.as_str(), grade.item_id.as_str())) {
                warn(grade_loc, "duplicate grade; the last one wins".into());
            }
        }
    }

    warnings
}

/// Syntax or binding problem with a formula, if any.
fn check_formula(text: &str, available: &BTreeSet<String>) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }
    let formula = match Formula::parse(text) {
        Ok(formula) => formula,
        Err(e) => return Some(format!("formula \"{text}\" does not parse: {e}")),
    };
    let unknown: Vec<&str> = formula
        .variables()
        .into_iter()
        .filter(|name| !available.contains(*name))
        .collect();
    if unknown.is_empty() {
        None
    } else {
        Some(format!(
            "formula \"{text}\" references variables that can never be bound: {}",
            unknown.join(", ")
        ))
    }
}
