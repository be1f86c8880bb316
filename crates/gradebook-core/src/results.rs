//! Result types produced by the average calculators.

use serde::{Deserialize, Serialize};

use crate::model::AveragingMode;

/// One evaluation item of a unit and the student's grade on it, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemGrade {
    pub item_id: String,
    pub item_name: String,
    /// `None` when the student has no grade for this item.
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// A student's average for one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitAverageResult {
    pub unit_id: String,
    pub unit_name: String,
    pub averaging_mode: AveragingMode,
    /// Rounded to two decimals.
    pub average: f64,
    /// Items in unit order.
    pub item_grades: Vec<ItemGrade>,
}

impl UnitAverageResult {
    /// Number of items the student actually has a grade for.
    pub fn graded_count(&self) -> usize {
        self.item_grades.iter().filter(|g| g.value.is_some()).count()
    }
}

/// A student's average for a whole class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassAverageResult {
    pub class_id: String,
    pub student_id: String,
    pub averaging_mode: AveragingMode,
    /// Rounded to two decimals.
    pub average: f64,
    /// Units in class order.
    pub unit_averages: Vec<UnitAverageResult>,
}

impl ClassAverageResult {
    /// The average for one unit, if the class has it.
    pub fn unit_average(&self, unit_id: &str) -> Option<f64> {
        self.unit_averages
            .iter()
            .find(|u| u.unit_id == unit_id)
            .map(|u| u.average)
    }
}
