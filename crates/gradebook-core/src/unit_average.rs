//! Unit average calculation for one student.
//!
//! Works on already-loaded records; existence and ownership checks happen in
//! the engine before this runs.

use std::collections::HashMap;

use crate::binding::bind_items;
use crate::error::{EngineError, FormulaScope};
use crate::formula::Formula;
use crate::model::{configured_formula, AveragingMode, EvaluationItem, Grade, Unit};
use crate::results::{ItemGrade, UnitAverageResult};
use crate::statistics::{round2, simple_mean};

/// Compute a student's average for `unit`.
///
/// `grades` may contain grades of other students or for items outside the
/// unit; those are ignored. A unit with no items averages to `0`.
///
/// Simple mode averages only the items that have a grade. Personalized mode
/// evaluates the unit formula with ungraded items bound to `0`.
pub fn compute_unit_average(
    student_id: &str,
    unit: &Unit,
    items: &[EvaluationItem],
    grades: &[Grade],
) -> Result<UnitAverageResult, EngineError> {
    if items.is_empty() {
        return Ok(UnitAverageResult {
            unit_id: unit.id.clone(),
            unit_name: unit.name.clone(),
            averaging_mode: unit.averaging_mode,
            average: 0.0,
            item_grades: Vec::new(),
        });
    }

    let by_item: HashMap<&str, &Grade> = grades
        .iter()
        .filter(|g| g.student_id == student_id)
        .map(|g| (g.evaluation_item_id.as_str(), g))
        .collect();

    let item_grades: Vec<ItemGrade> = items
        .iter()
        .map(|item| {
            let grade = by_item.get(item.id.as_str());
            ItemGrade {
                item_id: item.id.clone(),
                item_name: item.name.clone(),
                value: grade.map(|g| g.value),
                comment: grade.and_then(|g| g.comment.clone()),
            }
        })
        .collect();

    let raw = match unit.averaging_mode {
        AveragingMode::Simple => simple_mean(item_grades.iter().filter_map(|g| g.value)),
        AveragingMode::Personalized => {
            let text = configured_formula(&unit.formula).ok_or_else(|| {
                EngineError::BadRequest(format!(
                    "unit '{}' uses personalized averaging but has no formula",
                    unit.id
                ))
            })?;
            let formula_error = |source| EngineError::Formula {
                student_id: student_id.to_string(),
                scope: FormulaScope::Unit {
                    unit_id: unit.id.clone(),
                },
                formula: text.to_string(),
                source,
            };
            let formula = Formula::parse(text).map_err(formula_error)?;
            let bindings = bind_items(
                item_grades
                    .iter()
                    .map(|g| (g.item_name.as_str(), g.value)),
            );
            formula.evaluate(&bindings).map_err(formula_error)?
        }
    };

    tracing::debug!(
        student_id,
        unit_id = %unit.id,
        mode = %unit.averaging_mode,
        raw,
        "computed unit average"
    );

    Ok(UnitAverageResult {
        unit_id: unit.id.clone(),
        unit_name: unit.name.clone(),
        averaging_mode: unit.averaging_mode,
        average: round2(raw),
        item_grades,
    })
}
