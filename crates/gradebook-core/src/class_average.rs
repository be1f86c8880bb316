//! Class average calculation for one student.

use crate::binding::bind_units;
use crate::error::{EngineError, FormulaScope};
use crate::formula::Formula;
use crate::model::{configured_formula, AveragingMode, Class};
use crate::results::{ClassAverageResult, UnitAverageResult};
use crate::statistics::{round2, simple_mean};

/// Combine a student's unit averages into a class average.
///
/// Every unit counts in simple mode, including units that averaged to `0`.
/// A formula failure is returned as an error; there is no fallback to the
/// simple mean.
pub fn compute_class_average(
    student_id: &str,
    class: &Class,
    unit_averages: Vec<UnitAverageResult>,
) -> Result<ClassAverageResult, EngineError> {
    let raw = if unit_averages.is_empty() {
        0.0
    } else {
        match class.averaging_mode {
            AveragingMode::Simple => simple_mean(unit_averages.iter().map(|u| u.average)),
            AveragingMode::Personalized => {
                let text = configured_formula(&class.formula).ok_or_else(|| {
                    EngineError::BadRequest(format!(
                        "class '{}' uses personalized averaging but has no formula",
                        class.id
                    ))
                })?;
                let formula_error = |source| EngineError::Formula {
                    student_id: student_id.to_string(),
                    scope: FormulaScope::Class {
                        class_id: class.id.clone(),
                    },
                    formula: text.to_string(),
                    source,
                };
                let formula = Formula::parse(text).map_err(formula_error)?;
                let bindings = bind_units(unit_averages.iter().map(|u| u.average));
                formula.evaluate(&bindings).map_err(formula_error)?
            }
        }
    };

    tracing::debug!(
        student_id,
        class_id = %class.id,
        mode = %class.averaging_mode,
        units = unit_averages.len(),
        raw,
        "computed class average"
    );

    Ok(ClassAverageResult {
        class_id: class.id.clone(),
        student_id: student_id.to_string(),
        averaging_mode: class.averaging_mode,
        average: round2(raw),
        unit_averages,
    })
}
