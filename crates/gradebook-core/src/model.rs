//! Core data model types for gradebook.
//!
//! Classes own units, units own evaluation items, and grades link a student
//! to an evaluation item of the same class.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a unit or class combines its sub-scores into one average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AveragingMode {
    /// Arithmetic mean of the present sub-scores.
    #[default]
    Simple,
    /// Teacher-supplied formula over bound sub-score variables.
    Personalized,
}

impl fmt::Display for AveragingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AveragingMode::Simple => write!(f, "simple"),
            AveragingMode::Personalized => write!(f, "personalized"),
        }
    }
}

impl FromStr for AveragingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simple" => Ok(AveragingMode::Simple),
            "personalized" | "personalised" | "formula" => Ok(AveragingMode::Personalized),
            other => Err(format!("unknown averaging mode: {other}")),
        }
    }
}

/// Check the averaging rule: a formula is present (and non-blank) exactly
/// when the mode is `Personalized`.
pub fn validate_averaging(mode: AveragingMode, formula: Option<&str>) -> Result<(), String> {
    let has_formula = formula.is_some_and(|f| !f.trim().is_empty());
    match (mode, has_formula) {
        (AveragingMode::Personalized, false) => {
            Err("a formula is required for personalized averaging".into())
        }
        (AveragingMode::Simple, true) => {
            Err("a formula is only allowed for personalized averaging".into())
        }
        _ => Ok(()),
    }
}

/// A class taught by one teacher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub id: String,
    pub name: String,
    /// Owner; only this teacher may compute averages for the class.
    pub teacher_id: String,
    #[serde(default)]
    pub averaging_mode: AveragingMode,
    #[serde(default)]
    pub formula: Option<String>,
}

/// A group of evaluation items inside a class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub class_id: String,
    pub name: String,
    #[serde(default)]
    pub averaging_mode: AveragingMode,
    #[serde(default)]
    pub formula: Option<String>,
}

/// One scored component of a unit (e.g. "Test 1").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationItem {
    pub id: String,
    pub unit_id: String,
    /// Unique within the owning unit.
    pub name: String,
}

/// A student's score on one evaluation item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub student_id: String,
    pub evaluation_item_id: String,
    pub value: f64,
    #[serde(default)]
    pub comment: Option<String>,
}

/// A student enrolled in one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub class_id: String,
    pub name: String,
    /// Unique within the owning class.
    pub registration: String,
}

/// Formula text for a unit or class, if any.
pub(crate) fn configured_formula(formula: &Option<String>) -> Option<&str> {
    formula
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averaging_mode_display_and_parse() {
        assert_eq!(AveragingMode::Simple.to_string(), "simple");
        assert_eq!(AveragingMode::Personalized.to_string(), "personalized");
        assert_eq!(
            "Personalized".parse::<AveragingMode>().unwrap(),
            AveragingMode::Personalized
        );
        assert_eq!(
            "formula".parse::<AveragingMode>().unwrap(),
            AveragingMode::Personalized
        );
        assert!("weighted".parse::<AveragingMode>().is_err());
    }

    #[test]
    fn averaging_rule() {
        assert!(validate_averaging(AveragingMode::Simple, None).is_ok());
        assert!(validate_averaging(AveragingMode::Personalized, Some("N1")).is_ok());
        assert!(validate_averaging(AveragingMode::Personalized, None).is_err());
        assert!(validate_averaging(AveragingMode::Personalized, Some("  ")).is_err());
        assert!(validate_averaging(AveragingMode::Simple, Some("N1")).is_err());
        // A blank formula on a simple unit is the same as none.
        assert!(validate_averaging(AveragingMode::Simple, Some("")).is_ok());
    }

    #[test]
    fn unit_serde_defaults_to_simple() {
        let json = r#"{"id":"u1","class_id":"c1","name":"Unit 1"}"#;
        let unit: Unit = serde_json::from_str(json).unwrap();
        assert_eq!(unit.averaging_mode, AveragingMode::Simple);
        assert!(unit.formula.is_none());
    }

    #[test]
    fn configured_formula_ignores_blank() {
        assert_eq!(configured_formula(&Some(" N1 ".into())), Some("N1"));
        assert_eq!(configured_formula(&Some("   ".into())), None);
        assert_eq!(configured_formula(&None), None);
    }
}
