//! Engine error types.
//!
//! `FormulaError` covers failures of a single formula evaluation. `EngineError`
//! is what every engine operation returns; it wraps formula failures with the
//! student and unit/class they happened for so the message is actionable.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while tokenizing, parsing, or evaluating a formula.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// The formula references a name that has no binding.
    #[error("unknown variable '{name}'")]
    UnknownVariable { name: String },

    /// A division whose right-hand side evaluated to zero.
    #[error("division by zero")]
    DivisionByZero,

    /// The formula text is not a valid arithmetic expression.
    #[error("syntax error at position {position}: {message}")]
    SyntaxError { position: usize, message: String },

    /// The result overflowed to infinity or NaN.
    #[error("result is not a finite number")]
    NonFinite,
}

impl FormulaError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        FormulaError::SyntaxError {
            position,
            message: message.into(),
        }
    }
}

/// Kinds of entities the engine looks up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Class,
    Unit,
    EvaluationItem,
    Student,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Class => write!(f, "class"),
            EntityKind::Unit => write!(f, "unit"),
            EntityKind::EvaluationItem => write!(f, "evaluation item"),
            EntityKind::Student => write!(f, "student"),
        }
    }
}

/// Where a failing formula lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "lowercase")]
pub enum FormulaScope {
    Unit { unit_id: String },
    Class { class_id: String },
}

impl fmt::Display for FormulaScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaScope::Unit { unit_id } => write!(f, "unit '{unit_id}'"),
            FormulaScope::Class { class_id } => write!(f, "class '{class_id}'"),
        }
    }
}

impl FormulaScope {
    fn noun(&self) -> &'static str {
        match self {
            FormulaScope::Unit { .. } => "unit",
            FormulaScope::Class { .. } => "class",
        }
    }
}

/// Errors returned by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A referenced entity does not exist.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: EntityKind, id: String },

    /// The caller does not own the class, or the student is not in it.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A teacher-supplied formula failed for one student.
    #[error("formula error for student '{student_id}' in {scope}: {source} (formula: \"{formula}\"); check the {}'s formula", .scope.noun())]
    Formula {
        student_id: String,
        scope: FormulaScope,
        formula: String,
        #[source]
        source: FormulaError,
    },

    /// The request cannot be served as stated.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A per-unit or per-student computation exceeded its time budget.
    #[error("computation for student '{student_id}' timed out after {timeout_ms}ms")]
    Timeout { student_id: String, timeout_ms: u64 },

    /// The backing store failed.
    #[error("store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

/// Serializable classification of an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Formula,
    BadRequest,
    Timeout,
    Store,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Formula => "formula",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Store => "store",
        };
        f.write_str(s)
    }
}

impl EngineError {
    pub(crate) fn not_found(entity: EntityKind, id: &str) -> Self {
        EngineError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::NotFound { .. } => ErrorKind::NotFound,
            EngineError::Forbidden(_) => ErrorKind::Forbidden,
            EngineError::Formula { .. } => ErrorKind::Formula,
            EngineError::BadRequest(_) => ErrorKind::BadRequest,
            EngineError::Timeout { .. } => ErrorKind::Timeout,
            EngineError::Store(_) => ErrorKind::Store,
        }
    }

    /// Returns `true` if repeating the call with the same data cannot succeed.
    pub fn is_permanent(&self) -> bool {
        !matches!(self, EngineError::Store(_) | EngineError::Timeout { .. })
    }

    /// The underlying formula failure, if this is a formula error.
    pub fn formula_error(&self) -> Option<&FormulaError> {
        match self {
            EngineError::Formula { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formula_error_message_names_student_and_scope() {
        let err = EngineError::Formula {
            student_id: "s1".into(),
            scope: FormulaScope::Unit {
                unit_id: "u2".into(),
            },
            formula: "N1/N2".into(),
            source: FormulaError::DivisionByZero,
        };
        let msg = err.to_string();
        assert!(msg.contains("student 's1'"), "got: {msg}");
        assert!(msg.contains("unit 'u2'"), "got: {msg}");
        assert!(msg.contains("N1/N2"), "got: {msg}");
        assert!(msg.contains("check the unit's formula"), "got: {msg}");
        assert_eq!(err.kind(), ErrorKind::Formula);
        assert!(err.is_permanent());
    }

    #[test]
    fn store_errors_are_transient() {
        let err = EngineError::from(anyhow::anyhow!("connection reset"));
        assert_eq!(err.kind(), ErrorKind::Store);
        assert!(!err.is_permanent());
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn not_found_message() {
        let err = EngineError::not_found(EntityKind::EvaluationItem, "i9");
        assert_eq!(err.to_string(), "evaluation item 'i9' not found");
    }

    #[test]
    fn error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::BadRequest).unwrap();
        assert_eq!(json, "\"bad_request\"");
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
    }
}
