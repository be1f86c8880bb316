//! gradebook-core: Grade aggregation engine and formula evaluator.
//!
//! This crate defines the gradebook data model, the store trait, the
//! arithmetic formula language, and the engine that turns grades into unit
//! and class averages.

pub mod binding;
pub mod class_average;
pub mod engine;
pub mod error;
pub mod formula;
pub mod lexer;
pub mod model;
pub mod ranking;
pub mod report;
pub mod results;
pub mod statistics;
pub mod traits;
pub mod unit_average;

pub use engine::{EngineConfig, FormulaCheck, GradeEngine, NoopReporter, ProgressReporter};
pub use error::{EngineError, ErrorKind, FormulaError};
pub use formula::{evaluate, Formula};
