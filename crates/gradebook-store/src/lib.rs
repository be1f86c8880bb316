//! gradebook-store: Collaborators for the grade engine.
//!
//! An in-memory store with validated writes, TOML dataset loading and
//! validation, and the gradebook configuration layer.

pub mod config;
pub mod dataset;
pub mod error;
pub mod memory;

pub use config::{load_config_from, GradebookConfig};
pub use dataset::{load_dataset, validate_dataset, Dataset, ValidationWarning};
pub use error::StoreError;
pub use memory::InMemoryStore;
