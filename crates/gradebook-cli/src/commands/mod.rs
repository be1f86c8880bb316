//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use gradebook_core::GradeEngine;
use gradebook_store::{load_dataset, GradebookConfig};

pub mod averages;
pub mod compare;
pub mod formula;
pub mod init;
pub mod top;
pub mod validate;

/// Load a dataset into a fresh in-memory store and wrap it in an engine.
pub(crate) fn load_engine(dataset: &Path, config: &GradebookConfig) -> Result<GradeEngine> {
    let store = load_dataset(dataset)?
        .into_store(config.max_grade)
        .with_context(|| format!("failed to load dataset: {}", dataset.display()))?;
    Ok(GradeEngine::new(Arc::new(store), config.engine_config()))
}
