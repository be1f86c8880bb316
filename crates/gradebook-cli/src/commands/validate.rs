//! The `gradebook validate` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use gradebook_store::config::load_config_from;
use gradebook_store::dataset::{load_dataset, validate_dataset};

pub fn execute(dataset_path: PathBuf, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let dataset = load_dataset(&dataset_path)?;

    for class in &dataset.classes {
        let items: usize = class.units.iter().map(|u| u.items.len()).sum();
        println!(
            "Class: {} ({} units, {} items, {} students, {} grades)",
            class.name,
            class.units.len(),
            items,
            class.students.len(),
            class.grades.len()
        );
    }

    let warnings = validate_dataset(&dataset, config.max_grade);
    for w in &warnings {
        println!("  [{}] WARNING: {}", w.location, w.message);
    }

    if warnings.is_empty() {
        dataset
            .into_store(config.max_grade)
            .context("dataset does not load")?;
        println!("Dataset valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
