//! The `gradebook top` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use gradebook_store::config::load_config_from;

use super::load_engine;

pub async fn execute(
    dataset: PathBuf,
    teacher: String,
    class: String,
    count: Option<usize>,
    unit: Option<String>,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let engine = load_engine(&dataset, &config)?;
    let count = count.unwrap_or(config.default_top_count);

    let ranked = engine
        .top_students(&teacher, &class, count, unit.as_deref())
        .await?;

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&ranked)?),
        _ => {
            let mut table = Table::new();
            table.set_header(vec!["Rank", "Registration", "Student", "Average"]);
            for r in &ranked {
                table.add_row(vec![
                    Cell::new(r.rank),
                    Cell::new(&r.registration),
                    Cell::new(&r.student_name),
                    Cell::new(format!("{:.2}", r.average)),
                ]);
            }
            match &unit {
                Some(unit) => println!("Top {count} of class '{class}' by unit '{unit}'"),
                None => println!("Top {count} of class '{class}'"),
            }
            println!("{table}");
        }
    }

    Ok(())
}
