//! The `gradebook averages` command.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use comfy_table::{Cell, Table};

use gradebook_core::engine::ProgressReporter;
use gradebook_core::error::EngineError;
use gradebook_core::report::{RosterReport, StudentAverageEntry};
use gradebook_core::results::{ClassAverageResult, UnitAverageResult};
use gradebook_core::statistics::summarize_roster;
use gradebook_report::html::write_html_report;
use gradebook_store::config::load_config_from;

use super::load_engine;

/// Console progress reporter.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_student_start(&self, student_id: &str) {
        tracing::debug!("starting {student_id}");
    }

    fn on_student_complete(&self, entry: &StudentAverageEntry) {
        if let Some(average) = entry.average() {
            eprintln!("  Done: {} ({}) {average:.2}", entry.student_name, entry.student_id);
        }
    }

    fn on_student_error(&self, student_id: &str, error: &EngineError) {
        eprintln!("  ERROR: {student_id}: {error}");
    }

    fn on_roster_complete(&self, total: usize, completed: usize, failed: usize, elapsed: Duration) {
        eprintln!(
            "\nComplete: {completed}/{total} computed, {failed} failed ({:.3}s)",
            elapsed.as_secs_f64()
        );
    }
}

pub struct AveragesArgs {
    pub dataset: PathBuf,
    pub teacher: String,
    pub class: Option<String>,
    pub student: Option<String>,
    pub unit: Option<String>,
    pub format: String,
    pub save: bool,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

pub async fn execute(args: AveragesArgs) -> Result<()> {
    anyhow::ensure!(
        matches!(args.format.as_str(), "table" | "json"),
        "unknown format '{}': expected table or json",
        args.format
    );

    let config = load_config_from(args.config.as_deref())?;
    let engine = load_engine(&args.dataset, &config)?;
    let json = args.format == "json";

    match (&args.student, &args.unit, &args.class) {
        (Some(student), Some(unit), _) => {
            let result = engine
                .compute_unit_average(&args.teacher, student, unit)
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_unit(&result);
            }
        }
        (None, Some(_), _) => {
            anyhow::bail!("--unit requires --student; use `gradebook top --unit` to rank a unit")
        }
        (Some(student), None, Some(class)) => {
            let result = engine
                .compute_class_average(&args.teacher, student, class)
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_class(&result);
            }
        }
        (None, None, Some(class)) => {
            let report = engine
                .compute_all_averages(&args.teacher, class, &ConsoleReporter)
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_roster(&report);
            }

            if args.save {
                let output = args.output.unwrap_or_else(|| config.output_dir.clone());
                std::fs::create_dir_all(&output)?;
                let timestamp = report.created_at.format("%Y-%m-%dT%H%M%S");
                let stem = format!("roster-{}-{timestamp}", report.class_id);

                let json_path = output.join(format!("{stem}.json"));
                report.save_json(&json_path)?;
                eprintln!("Roster saved to: {}", json_path.display());

                let html_path = output.join(format!("{stem}.html"));
                write_html_report(&report, config.max_grade, &html_path)?;
                eprintln!("HTML report: {}", html_path.display());
            }
        }
        (_, None, None) => anyhow::bail!("--class is required unless --unit is given"),
    }

    Ok(())
}

fn print_unit(result: &UnitAverageResult) {
    let mut table = Table::new();
    table.set_header(vec!["#", "Item", "Grade", "Comment"]);
    for (i, grade) in result.item_grades.iter().enumerate() {
        table.add_row(vec![
            Cell::new(format!("N{}", i + 1)),
            Cell::new(&grade.item_name),
            Cell::new(grade.value.map_or("-".to_string(), |v| format!("{v:.2}"))),
            Cell::new(grade.comment.as_deref().unwrap_or("")),
        ]);
    }

    println!("{table}");
    println!(
        "{} ({} averaging): {:.2}",
        result.unit_name, result.averaging_mode, result.average
    );
}

fn print_class(result: &ClassAverageResult) {
    let mut table = Table::new();
    table.set_header(vec!["#", "Unit", "Mode", "Graded", "Average"]);
    for (i, unit) in result.unit_averages.iter().enumerate() {
        table.add_row(vec![
            Cell::new(format!("u{}", i + 1)),
            Cell::new(&unit.unit_name),
            Cell::new(unit.averaging_mode),
            Cell::new(format!("{}/{}", unit.graded_count(), unit.item_grades.len())),
            Cell::new(format!("{:.2}", unit.average)),
        ]);
    }

    println!("{table}");
    println!(
        "Class average for {} ({} averaging): {:.2}",
        result.student_id, result.averaging_mode, result.average
    );
}

fn print_roster(report: &RosterReport) {
    let mut table = Table::new();
    let mut header = vec!["Registration".to_string(), "Student".to_string()];
    header.extend(report.units.iter().map(|u| u.unit_name.clone()));
    header.push("Average".to_string());
    table.set_header(header);

    for entry in &report.student_averages {
        let mut row = vec![
            Cell::new(&entry.registration),
            Cell::new(&entry.student_name),
        ];
        match entry.error() {
            None => {
                for unit in &report.units {
                    row.push(Cell::new(
                        entry
                            .unit_average(&unit.unit_id)
                            .map_or("-".to_string(), |v| format!("{v:.2}")),
                    ));
                }
                row.push(Cell::new(
                    entry.average().map_or("-".to_string(), |v| format!("{v:.2}")),
                ));
            }
            Some(message) => {
                for _ in &report.units {
                    row.push(Cell::new("-"));
                }
                row.push(Cell::new(format!("ERROR: {message}")));
            }
        }
        table.add_row(row);
    }

    let summary = summarize_roster(report);
    println!("{} ({})", report.class_name, report.class_id);
    println!("{table}");
    println!(
        "Class mean: {:.2} | computed: {} | failed: {}",
        summary.class_mean, summary.computed, summary.failed
    );
}
