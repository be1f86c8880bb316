//! The `gradebook compare` command.

use std::path::PathBuf;

use anyhow::Result;

use gradebook_core::report::RosterReport;

pub fn execute(
    baseline_path: PathBuf,
    current_path: PathBuf,
    threshold: f64,
    fail_on_drop: bool,
    format: String,
) -> Result<()> {
    anyhow::ensure!(threshold >= 0.0, "threshold must not be negative");

    let baseline = RosterReport::load_json(&baseline_path)?;
    let current = RosterReport::load_json(&current_path)?;

    if baseline.class_id != current.class_id {
        eprintln!(
            "Warning: comparing different classes ('{}' vs '{}')",
            baseline.class_id, current.class_id
        );
    }

    let report = current.compare(&baseline, threshold);

    match format.as_str() {
        "markdown" | "md" => {
            println!("{}", report.to_markdown());
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            println!(
                "Comparison: {} drops, {} rises, {} unchanged",
                report.drops.len(),
                report.rises.len(),
                report.unchanged
            );

            for (title, changes) in [("Drops", &report.drops), ("Rises", &report.rises)] {
                if changes.is_empty() {
                    continue;
                }
                println!("\n{title}:");
                for c in changes {
                    println!(
                        "  {} ({}) {:.2} -> {:.2} ({:+.2})",
                        c.student_id, c.student_name, c.baseline_average, c.current_average, c.delta
                    );
                }
            }

            if report.new_students > 0 {
                println!("\n{} new student(s)", report.new_students);
            }
            if report.removed_students > 0 {
                println!("{} removed student(s)", report.removed_students);
            }
            if report.not_comparable > 0 {
                println!("{} student(s) failed in one of the reports", report.not_comparable);
            }
        }
    }

    if fail_on_drop && report.has_drops() {
        std::process::exit(1);
    }

    Ok(())
}
