//! HTML roster report generator.
//!
//! Produces a self-contained HTML file with all CSS/JS inlined.

use anyhow::{Context, Result};
use std::path::Path;

use gradebook_core::report::{RosterReport, StudentAverageEntry};
use gradebook_core::statistics::summarize_roster;

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

/// Generate an HTML page for a roster report.
///
/// `max_grade` scales the bar chart and the pass/fail colouring.
pub fn generate_html(report: &RosterReport, max_grade: f64) -> String {
    let summary = summarize_roster(report);
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>gradebook roster: {}</title>\n",
        html_escape(&report.class_name)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    html.push_str("<header>\n");
    html.push_str(&format!("<h1>{}</h1>\n", html_escape(&report.class_name)));
    html.push_str(&format!(
        "<p class=\"meta\">Class <strong>{}</strong> | {} averaging | {} students | {} units | {}</p>\n",
        html_escape(&report.class_id),
        report.averaging_mode,
        report.student_averages.len(),
        report.units.len(),
        report.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    // Summary
    html.push_str("<section class=\"dashboard\">\n");
    html.push_str("<h2>Summary</h2>\n");
    html.push_str("<table class=\"summary\">\n");
    html.push_str("<thead><tr><th>Class mean</th><th>Highest</th><th>Lowest</th><th>Computed</th><th>Failed</th></tr></thead>\n");
    html.push_str(&format!(
        "<tbody><tr><td>{:.2}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr></tbody>\n",
        summary.class_mean,
        fmt_opt(summary.highest),
        fmt_opt(summary.lowest),
        summary.computed,
        summary.failed,
    ));
    html.push_str("</table>\n");

    if !summary.unit_means.is_empty() {
        html.push_str("<table class=\"units\">\n");
        html.push_str("<thead><tr><th>Unit</th><th>Mode</th><th>Mean</th></tr></thead>\n<tbody>\n");
        for (unit, mean) in report.units.iter().zip(&summary.unit_means) {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{:.2}</td></tr>\n",
                html_escape(&unit.unit_name),
                unit.averaging_mode,
                mean.mean
            ));
        }
        html.push_str("</tbody></table>\n");
    }

    if summary.computed > 0 {
        html.push_str(&generate_bar_chart(&report.student_averages, max_grade));
    }
    html.push_str("</section>\n");

    // Per-student averages
    html.push_str("<section class=\"results\">\n");
    html.push_str("<h2>Students</h2>\n");
    html.push_str("<table class=\"results-table\" id=\"results\">\n<thead><tr>");
    let mut columns = vec!["Registration".to_string(), "Student".to_string()];
    columns.extend(report.units.iter().map(|u| html_escape(&u.unit_name)));
    columns.push("Average".to_string());
    for (i, column) in columns.iter().enumerate() {
        html.push_str(&format!("<th onclick=\"sortTable({i})\">{column}</th>"));
    }
    html.push_str("</tr></thead>\n<tbody>\n");

    for entry in &report.student_averages {
        html.push_str(&student_row(entry, report, max_grade));
    }

    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(report).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}

fn student_row(entry: &StudentAverageEntry, report: &RosterReport, max_grade: f64) -> String {
    let mut row = String::new();
    let cells = format!(
        "<td>{}</td><td>{}</td>",
        html_escape(&entry.registration),
        html_escape(&entry.student_name)
    );

    match (entry.average(), entry.error()) {
        (Some(average), _) => {
            row.push_str(&format!("<tr class=\"{}\">{cells}", grade_class(average, max_grade)));
            for unit in &report.units {
                row.push_str(&format!(
                    "<td>{}</td>",
                    fmt_opt(entry.unit_average(&unit.unit_id))
                ));
            }
            row.push_str(&format!("<td><strong>{average:.2}</strong></td></tr>\n"));
        }
        (None, message) => {
            row.push_str(&format!(
                "<tr class=\"error\">{cells}<td colspan=\"{}\">{}</td></tr>\n",
                report.units.len() + 1,
                html_escape(message.unwrap_or("average could not be computed"))
            ));
        }
    }
    row
}

fn grade_class(average: f64, max_grade: f64) -> &'static str {
    let ratio = if max_grade > 0.0 { average / max_grade } else { 0.0 };
    if ratio >= 0.7 {
        "pass"
    } else if ratio >= 0.5 {
        "warn"
    } else {
        "fail"
    }
}

/// Write an HTML report to a file.
pub fn write_html_report(report: &RosterReport, max_grade: f64, path: &Path) -> Result<()> {
    let html = generate_html(report, max_grade);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write HTML report to {}", path.display()))?;
    Ok(())
}

fn generate_bar_chart(students: &[StudentAverageEntry], max_grade: f64) -> String {
    let bar_height = 24;
    let max_width = 400;
    let padding = 8;
    let label_width = 200;

    let bars: Vec<(&str, f64)> = students
        .iter()
        .filter_map(|s| s.average().map(|a| (s.student_name.as_str(), a)))
        .collect();

    let total_height = bars.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 60,
        total_height
    );

    for (i, (name, average)) in bars.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let ratio = if max_grade > 0.0 {
            (average / max_grade).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let width = (ratio * max_width as f64) as usize;

        let color = match grade_class(*average, max_grade) {
            "pass" => "#22c55e",
            "warn" => "#eab308",
            _ => "#ef4444",
        };

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"14\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(name)
        ));
        svg.push_str(&format!(
            "  <rect x=\"{label_width}\" y=\"{y}\" width=\"{width}\" height=\"{bar_height}\" fill=\"{color}\" rx=\"4\"/>\n"
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{:.2}</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            average
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --warn: #fef9c3; --fail: #fde2e2; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --warn: #713f12; --fail: #7f1d1d; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); cursor: pointer; }
.pass { background: var(--pass); }
.warn { background: var(--warn); }
.fail { background: var(--fail); }
tr.error td { background: var(--fail); font-style: italic; }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;

const JS: &str = r#"
function sortTable(col) {
  const table = document.getElementById('results');
  const tbody = table.querySelector('tbody');
  const rows = Array.from(tbody.querySelectorAll('tr'));
  const asc = table.dataset.sortCol == col && table.dataset.sortDir == 'asc' ? false : true;
  const key = (row) => {
    const cell = row.cells[col];
    const text = cell ? cell.textContent : '';
    const num = parseFloat(text);
    return isNaN(num) ? text : num;
  };
  rows.sort((a, b) => {
    const va = key(a);
    const vb = key(b);
    const cmp = typeof va === 'number' && typeof vb === 'number' ? va - vb : String(va).localeCompare(String(vb));
    return asc ? cmp : -cmp;
  });
  table.dataset.sortCol = col;
  table.dataset.sortDir = asc ? 'asc' : 'desc';
  rows.forEach(r => tbody.appendChild(r));
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use gradebook_core::error::ErrorKind;
    use gradebook_core::model::AveragingMode;
    use gradebook_core::report::{StudentOutcome, UnitSummary};
    use gradebook_core::results::UnitAverageResult;

    fn unit_result(id: &str, average: f64) -> UnitAverageResult {
        UnitAverageResult {
            unit_id: id.into(),
            unit_name: id.to_uppercase(),
            averaging_mode: AveragingMode::Simple,
            average,
            item_grades: vec![],
        }
    }

    fn make_test_report() -> RosterReport {
        RosterReport {
            id: uuid::Uuid::nil(),
            created_at: chrono::Utc::now(),
            class_id: "math".into(),
            class_name: "Mathematics <A>".into(),
            averaging_mode: AveragingMode::Simple,
            units: vec![
                UnitSummary {
                    unit_id: "u1".into(),
                    unit_name: "Algebra".into(),
                    averaging_mode: AveragingMode::Simple,
                },
                UnitSummary {
                    unit_id: "u2".into(),
                    unit_name: "Geometry".into(),
                    averaging_mode: AveragingMode::Personalized,
                },
            ],
            student_averages: vec![
                StudentAverageEntry {
                    student_id: "s1".into(),
                    student_name: "Ana".into(),
                    registration: "2024001".into(),
                    outcome: StudentOutcome::Ok {
                        average: 6.75,
                        unit_averages: vec![unit_result("u1", 7.0), unit_result("u2", 6.5)],
                    },
                },
                StudentAverageEntry {
                    student_id: "s2".into(),
                    student_name: "Bruno".into(),
                    registration: "2024002".into(),
                    outcome: StudentOutcome::Error {
                        kind: ErrorKind::Formula,
                        message: "division by zero".into(),
                    },
                },
            ],
            duration_ms: 12,
        }
    }

    #[test]
    fn html_report_contains_required_elements() {
        let html = generate_html(&make_test_report(), 10.0);

        assert!(html.contains("<html"));
        assert!(html.contains("</html>"));
        assert!(html.contains("Mathematics &lt;A&gt;"));
        assert!(html.contains("Algebra"));
        assert!(html.contains("Geometry"));
        assert!(html.contains("6.75"));
        assert!(html.contains("<svg"));
    }

    #[test]
    fn failed_students_render_as_error_rows() {
        let html = generate_html(&make_test_report(), 10.0);
        assert!(html.contains("<tr class=\"error\">"));
        assert!(html.contains("division by zero"));
        assert!(html.contains("colspan=\"3\""));
    }

    #[test]
    fn grade_classes_scale_with_max_grade() {
        assert_eq!(grade_class(7.0, 10.0), "pass");
        assert_eq!(grade_class(7.0, 20.0), "fail");
        assert_eq!(grade_class(11.0, 20.0), "warn");
    }

    #[test]
    fn html_report_write_to_file() {
        let report = make_test_report();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("roster.html");

        write_html_report(&report, 10.0, &path).unwrap();
        assert!(path.exists());

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Bruno"));
    }
}
