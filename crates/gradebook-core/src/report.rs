//! Roster report types with JSON persistence and change detection.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, ErrorKind};
use crate::model::AveragingMode;
use crate::results::UnitAverageResult;

/// Class-wide averages for every student of a class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    pub class_id: String,
    pub class_name: String,
    pub averaging_mode: AveragingMode,
    /// Units of the class, in order.
    pub units: Vec<UnitSummary>,
    /// One entry per student, in student creation order.
    pub student_averages: Vec<StudentAverageEntry>,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// A unit column of the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSummary {
    pub unit_id: String,
    pub unit_name: String,
    pub averaging_mode: AveragingMode,
}

/// One student's row of the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentAverageEntry {
    pub student_id: String,
    pub student_name: String,
    pub registration: String,
    #[serde(flatten)]
    pub outcome: StudentOutcome,
}

/// Either the computed averages or the reason they could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StudentOutcome {
    Ok {
        average: f64,
        unit_averages: Vec<UnitAverageResult>,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

impl StudentOutcome {
    pub(crate) fn from_error(err: &EngineError) -> Self {
        StudentOutcome::Error {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl StudentAverageEntry {
    /// The class average, if it was computed.
    pub fn average(&self) -> Option<f64> {
        match &self.outcome {
            StudentOutcome::Ok { average, .. } => Some(*average),
            StudentOutcome::Error { .. } => None,
        }
    }

    /// The average for one unit, if it was computed.
    pub fn unit_average(&self, unit_id: &str) -> Option<f64> {
        match &self.outcome {
            StudentOutcome::Ok { unit_averages, .. } => unit_averages
                .iter()
                .find(|u| u.unit_id == unit_id)
                .map(|u| u.average),
            StudentOutcome::Error { .. } => None,
        }
    }

    /// The failure message, if the computation failed.
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            StudentOutcome::Ok { .. } => None,
            StudentOutcome::Error { message, .. } => Some(message),
        }
    }
}

impl RosterReport {
    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: RosterReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Students whose computation failed.
    pub fn failures(&self) -> impl Iterator<Item = &StudentAverageEntry> {
        self.student_averages.iter().filter(|s| s.average().is_none())
    }

    /// Compare this report against an earlier snapshot of the same class.
    ///
    /// Students are matched by id. Only students with a computed average in
    /// both reports are compared; a change larger than `threshold` (in grade
    /// points) is a drop or a rise.
    pub fn compare(&self, baseline: &RosterReport, threshold: f64) -> ChangeReport {
        let baseline_map: HashMap<&str, &StudentAverageEntry> = baseline
            .student_averages
            .iter()
            .map(|s| (s.student_id.as_str(), s))
            .collect();
        let current_ids: std::collections::HashSet<&str> = self
            .student_averages
            .iter()
            .map(|s| s.student_id.as_str())
            .collect();

        let mut drops = Vec::new();
        let mut rises = Vec::new();
        let mut unchanged = 0usize;
        let mut new_students = 0usize;
        let mut not_comparable = 0usize;

        for current in &self.student_averages {
            let Some(previous) = baseline_map.get(current.student_id.as_str()) else {
                new_students += 1;
                continue;
            };
            let (Some(before), Some(after)) = (previous.average(), current.average()) else {
                not_comparable += 1;
                continue;
            };
            let delta = after - before;
            let change = AverageChange {
                student_id: current.student_id.clone(),
                student_name: current.student_name.clone(),
                baseline_average: before,
                current_average: after,
                delta,
            };
            if delta < -threshold {
                drops.push(change);
            } else if delta > threshold {
                rises.push(change);
            } else {
                unchanged += 1;
            }
        }

        let removed_students = baseline
            .student_averages
            .iter()
            .filter(|s| !current_ids.contains(s.student_id.as_str()))
            .count();

        ChangeReport {
            drops,
            rises,
            unchanged,
            new_students,
            removed_students,
            not_comparable,
        }
    }
}

/// Result of comparing two roster reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeReport {
    /// Students whose average went down.
    pub drops: Vec<AverageChange>,
    /// Students whose average went up.
    pub rises: Vec<AverageChange>,
    /// Students with no significant change.
    pub unchanged: usize,
    /// Students in current but not baseline.
    pub new_students: usize,
    /// Students in baseline but not current.
    pub removed_students: usize,
    /// Students present in both but failed in at least one.
    pub not_comparable: usize,
}

/// A change in one student's class average.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AverageChange {
    pub student_id: String,
    pub student_name: String,
    pub baseline_average: f64,
    pub current_average: f64,
    pub delta: f64,
}

impl ChangeReport {
    /// Format the change report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "**Summary:** {} drops, {} rises, {} unchanged\n\n",
            self.drops.len(),
            self.rises.len(),
            self.unchanged
        ));

        for (title, changes) in [("Drops", &self.drops), ("Rises", &self.rises)] {
            if changes.is_empty() {
                continue;
            }
            md.push_str(&format!("### {title}\n\n"));
            md.push_str("| Student | Name | Baseline | Current | Delta |\n");
            md.push_str("|---------|------|----------|---------|-------|\n");
            for c in changes {
                md.push_str(&format!(
                    "| {} | {} | {:.2} | {:.2} | {:+.2} |\n",
                    c.student_id, c.student_name, c.baseline_average, c.current_average, c.delta
                ));
            }
            md.push('\n');
        }

        md
    }

    /// Returns true if any student's average dropped.
    pub fn has_drops(&self) -> bool {
        !self.drops.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, average: Option<f64>) -> StudentAverageEntry {
        StudentAverageEntry {
            student_id: id.into(),
            student_name: format!("Student {id}"),
            registration: format!("R-{id}"),
            outcome: match average {
                Some(average) => StudentOutcome::Ok {
                    average,
                    unit_averages: vec![],
                },
                None => StudentOutcome::Error {
                    kind: ErrorKind::Formula,
                    message: "formula error".into(),
                },
            },
        }
    }

    fn make_report(entries: Vec<StudentAverageEntry>) -> RosterReport {
        RosterReport {
            id: Uuid::nil(),
            created_at: Utc::now(),
            class_id: "c1".into(),
            class_name: "Math".into(),
            averaging_mode: AveragingMode::Simple,
            units: vec![],
            student_averages: entries,
            duration_ms: 0,
        }
    }

    #[test]
    fn compare_identical_reports() {
        let baseline = make_report(vec![entry("s1", Some(7.0))]);
        let current = make_report(vec![entry("s1", Some(7.0))]);

        let report = current.compare(&baseline, 0.1);
        assert!(report.drops.is_empty());
        assert!(report.rises.is_empty());
        assert_eq!(report.unchanged, 1);
    }

    #[test]
    fn compare_with_drop_and_rise() {
        let baseline = make_report(vec![entry("s1", Some(8.0)), entry("s2", Some(5.0))]);
        let current = make_report(vec![entry("s1", Some(6.5)), entry("s2", Some(5.5))]);

        let report = current.compare(&baseline, 0.25);
        assert_eq!(report.drops.len(), 1);
        assert_eq!(report.drops[0].student_id, "s1");
        assert!((report.drops[0].delta + 1.5).abs() < 1e-9);
        assert_eq!(report.rises.len(), 1);
        assert!(report.has_drops());
    }

    #[test]
    fn compare_with_new_removed_and_failed() {
        let baseline = make_report(vec![entry("old", Some(6.0)), entry("s1", Some(6.0))]);
        let current = make_report(vec![entry("new", Some(6.0)), entry("s1", None)]);

        let report = current.compare(&baseline, 0.1);
        assert_eq!(report.new_students, 1);
        assert_eq!(report.removed_students, 1);
        assert_eq!(report.not_comparable, 1);
    }

    #[test]
    fn json_roundtrip_keeps_error_entries() {
        let report = make_report(vec![entry("s1", Some(7.5)), entry("s2", None)]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("roster.json");

        report.save_json(&path).unwrap();
        let loaded = RosterReport::load_json(&path).unwrap();

        assert_eq!(loaded.class_id, "c1");
        assert_eq!(loaded.student_averages, report.student_averages);
        assert_eq!(loaded.failures().count(), 1);
    }

    #[test]
    fn entry_serializes_status_inline() {
        let json = serde_json::to_value(entry("s2", None)).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["kind"], "formula");
        assert_eq!(json["student_id"], "s2");

        let json = serde_json::to_value(entry("s1", Some(9.0))).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["average"], 9.0);
    }

    #[test]
    fn markdown_output() {
        let baseline = make_report(vec![entry("s1", Some(8.0))]);
        let current = make_report(vec![entry("s1", Some(5.0))]);

        let md = current.compare(&baseline, 0.1).to_markdown();
        assert!(md.contains("Drops"));
        assert!(md.contains("s1"));
        assert!(md.contains("-3.00"));
    }
}
