//! Rounding, means, and roster-level summary statistics.

use serde::{Deserialize, Serialize};

use crate::report::RosterReport;

/// Round to two decimals, ties away from zero (`8.455` -> `8.46`).
///
/// The scaled value is first snapped to six decimals so that inputs like
/// `1.005`, whose binary form sits just below the tie, still round up.
pub fn round2(value: f64) -> f64 {
    let scaled = value * 100.0;
    let snapped = (scaled * 1e6).round() / 1e6;
    snapped.round() / 100.0
}

/// Arithmetic mean, `0` for an empty input.
pub fn simple_mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0f64, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Class-wide figures derived from a roster report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterSummary {
    /// Mean of the computed student averages.
    pub class_mean: f64,
    pub highest: Option<f64>,
    pub lowest: Option<f64>,
    /// Students with a computed average.
    pub computed: usize,
    /// Students whose computation failed.
    pub failed: usize,
    pub unit_means: Vec<UnitMean>,
}

/// Mean of one unit's averages across the computed students.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitMean {
    pub unit_id: String,
    pub unit_name: String,
    pub mean: f64,
}

/// Summarize a roster. Failed students are counted but excluded from means.
pub fn summarize_roster(report: &RosterReport) -> RosterSummary {
    let averages: Vec<f64> = report
        .student_averages
        .iter()
        .filter_map(|s| s.average())
        .collect();

    let highest = averages.iter().copied().reduce(f64::max);
    let lowest = averages.iter().copied().reduce(f64::min);

    let unit_means = report
        .units
        .iter()
        .map(|unit| {
            let mean = simple_mean(
                report
                    .student_averages
                    .iter()
                    .filter_map(|s| s.unit_average(&unit.unit_id)),
            );
            UnitMean {
                unit_id: unit.unit_id.clone(),
                unit_name: unit.unit_name.clone(),
                mean: round2(mean),
            }
        })
        .collect();

    RosterSummary {
        class_mean: round2(simple_mean(averages.iter().copied())),
        highest,
        lowest,
        computed: averages.len(),
        failed: report.student_averages.len() - averages.len(),
        unit_means,
    }
}
