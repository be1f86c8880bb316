//! Top-performer ranking over a roster report.

use serde::{Deserialize, Serialize};

use crate::report::{RosterReport, StudentAverageEntry};

/// A student's position in a ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedStudent {
    /// 1-based position.
    pub rank: usize,
    pub student_id: String,
    pub student_name: String,
    pub registration: String,
    pub average: f64,
}

/// Rank students by class average, or by one unit's average when `unit_id`
/// is given, highest first. Ties keep roster order. Students whose averages
/// could not be computed are left out. At most `count` students are returned.
pub fn rank_students(
    report: &RosterReport,
    count: usize,
    unit_id: Option<&str>,
) -> Vec<RankedStudent> {
    let mut scored: Vec<(&StudentAverageEntry, f64)> = report
        .student_averages
        .iter()
        .filter_map(|entry| {
            let average = match unit_id {
                Some(unit_id) => entry.unit_average(unit_id),
                None => entry.average(),
            };
            average.map(|a| (entry, a))
        })
        .collect();

    // `sort_by` is stable, so equal averages stay in roster order.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    scored
        .into_iter()
        .take(count)
        .enumerate()
        .map(|(i, (entry, average))| RankedStudent {
            rank: i + 1,
            student_id: entry.student_id.clone(),
            student_name: entry.student_name.clone(),
            registration: entry.registration.clone(),
            average,
        })
        .collect()
}
