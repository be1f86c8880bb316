//! Roster snapshot comparison tests.
//!
//! Computes a roster, saves it, changes grades, recomputes, and checks that
//! the comparison reports the students whose averages moved.

use std::sync::Arc;

use gradebook_core::engine::{EngineConfig, GradeEngine, NoopReporter};
use gradebook_core::model::Grade;
use gradebook_core::report::RosterReport;
use gradebook_core::statistics::summarize_roster;
use gradebook_store::dataset::load_dataset;

fn grade(student_id: &str, item_id: &str, value: f64) -> Grade {
    Grade {
        student_id: student_id.into(),
        evaluation_item_id: item_id.into(),
        value,
        comment: None,
    }
}

#[tokio::test]
async fn grade_changes_show_up_as_drops_and_rises() {
    let dataset = load_dataset("../../datasets/school.toml".as_ref()).unwrap();
    let store = Arc::new(dataset.into_store(10.0).unwrap());
    let engine = GradeEngine::new(store.clone(), EngineConfig::default());

    let baseline = engine
        .compute_all_averages("t1", "math", &NoopReporter)
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("baseline.json");
    baseline.save_json(&path).unwrap();
    let baseline = RosterReport::load_json(&path).unwrap();

    // Ana's project drops, Carla's missing quiz gets graded.
    store
        .upsert_grades(vec![
            grade("ana", "geometry-project", 1.0),
            grade("carla", "geometry-quiz", 9.0),
        ])
        .unwrap();

    let current = engine
        .compute_all_averages("t1", "math", &NoopReporter)
        .await
        .unwrap();
    let changes = current.compare(&baseline, 0.5);

    assert_eq!(changes.drops.len(), 1);
    assert_eq!(changes.drops[0].student_id, "ana");
    // Geometry 6.5 -> 3.7, class 6.75 -> 5.35.
    assert_eq!(changes.drops[0].current_average, 5.35);
    assert_eq!(changes.rises.len(), 1);
    assert_eq!(changes.rises[0].student_id, "carla");
    assert_eq!(changes.unchanged, 1);
    assert!(changes.has_drops());

    let md = changes.to_markdown();
    assert!(md.contains("### Drops"));
    assert!(md.contains("### Rises"));
}

#[tokio::test]
async fn summary_of_sample_roster() {
    let dataset = load_dataset("../../datasets/school.toml".as_ref()).unwrap();
    let engine = GradeEngine::new(
        Arc::new(dataset.into_store(10.0).unwrap()),
        EngineConfig::default(),
    );

    let report = engine
        .compute_all_averages("t2", "physics", &NoopReporter)
        .await
        .unwrap();
    let summary = summarize_roster(&report);

    assert_eq!(summary.computed, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.highest, Some(10.0));
    assert_eq!(summary.lowest, Some(3.0));
    assert_eq!(summary.class_mean, 6.5);
    assert_eq!(summary.unit_means.len(), 1);
}
