//! Central grade engine orchestrator.
//!
//! Loads records through the store, enforces ownership, and fans unit and
//! student computations out with bounded parallelism and per-task timeouts.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::binding::{item_variable_names, unit_variable_names};
use crate::class_average::compute_class_average;
use crate::error::{EngineError, EntityKind};
use crate::formula::Formula;
use crate::model::{Class, Student, Unit};
use crate::ranking::{rank_students, RankedStudent};
use crate::report::{RosterReport, StudentAverageEntry, StudentOutcome, UnitSummary};
use crate::results::{ClassAverageResult, UnitAverageResult};
use crate::traits::GradebookStore;
use crate::unit_average::compute_unit_average;

/// Configuration for the grade engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum students computed concurrently in a roster.
    pub parallelism: usize,
    /// Time budget for one unit of one student.
    pub unit_timeout: Duration,
    /// Time budget for one student's whole class average.
    pub student_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallelism: 4,
            unit_timeout: Duration::from_secs(2),
            student_timeout: Duration::from_secs(10),
        }
    }
}

/// Progress reporting trait for roster computations.
pub trait ProgressReporter: Send + Sync {
    fn on_student_start(&self, student_id: &str);
    fn on_student_complete(&self, entry: &StudentAverageEntry);
    fn on_student_error(&self, student_id: &str, error: &EngineError);
    fn on_roster_complete(&self, total: usize, completed: usize, failed: usize, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_student_start(&self, _: &str) {}
    fn on_student_complete(&self, _: &StudentAverageEntry) {}
    fn on_student_error(&self, _: &str, _: &EngineError) {}
    fn on_roster_complete(&self, _: usize, _: usize, _: usize, _: Duration) {}
}

/// Outcome of checking a formula before it is assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaCheck {
    /// Every name the formula could reference, sorted.
    pub variables_available: Vec<String>,
    /// Names the formula does reference, sorted.
    pub variables_referenced: Vec<String>,
}

/// The grade engine.
pub struct GradeEngine {
    store: Arc<dyn GradebookStore>,
    config: EngineConfig,
}

impl GradeEngine {
    pub fn new(store: Arc<dyn GradebookStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Average of one unit for one student.
    pub async fn compute_unit_average(
        &self,
        teacher_id: &str,
        student_id: &str,
        unit_id: &str,
    ) -> Result<UnitAverageResult, EngineError> {
        let unit = self.unit(unit_id).await?;
        let class = self.owned_class(teacher_id, &unit.class_id).await?;
        self.enrolled_student(&class, student_id).await?;

        with_timeout(
            self.config.unit_timeout,
            student_id,
            self.unit_average_for(student_id, &unit),
        )
        .await
    }

    /// Average of a whole class for one student, with its unit breakdown.
    pub async fn compute_class_average(
        &self,
        teacher_id: &str,
        student_id: &str,
        class_id: &str,
    ) -> Result<ClassAverageResult, EngineError> {
        let class = self.owned_class(teacher_id, class_id).await?;
        self.enrolled_student(&class, student_id).await?;
        let units = self.store.find_units_by_class(class_id).await?;

        with_timeout(
            self.config.student_timeout,
            student_id,
            self.class_average_for(&class, &units, student_id),
        )
        .await
    }

    /// Class averages for every student of a class.
    ///
    /// A failing student gets an error entry; the rest of the roster is still
    /// computed.
    pub async fn compute_all_averages(
        &self,
        teacher_id: &str,
        class_id: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<RosterReport, EngineError> {
        let class = self.owned_class(teacher_id, class_id).await?;
        self.roster_for(&class, progress).await
    }

    /// The best `count` students by class average, or by one unit's average.
    pub async fn top_students(
        &self,
        teacher_id: &str,
        class_id: &str,
        count: usize,
        unit_id: Option<&str>,
    ) -> Result<Vec<RankedStudent>, EngineError> {
        if count == 0 {
            return Err(EngineError::BadRequest("count must be at least 1".into()));
        }
        let class = self.owned_class(teacher_id, class_id).await?;
        if let Some(unit_id) = unit_id {
            let unit = self.unit(unit_id).await?;
            if unit.class_id != class.id {
                return Err(EngineError::BadRequest(format!(
                    "unit '{unit_id}' does not belong to class '{class_id}'"
                )));
            }
        }

        let report = self.roster_for(&class, &NoopReporter).await?;
        Ok(rank_students(&report, count, unit_id))
    }

    /// Validate a formula before assigning it to a unit.
    pub async fn check_unit_formula(
        &self,
        teacher_id: &str,
        unit_id: &str,
        formula: &str,
    ) -> Result<FormulaCheck, EngineError> {
        let unit = self.unit(unit_id).await?;
        self.owned_class(teacher_id, &unit.class_id).await?;
        let items = self.store.find_items_by_unit(unit_id).await?;
        if items.is_empty() {
            return Err(EngineError::BadRequest(format!(
                "unit '{unit_id}' has no evaluation items; add one before assigning a formula"
            )));
        }
        let available = item_variable_names(items.iter().map(|i| i.name.as_str()));
        check_formula(formula, available.into_iter().collect())
    }

    /// Validate a formula before assigning it to a class.
    pub async fn check_class_formula(
        &self,
        teacher_id: &str,
        class_id: &str,
        formula: &str,
    ) -> Result<FormulaCheck, EngineError> {
        self.owned_class(teacher_id, class_id).await?;
        let units = self.store.find_units_by_class(class_id).await?;
        if units.is_empty() {
            return Err(EngineError::BadRequest(format!(
                "class '{class_id}' has no units; add one before assigning a formula"
            )));
        }
        check_formula(formula, unit_variable_names(units.len()).into_iter().collect())
    }

    async fn roster_for(
        &self,
        class: &Class,
        progress: &dyn ProgressReporter,
    ) -> Result<RosterReport, EngineError> {
        let start = Instant::now();
        let units = self.store.find_units_by_class(&class.id).await?;
        let students = self.store.find_students_by_class(&class.id).await?;
        let semaphore = Semaphore::new(self.config.parallelism.max(1));

        let mut futures = FuturesUnordered::new();
        for (index, student) in students.iter().enumerate() {
            let semaphore = &semaphore;
            let units = units.as_slice();
            futures.push(async move {
                let outcome = self
                    .roster_entry(semaphore, class, units, student, progress)
                    .await;
                (index, student, outcome)
            });
        }

        let total = futures.len();
        let mut entries: Vec<Option<StudentAverageEntry>> = vec![None; total];
        let mut completed = 0usize;
        let mut failed = 0usize;

        while let Some((index, student, outcome)) = futures.next().await {
            let outcome = match outcome {
                Ok(result) => {
                    completed += 1;
                    StudentOutcome::Ok {
                        average: result.average,
                        unit_averages: result.unit_averages,
                    }
                }
                Err(e) => {
                    tracing::warn!("average failed for {}/{}: {e}", class.id, student.id);
                    progress.on_student_error(&student.id, &e);
                    failed += 1;
                    StudentOutcome::from_error(&e)
                }
            };
            let entry = StudentAverageEntry {
                student_id: student.id.clone(),
                student_name: student.name.clone(),
                registration: student.registration.clone(),
                outcome,
            };
            if entry.average().is_some() {
                progress.on_student_complete(&entry);
            }
            entries[index] = Some(entry);
        }

        let elapsed = start.elapsed();
        progress.on_roster_complete(total, completed, failed, elapsed);
        tracing::info!(
            class_id = %class.id,
            total,
            completed,
            failed,
            "roster averages computed in {}ms",
            elapsed.as_millis()
        );

        Ok(RosterReport {
            id: Uuid::new_v4(),
            created_at: chrono::Utc::now(),
            class_id: class.id.clone(),
            class_name: class.name.clone(),
            averaging_mode: class.averaging_mode,
            units: units
                .iter()
                .map(|u| UnitSummary {
                    unit_id: u.id.clone(),
                    unit_name: u.name.clone(),
                    averaging_mode: u.averaging_mode,
                })
                .collect(),
            student_averages: entries.into_iter().flatten().collect(),
            duration_ms: elapsed.as_millis() as u64,
        })
    }

    async fn roster_entry(
        &self,
        semaphore: &Semaphore,
        class: &Class,
        units: &[Unit],
        student: &Student,
        progress: &dyn ProgressReporter,
    ) -> Result<ClassAverageResult, EngineError> {
        let _permit = semaphore
            .acquire()
            .await
            .map_err(|_| EngineError::Store(anyhow::anyhow!("semaphore closed")))?;
        progress.on_student_start(&student.id);

        with_timeout(
            self.config.student_timeout,
            &student.id,
            self.class_average_for(class, units, &student.id),
        )
        .await
    }

    /// Units are computed concurrently; results keep class order.
    async fn class_average_for(
        &self,
        class: &Class,
        units: &[Unit],
        student_id: &str,
    ) -> Result<ClassAverageResult, EngineError> {
        let per_unit = join_all(units.iter().map(|unit| {
            with_timeout(
                self.config.unit_timeout,
                student_id,
                self.unit_average_for(student_id, unit),
            )
        }))
        .await;
        let unit_averages = per_unit.into_iter().collect::<Result<Vec<_>, _>>()?;

        compute_class_average(student_id, class, unit_averages)
    }

    async fn unit_average_for(
        &self,
        student_id: &str,
        unit: &Unit,
    ) -> Result<UnitAverageResult, EngineError> {
        let items = self.store.find_items_by_unit(&unit.id).await?;
        let grades = if items.is_empty() {
            Vec::new()
        } else {
            self.store
                .find_grades_by_student_and_unit(student_id, &unit.id)
                .await?
        };
        compute_unit_average(student_id, unit, &items, &grades)
    }

    async fn unit(&self, unit_id: &str) -> Result<Unit, EngineError> {
        self.store
            .find_unit(unit_id)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::Unit, unit_id))
    }

    async fn owned_class(&self, teacher_id: &str, class_id: &str) -> Result<Class, EngineError> {
        let class = self
            .store
            .find_class(class_id)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::Class, class_id))?;
        if class.teacher_id != teacher_id {
            return Err(EngineError::Forbidden(format!(
                "teacher '{teacher_id}' does not own class '{class_id}'"
            )));
        }
        Ok(class)
    }

    async fn enrolled_student(&self, class: &Class, student_id: &str) -> Result<Student, EngineError> {
        let student = self
            .store
            .find_student(student_id)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::Student, student_id))?;
        if student.class_id != class.id {
            return Err(EngineError::Forbidden(format!(
                "student '{student_id}' is not enrolled in class '{}'",
                class.id
            )));
        }
        Ok(student)
    }
}

async fn with_timeout<T, F>(limit: Duration, student_id: &str, fut: F) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, EngineError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::Timeout {
            student_id: student_id.to_string(),
            timeout_ms: limit.as_millis() as u64,
        }),
    }
}

fn check_formula(formula: &str, available: Vec<String>) -> Result<FormulaCheck, EngineError> {
    let parsed = Formula::parse(formula)
        .map_err(|e| EngineError::BadRequest(format!("invalid formula \"{formula}\": {e}")))?;
    let referenced: Vec<String> = parsed.variables().into_iter().map(String::from).collect();
    let unknown: Vec<&str> = referenced
        .iter()
        .filter(|name| !available.contains(name))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(EngineError::BadRequest(format!(
            "formula \"{formula}\" references unknown variable(s): {}; available: {}",
            unknown.join(", "),
            available.join(", ")
        )));
    }
    Ok(FormulaCheck {
        variables_available: available,
        variables_referenced: referenced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_formula_accepts_known_names() {
        let check = check_formula("N1 * 0.5 + lab * 0.5", vec!["N1".into(), "lab".into()]).unwrap();
        assert_eq!(check.variables_referenced, vec!["N1", "lab"]);
    }

    #[test]
    fn check_formula_lists_unknown_names() {
        let err = check_formula("N1 + N4", vec!["N1".into(), "N2".into()]).unwrap_err();
        assert!(matches!(err, EngineError::BadRequest(_)));
        assert!(err.to_string().contains("N4"));
    }

    #[test]
    fn check_formula_rejects_bad_syntax() {
        let err = check_formula("N1 +", vec!["N1".into()]).unwrap_err();
        assert!(err.to_string().contains("invalid formula"));
    }

    #[tokio::test]
    async fn timeout_maps_to_engine_error() {
        let result: Result<(), EngineError> = with_timeout(Duration::from_millis(5), "s1", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(EngineError::Timeout { timeout_ms: 5, .. })));
    }

    #[test]
    fn default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.parallelism, 4);
        assert!(config.unit_timeout < config.student_timeout);
    }
}
