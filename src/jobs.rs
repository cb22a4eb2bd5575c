//! Grade job and report wire types
//!
//! A `GradeJob` arrives as one JSON line; `process_grade_job` grades it and
//! folds the outcome into a scored `GradeReport`.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::grader::{grade, Submission, SubmissionOutcome, TestCase};
use crate::runner::{RunLimits, Runner};
use crate::verdict::GradeStatus;

/// Grade request received by the worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeJob {
    pub submission_id: i64,
    pub code: String,
    pub language: String,
    pub test_cases: Vec<TestCase>,
    /// Per-case time limit in seconds
    #[serde(default)]
    pub time_limit: Option<u32>,
    /// MB; recorded but not enforced
    #[serde(default)]
    pub memory_limit: Option<u32>,
    /// Full credit for an accepted submission
    #[serde(default = "default_points")]
    pub points: f64,
}

fn default_points() -> f64 {
    100.0
}

/// Result of grading a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeReport {
    pub submission_id: i64,
    pub status: GradeStatus,
    pub test_cases_passed: usize,
    pub total_test_cases: usize,
    /// Seconds, summed over executed cases
    pub execution_time: f64,
    pub score: f64,
    /// Failure description; absent when accepted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl GradeReport {
    pub fn from_outcome(submission_id: i64, points: f64, outcome: SubmissionOutcome) -> Self {
        let score = score(points, &outcome);
        let error_message = if outcome.status.is_accepted() {
            None
        } else {
            Some(outcome.message)
        };

        Self {
            submission_id,
            status: outcome.status,
            test_cases_passed: outcome.passed,
            total_test_cases: outcome.total,
            execution_time: outcome.total_elapsed.as_secs_f64(),
            score,
            error_message,
        }
    }
}

/// Full credit when accepted, otherwise credit proportional to passed cases
pub fn score(points: f64, outcome: &SubmissionOutcome) -> f64 {
    if outcome.status.is_accepted() {
        points
    } else if outcome.total > 0 {
        points * outcome.passed as f64 / outcome.total as f64
    } else {
        0.0
    }
}

/// Process a grade job
pub async fn process_grade_job<R: Runner + ?Sized>(
    runner: &R,
    job: GradeJob,
    default_limits: &RunLimits,
) -> GradeReport {
    let mut limits = default_limits.clone();
    if let Some(secs) = job.time_limit {
        limits.time_ms = secs.max(1).saturating_mul(1000);
    }
    if let Some(memory_mb) = job.memory_limit {
        limits.memory_mb = memory_mb;
    }

    info!(
        "Grading submission_id={}, language={}, test_cases={}, time_limit_ms={}",
        job.submission_id,
        job.language,
        job.test_cases.len(),
        limits.time_ms
    );

    let submission = Submission {
        code: job.code,
        language: job.language,
        test_cases: job.test_cases,
    };
    let outcome = grade(runner, &submission, &limits).await;

    GradeReport::from_outcome(job.submission_id, job.points, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::Language;
    use crate::runner::{ExecutionResult, RunStatus};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    fn outcome(status: GradeStatus, passed: usize, total: usize) -> SubmissionOutcome {
        SubmissionOutcome {
            status,
            passed,
            total,
            total_elapsed: Duration::from_millis(1500),
            message: "msg".to_string(),
        }
    }

    /// Records the limits it was called with and echoes stdin
    #[derive(Default)]
    struct LimitProbe {
        seen: Mutex<Vec<RunLimits>>,
    }

    #[async_trait]
    impl Runner for LimitProbe {
        async fn run(
            &self,
            _code: &str,
            _language: Language,
            stdin: &str,
            limits: &RunLimits,
        ) -> ExecutionResult {
            self.seen.lock().unwrap().push(limits.clone());
            ExecutionResult {
                stdout: stdin.to_string(),
                stderr: String::new(),
                elapsed: Duration::from_millis(250),
                status: RunStatus::Exited(0),
            }
        }
    }

    #[test]
    fn test_score_policy() {
        assert_eq!(score(50.0, &outcome(GradeStatus::Accepted, 4, 4)), 50.0);
        assert_eq!(score(50.0, &outcome(GradeStatus::WrongAnswer, 1, 4)), 12.5);
        assert_eq!(score(50.0, &outcome(GradeStatus::TimeLimitExceeded, 0, 4)), 0.0);
        assert_eq!(score(50.0, &outcome(GradeStatus::LanguageUnsupported, 0, 0)), 0.0);
        assert_eq!(score(50.0, &outcome(GradeStatus::Accepted, 0, 0)), 50.0);
    }

    #[test]
    fn test_report_hides_message_when_accepted() {
        let report = GradeReport::from_outcome(7, 10.0, outcome(GradeStatus::Accepted, 2, 2));
        assert_eq!(report.error_message, None);
        assert_eq!(report.execution_time, 1.5);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "accepted");
        assert!(json.get("error_message").is_none());

        let report = GradeReport::from_outcome(7, 10.0, outcome(GradeStatus::RuntimeError, 1, 2));
        assert_eq!(report.error_message.as_deref(), Some("msg"));
        assert_eq!(report.score, 5.0);
    }

    #[test]
    fn test_job_defaults() {
        let job: GradeJob = serde_json::from_str(
            r#"{
                "submission_id": 1,
                "code": "print(input())",
                "language": "python",
                "test_cases": [{"input": "5", "output": "5", "is_sample": true}]
            }"#,
        )
        .unwrap();

        assert_eq!(job.time_limit, None);
        assert_eq!(job.memory_limit, None);
        assert_eq!(job.points, 100.0);
        assert!(job.test_cases[0].is_sample);
    }

    #[tokio::test]
    async fn test_default_limits_pass_through_unchanged() {
        let probe = LimitProbe::default();
        let job = GradeJob {
            submission_id: 4,
            code: String::new(),
            language: "python".to_string(),
            test_cases: vec![TestCase::new("a", "a")],
            time_limit: None,
            memory_limit: None,
            points: 100.0,
        };

        process_grade_job(&probe, job, &RunLimits::new(1500, 128)).await;

        assert_eq!(*probe.seen.lock().unwrap(), vec![RunLimits::new(1500, 128)]);
    }

    #[tokio::test]
    async fn test_zero_time_limit_is_clamped() {
        let probe = LimitProbe::default();
        let job = GradeJob {
            submission_id: 5,
            code: String::new(),
            language: "python".to_string(),
            test_cases: vec![TestCase::new("a", "a")],
            time_limit: Some(0),
            memory_limit: Some(64),
            points: 100.0,
        };

        process_grade_job(&probe, job, &RunLimits::new(500, 256)).await;

        assert_eq!(*probe.seen.lock().unwrap(), vec![RunLimits::new(1000, 64)]);
    }

    #[tokio::test]
    async fn test_job_limits_override_defaults() {
        let probe = LimitProbe::default();
        let job = GradeJob {
            submission_id: 3,
            code: String::new(),
            language: "python".to_string(),
            test_cases: vec![TestCase::new("a", "a"), TestCase::new("b", "b")],
            time_limit: Some(5),
            memory_limit: None,
            points: 20.0,
        };

        let report = process_grade_job(&probe, job, &RunLimits::from_secs(2, 256)).await;

        assert_eq!(report.status, GradeStatus::Accepted);
        assert_eq!(report.score, 20.0);
        assert_eq!(report.execution_time, 0.5);
        let seen = probe.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|l| *l == RunLimits::new(5000, 256)));
    }
}
