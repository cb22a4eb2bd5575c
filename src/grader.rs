//! Grader module for evaluating a submission against its test cases
//!
//! Runs the cases in order through a `Runner`, compares each output with the
//! expected answer and stops at the first case that does not pass.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::languages::Language;
use crate::runner::{RunLimits, RunStatus, Runner};
use crate::verdict::GradeStatus;

/// One (input, expected output) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    #[serde(rename = "output", alias = "expected_output")]
    pub expected_output: String,
    /// Visible to the submitter; never changes grading
    #[serde(default)]
    pub is_sample: bool,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
            is_sample: false,
        }
    }
}

/// Code to grade, with its ordered test cases
#[derive(Debug, Clone)]
pub struct Submission {
    pub code: String,
    pub language: String,
    pub test_cases: Vec<TestCase>,
}

/// Result of one grading run
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOutcome {
    pub status: GradeStatus,
    /// Cases passed before the run stopped
    pub passed: usize,
    /// Number of cases supplied, executed or not
    pub total: usize,
    pub total_elapsed: Duration,
    pub message: String,
}

/// Grade `submission`, applying `limits` to every case separately.
///
/// Every failure is folded into the returned status; nothing is retried.
pub async fn grade<R: Runner + ?Sized>(
    runner: &R,
    submission: &Submission,
    limits: &RunLimits,
) -> SubmissionOutcome {
    let total = submission.test_cases.len();
    let mut passed = 0;
    let mut total_elapsed = Duration::ZERO;

    let finish = |status: GradeStatus, passed: usize, total_elapsed: Duration, message: String| {
        info!(
            "Grading summary: language={}, status={}, passed={}/{}, elapsed_ms={}",
            submission.language,
            status,
            passed,
            total,
            total_elapsed.as_millis()
        );
        SubmissionOutcome {
            status,
            passed,
            total,
            total_elapsed,
            message,
        }
    };

    let language = match submission.language.parse::<Language>() {
        Ok(language) if runner.supports(language) => language,
        _ => {
            return finish(
                GradeStatus::LanguageUnsupported,
                0,
                total_elapsed,
                format!("Language not supported: {}", submission.language),
            );
        }
    };

    for (idx, tc) in submission.test_cases.iter().enumerate() {
        let case_no = idx + 1;
        let result = runner
            .run(&submission.code, language, &tc.input, limits)
            .await;
        total_elapsed += result.elapsed;

        debug!(
            "Test case {}: status={:?}, elapsed_ms={}",
            case_no,
            result.status,
            result.elapsed.as_millis()
        );

        match result.status {
            RunStatus::TimedOut => {
                return finish(
                    GradeStatus::TimeLimitExceeded,
                    passed,
                    total_elapsed,
                    format!("Time limit exceeded on test case {}", case_no),
                );
            }
            RunStatus::CompileFailed => {
                return finish(
                    GradeStatus::CompilationError,
                    passed,
                    total_elapsed,
                    format!("Compilation error: {}", result.stderr.trim()),
                );
            }
            RunStatus::Exited(0) => {}
            RunStatus::Exited(_) | RunStatus::Signaled(_) | RunStatus::LaunchFailed => {
                return finish(
                    GradeStatus::RuntimeError,
                    passed,
                    total_elapsed,
                    format!(
                        "Runtime error on test case {}: {}",
                        case_no,
                        result.stderr.trim()
                    ),
                );
            }
        }

        if !compare_output(&result.stdout, &tc.expected_output) {
            return finish(
                GradeStatus::WrongAnswer,
                passed,
                total_elapsed,
                format!("Wrong answer on test case {}", case_no),
            );
        }
        passed += 1;
    }

    finish(
        GradeStatus::Accepted,
        passed,
        total_elapsed,
        "All test cases passed".to_string(),
    )
}

/// Compare program output with expected output, ignoring only leading and
/// trailing whitespace
pub fn compare_output(actual: &str, expected: &str) -> bool {
    actual.trim() == expected.trim()
}
