//! Submission grading: runs untrusted programs against ordered test cases
//! under a per-case time limit and folds the results into one status.

pub mod compiler;
pub mod config;
pub mod error;
pub mod grader;
pub mod jobs;
pub mod languages;
pub mod pool;
pub mod runner;
pub mod verdict;

pub use config::JudgeConfig;
pub use grader::{grade, Submission, SubmissionOutcome, TestCase};
pub use jobs::{GradeJob, GradeReport};
pub use languages::{Language, LanguageRegistry};
pub use pool::GradingPool;
pub use runner::{ExecutionResult, ProcessRunner, RunLimits, RunStatus, Runner};
pub use verdict::GradeStatus;
