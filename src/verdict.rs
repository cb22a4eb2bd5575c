use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal status of a grading run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeStatus {
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    RuntimeError,
    CompilationError,
    LanguageUnsupported,
}

impl GradeStatus {
    pub fn is_accepted(&self) -> bool {
        matches!(self, GradeStatus::Accepted)
    }
}

impl fmt::Display for GradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GradeStatus::Accepted => "accepted",
            GradeStatus::WrongAnswer => "wrong_answer",
            GradeStatus::TimeLimitExceeded => "time_limit_exceeded",
            GradeStatus::RuntimeError => "runtime_error",
            GradeStatus::CompilationError => "compilation_error",
            GradeStatus::LanguageUnsupported => "language_unsupported",
        };
        write!(f, "{}", s)
    }
}
