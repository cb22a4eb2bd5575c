//! Runner module - Execution abstraction layer
//!
//! This module runs one program once against one stdin payload:
//! - `ProcessRunner`: materializes the source in a scratch directory and
//!   launches it as a local child process under a wall-clock deadline
//!
//! The runner module does NOT:
//! - Compare outputs or determine verdicts
//! - Know about test cases or submissions

pub mod process;
pub mod scratch;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::languages::Language;

/// Command specification for execution
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Program path or name
    pub program: String,
    /// Arguments to the program
    pub args: Vec<String>,
    /// Working directory
    pub work_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            work_dir: None,
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(|a| a.into()).collect();
        self
    }

    pub fn with_work_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.work_dir = Some(dir.as_ref().to_path_buf());
        self
    }
}

/// Resource limits for execution
#[derive(Debug, Clone, PartialEq)]
pub struct RunLimits {
    /// Wall-clock limit in milliseconds, applied to each launch
    pub time_ms: u32,
    /// Memory limit in MB (advisory, not enforced)
    pub memory_mb: u32,
}

impl RunLimits {
    pub fn new(time_ms: u32, memory_mb: u32) -> Self {
        Self { time_ms, memory_mb }
    }

    pub fn from_secs(time_secs: u32, memory_mb: u32) -> Self {
        Self::new(time_secs.saturating_mul(1000), memory_mb)
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(u64::from(self.time_ms))
    }
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            time_ms: 2000,
            memory_mb: 256,
        }
    }
}

/// Execution status (raw, no verdict interpretation)
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    /// Program exited normally with given exit code
    Exited(i32),
    /// Killed by a signal we did not send
    Signaled(i32),
    /// Wall-clock deadline expired; the process group was killed
    TimedOut,
    /// The language's compile step rejected the source
    CompileFailed,
    /// Program could not be started at all
    LaunchFailed,
}

impl RunStatus {
    /// Check if execution was successful (exited with code 0)
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Exited(0))
    }
}

/// Outcome of running a program once
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub stdout: String,
    /// Program stderr, or the diagnostic for compile and launch failures
    pub stderr: String,
    pub elapsed: Duration,
    pub status: RunStatus,
}

impl ExecutionResult {
    pub fn launch_failed(message: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: message.into(),
            elapsed: Duration::ZERO,
            status: RunStatus::LaunchFailed,
        }
    }

    pub fn compile_failed(diagnostics: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: diagnostics.into(),
            elapsed: Duration::ZERO,
            status: RunStatus::CompileFailed,
        }
    }

    pub fn timed_out(limit: Duration) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            elapsed: limit,
            status: RunStatus::TimedOut,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Runner trait for executing submitted programs
#[async_trait]
pub trait Runner: Send + Sync {
    /// Whether programs in `language` can be launched at all
    fn supports(&self, _language: Language) -> bool {
        true
    }

    /// Run `code` once with `stdin` piped in, under `limits`
    async fn run(
        &self,
        code: &str,
        language: Language,
        stdin: &str,
        limits: &RunLimits,
    ) -> ExecutionResult;
}

// Re-exports
pub use process::ProcessRunner;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = RunLimits::default();
        assert_eq!(limits.time_limit(), Duration::from_secs(2));
        assert_eq!(limits.memory_mb, 256);
        assert_eq!(RunLimits::from_secs(2, 256), limits);
    }

    #[test]
    fn test_only_clean_exit_is_success() {
        assert!(RunStatus::Exited(0).is_success());
        assert!(!RunStatus::Exited(1).is_success());
        assert!(!RunStatus::Signaled(11).is_success());
        assert!(!RunStatus::TimedOut.is_success());
        assert!(!ExecutionResult::launch_failed("missing").is_success());
    }

    #[test]
    fn test_timed_out_keeps_no_output() {
        let result = ExecutionResult::timed_out(Duration::from_secs(1));
        assert!(result.stdout.is_empty());
        assert_eq!(result.elapsed, Duration::from_secs(1));
        assert_eq!(result.status, RunStatus::TimedOut);
    }
}
