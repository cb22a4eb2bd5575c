//! Compiler module - Source code compilation
//!
//! Runs a language recipe's compile step in the run's scratch directory,
//! under its own deadline.

use std::time::Duration;
use tracing::{debug, info};

use crate::error::LaunchError;
use crate::runner::process::{spawn_with_deadline, ProcessExit};
use crate::runner::CommandSpec;

/// Result of a compilation attempt
#[derive(Debug)]
pub struct CompileResult {
    pub success: bool,
    /// Compiler diagnostics (stderr, falling back to stdout)
    pub message: String,
}

/// Compile with `cmd`, failing the compilation if it exceeds `time_limit`.
///
/// A missing compiler is a `LaunchError`, not a failed compilation.
pub async fn compile_source(
    cmd: &CommandSpec,
    time_limit: Duration,
    output_limit: usize,
) -> Result<CompileResult, LaunchError> {
    debug!("Compiling with {:?} {:?}", cmd.program, cmd.args);

    match spawn_with_deadline(cmd, None, time_limit, output_limit).await? {
        ProcessExit::Finished(finished) => {
            let success = finished.status.is_success();
            let message = if finished.stderr.trim().is_empty() {
                finished.stdout.trim().to_string()
            } else {
                finished.stderr.trim().to_string()
            };
            if !success {
                info!("Compilation failed: {:?}", finished.status);
            }
            Ok(CompileResult { success, message })
        }
        ProcessExit::TimedOut => Ok(CompileResult {
            success: false,
            message: format!("Compilation timed out after {}ms", time_limit.as_millis()),
        }),
    }
}
