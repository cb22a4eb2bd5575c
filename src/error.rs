//! Errors raised while preparing or launching a child process.
//!
//! These never leave the execution engine: `ProcessRunner` folds every
//! `LaunchError` into `RunStatus::LaunchFailed` before returning.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Failed to create scratch directory: {0}")]
    ScratchDir(#[source] io::Error),

    #[error("Failed to write source file {path}: {source}")]
    WriteSource {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error while running program: {0}")]
    Io(#[from] io::Error),
}
