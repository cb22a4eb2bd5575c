//! Scratch directory holding one run's source artifact
//!
//! The directory is removed when the `ScratchDir` is dropped, so every exit
//! path of a run (normal exit, timeout, launch failure, cancellation)
//! cleans up after itself.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::error::LaunchError;

pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Create a fresh directory under `root` (system temp dir when `None`)
    pub fn create(root: Option<&Path>) -> Result<Self, LaunchError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("submission-");
        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(LaunchError::ScratchDir)?;

        debug!("Created scratch directory {:?}", dir.path());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `content` to `file_name` inside the directory
    pub async fn write_source(
        &self,
        file_name: &str,
        content: &str,
    ) -> Result<PathBuf, LaunchError> {
        let path = self.dir.path().join(file_name);
        tokio::fs::write(&path, content)
            .await
            .map_err(|source| LaunchError::WriteSource {
                path: path.display().to_string(),
                source,
            })?;
        Ok(path)
    }
}
