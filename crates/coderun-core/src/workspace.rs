//! Per-execution temporary workspaces
//!
//! A [`Workspace`] is a uniquely named directory under the configured temp
//! root. It holds the written source file and whatever the compiler leaves
//! behind. Deletion happens exactly once: either through [`Workspace::release`]
//! or, if the owning future is dropped or unwinds first, on `Drop`. Deletion
//! failures are logged, never returned.

use crate::{CoderunError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const PREFIX: &str = "coderun-";

#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    dir: Option<TempDir>,
}

impl Workspace {
    /// Create a fresh workspace under `temp_root`, creating the root if needed
    pub fn acquire(temp_root: &Path) -> Result<Self> {
        fs::create_dir_all(temp_root).map_err(CoderunError::WorkspaceCreation)?;
        let dir = tempfile::Builder::new()
            .prefix(PREFIX)
            .tempdir_in(temp_root)
            .map_err(CoderunError::WorkspaceCreation)?;

        tracing::debug!(workspace = %dir.path().display(), "workspace acquired");

        Ok(Self {
            root: dir.path().to_path_buf(),
            dir: Some(dir),
        })
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `content` verbatim to `file_name` inside the workspace
    pub fn write_source(&self, file_name: &str, content: &str) -> Result<PathBuf> {
        let path = self.root.join(file_name);
        fs::write(&path, content)?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "source written");
        Ok(path)
    }

    /// Recursively delete the workspace
    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        match dir.close() {
            Ok(()) => tracing::debug!(workspace = %self.root.display(), "workspace released"),
            Err(e) => tracing::warn!(
                workspace = %self.root.display(),
                error = %e,
                "failed to clean up workspace"
            ),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.remove();
    }
}
