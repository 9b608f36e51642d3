//! Per-session scratch storage
//!
//! Every judging call owns exactly one scratch directory. The compiler writes
//! the source and artifact into it and the program runs with it as working
//! directory. It is never shared between calls and is removed when the session
//! ends.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, instrument, warn};

const SCRATCH_PREFIX: &str = "adjudicator-";

/// Errors that occur while managing scratch storage
#[derive(Debug, Error)]
pub enum ScratchError {
    #[error("failed to create scratch directory under {root}: {source}")]
    Create {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove scratch directory {path}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("scratch directory already released")]
    Released,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A scratch directory exclusively owned by one judging session
///
/// # Cleanup
///
/// Call [`cleanup()`](Self::cleanup) when the session ends so removal errors
/// can be observed. Dropping an unreleased directory still removes it, but
/// only logs failures.
#[derive(Debug)]
pub struct ScratchDir {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl ScratchDir {
    /// Create a fresh session directory under `root`, or the system temp dir
    #[instrument]
    pub fn create(root: Option<&Path>) -> Result<Self, ScratchError> {
        let root = root
            .map(Path::to_path_buf)
            .unwrap_or_else(std::env::temp_dir);

        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(&root)
            .map_err(|source| ScratchError::Create {
                root: root.clone(),
                source,
            })?;
        let path = dir.path().to_path_buf();

        debug!(?path, "scratch directory created");

        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    /// Get the path to the session directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the path to a file inside the session directory
    ///
    /// Returns an error if the name tries to leave the directory.
    pub fn file_path(&self, name: &str) -> Result<PathBuf, ScratchError> {
        if name.is_empty() || name.contains("..") || name.starts_with('/') {
            return Err(ScratchError::InvalidPath(format!(
                "path traversal not allowed: {name}"
            )));
        }
        if self.dir.is_none() {
            return Err(ScratchError::Released);
        }
        Ok(self.path.join(name))
    }

    /// Write a file into the session directory
    #[instrument(skip(self, content))]
    pub async fn write_file(&self, name: &str, content: &[u8]) -> Result<PathBuf, ScratchError> {
        let path = self.file_path(name)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&path, content).await?;
        debug!(?path, len = content.len(), "wrote file to scratch");
        Ok(path)
    }

    /// Check if a file exists in the session directory
    pub async fn file_exists(&self, name: &str) -> Result<bool, ScratchError> {
        let path = self.file_path(name)?;
        Ok(tokio::fs::metadata(&path).await.is_ok())
    }

    /// Remove the session directory and everything in it
    #[must_use = "cleanup errors should be handled"]
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn cleanup(&mut self) -> Result<(), ScratchError> {
        let Some(dir) = self.dir.take() else {
            return Ok(());
        };

        dir.close().map_err(|source| ScratchError::Cleanup {
            path: self.path.clone(),
            source,
        })?;

        debug!("scratch directory removed");
        Ok(())
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            warn!(
                path = %self.path.display(),
                "ScratchDir dropped without explicit cleanup, removing it now"
            );
            if let Err(e) = dir.close() {
                warn!(path = %self.path.display(), error = %e, "scratch removal failed");
            }
        }
    }
}
