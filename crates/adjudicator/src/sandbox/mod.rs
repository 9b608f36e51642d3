//! Child process sandboxing
//!
//! Spawns submitted programs and compilers as the leader of their own process
//! group, feeds them input, drains their output and enforces a wall clock
//! deadline. Everything platform specific about killing a process and its
//! descendants sits behind [`ProcessTree::terminate`].

use std::path::Path;

use thiserror::Error;

pub use crate::sandbox::command::SandboxCommand;
pub use crate::sandbox::process::{Captured, ProcessTree, RunOutput, run_with_deadline};

mod command;
mod process;

/// Errors that occur while running a child process
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("empty command")]
    EmptyCommand,

    #[error("command '{0}' not found in PATH")]
    CommandNotFound(String),

    #[error("failed to spawn process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("child {0} pipe was not captured")]
    MissingPipe(&'static str),

    #[error("failed to wait for process: {0}")]
    WaitFailed(#[source] std::io::Error),

    #[error("failed to read {stream}: {source}")]
    ReadFailed {
        stream: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("output task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Resolve the program in a command to an absolute path.
///
/// Bare names (like `g++`) are looked up in the host's PATH so a missing
/// toolchain is reported before anything is spawned. Relative paths (like
/// `./main`) are anchored to `working_dir`. Absolute paths are left unchanged.
pub fn resolve_command(command: &mut [String], working_dir: &Path) -> Result<(), SandboxError> {
    let first = match command.first_mut() {
        Some(first) => first,
        None => return Err(SandboxError::EmptyCommand),
    };

    if first.starts_with('/') {
        return Ok(());
    }

    if first.contains('/') {
        *first = working_dir.join(&*first).to_string_lossy().into_owned();
        return Ok(());
    }

    let path_var = std::env::var("PATH").unwrap_or_default();
    for dir in path_var.split(':').filter(|dir| !dir.is_empty()) {
        let candidate = Path::new(dir).join(&*first);
        if candidate.is_file() {
            *first = candidate.to_string_lossy().into_owned();
            return Ok(());
        }
    }

    Err(SandboxError::CommandNotFound(first.clone()))
}
