//! Code runner for Adjudicator
//!
//! The compile and execute stages of a judging call. Both stages fold their
//! own failures into their outcome types instead of returning errors.

use std::path::Path;
use std::time::Duration;

use thiserror::Error;

pub use crate::runner::compile::{compile, partition_diagnostics};
pub use crate::runner::execute::execute;

mod compile;
mod execute;

use crate::{
    config::Toolchain,
    sandbox::SandboxError,
    scratch::{ScratchDir, ScratchError},
    types::{CompilationOutcome, ExecutionOutcome},
};

/// Errors that keep the compiler from running at all
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("scratch error: {0}")]
    Scratch(#[from] ScratchError),

    #[error("sandbox error: {0}")]
    Sandbox(#[from] SandboxError),
}

/// Errors that keep the program from running at all
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("execution not started: {0}")]
    NotStarted(String),

    #[error("sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Compiles and runs submissions with one toolchain
#[derive(Debug, Clone)]
pub struct Runner {
    toolchain: Toolchain,
}

impl Runner {
    /// Create a new runner for the given toolchain
    pub fn new(toolchain: Toolchain) -> Self {
        Self { toolchain }
    }

    /// Get the toolchain
    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    /// Build `source` into an artifact inside `scratch`
    pub async fn compile(&self, scratch: &ScratchDir, source: &str) -> CompilationOutcome {
        compile::compile(scratch, &self.toolchain, source).await
    }

    /// Run a compiled artifact with `input` on stdin under `timeout`
    pub async fn run(
        &self,
        artifact: &Path,
        input: &str,
        timeout: Duration,
        max_output: usize,
    ) -> ExecutionOutcome {
        execute::execute(&self.toolchain, artifact, input, timeout, max_output).await
    }
}
