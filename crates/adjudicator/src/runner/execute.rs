//! Execution step for judging
//!
//! Runs a compiled artifact with the given input under a wall clock deadline.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, instrument, warn};

use crate::config::Toolchain;
use crate::runner::ExecuteError;
use crate::sandbox::{SandboxCommand, resolve_command, run_with_deadline};
use crate::types::ExecutionOutcome;

/// Execute an artifact with batch I/O
///
/// The artifact's directory is the working directory. Never fails: spawn and
/// I/O problems are recorded in [`ExecutionOutcome::failure`].
#[instrument(skip(toolchain, input), fields(toolchain = %toolchain.name))]
pub async fn execute(
    toolchain: &Toolchain,
    artifact: &Path,
    input: &str,
    timeout: Duration,
    max_output: usize,
) -> ExecutionOutcome {
    let start = Instant::now();

    match try_execute(toolchain, artifact, input, timeout, max_output).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = %e, "program could not be run");
            ExecutionOutcome::failed(e.to_string(), start.elapsed().as_secs_f64())
        }
    }
}

async fn try_execute(
    toolchain: &Toolchain,
    artifact: &Path,
    input: &str,
    timeout: Duration,
    max_output: usize,
) -> Result<ExecutionOutcome, ExecuteError> {
    let (Some(dir), Some(binary)) = (artifact.parent(), artifact.file_name()) else {
        return Err(ExecuteError::NotStarted(format!(
            "invalid artifact path '{}'",
            artifact.display()
        )));
    };

    if !tokio::fs::try_exists(artifact).await? {
        return Err(ExecuteError::NotStarted(format!(
            "artifact '{}' not found - was compilation run?",
            artifact.display()
        )));
    }

    let mut argv = toolchain.run_command(&binary.to_string_lossy());
    resolve_command(&mut argv, dir)?;

    debug!(?argv, "executing program");

    let command = SandboxCommand::new(argv)
        .env("PATH", &toolchain.run.path)
        .envs(toolchain.run.env.clone())
        .working_dir(dir);

    let output = run_with_deadline(&command, input.as_bytes(), timeout, max_output).await?;

    let outcome = ExecutionOutcome {
        exit_code: output.exit_code(),
        signal: output.signal(),
        stdout: output.stdout.to_text(),
        stderr: output.stderr.to_text(),
        stdout_truncated: output.stdout.truncated,
        stderr_truncated: output.stderr.truncated,
        timed_out: output.timed_out,
        time: output.elapsed.as_secs_f64(),
        failure: None,
    };

    debug!(
        exit_code = ?outcome.exit_code,
        timed_out = outcome.timed_out,
        time = outcome.time,
        "execution complete"
    );

    Ok(outcome)
}
