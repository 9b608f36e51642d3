//! Compilation step for judging
//!
//! Writes the source into the session scratch directory, runs the toolchain's
//! compiler there and sorts its diagnostics by severity.

use std::time::Instant;

use tracing::{debug, instrument, warn};

use crate::config::Toolchain;
use crate::runner::CompileError;
use crate::sandbox::{SandboxCommand, resolve_command, run_with_deadline};
use crate::scratch::ScratchDir;
use crate::types::CompilationOutcome;

/// Compiler output kept for diagnostics
const COMPILER_OUTPUT_LIMIT: usize = 1024 * 1024;

/// Compile source code into an artifact inside `scratch`
///
/// Never fails: anything that keeps the compiler from running is reported as
/// a single error diagnostic.
#[instrument(skip(scratch, toolchain, source), fields(toolchain = %toolchain.name))]
pub async fn compile(scratch: &ScratchDir, toolchain: &Toolchain, source: &str) -> CompilationOutcome {
    let start = Instant::now();

    match try_compile(scratch, toolchain, source).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = %e, "compiler could not be run");
            CompilationOutcome::failed(
                format!("compilation could not run: {e}"),
                start.elapsed().as_secs_f64(),
            )
        }
    }
}

async fn try_compile(
    scratch: &ScratchDir,
    toolchain: &Toolchain,
    source: &str,
) -> Result<CompilationOutcome, CompileError> {
    let source_name = &toolchain.compile.source_name;
    scratch.write_file(source_name, source.as_bytes()).await?;

    debug!(source_name, "wrote source file");

    let mut argv = toolchain.compile_command();
    resolve_command(&mut argv, scratch.path())?;

    // Compilers are trusted and need their usual environment (HOME, caches)
    let command = SandboxCommand::new(argv)
        .full_env(true)
        .envs(toolchain.compile.env.clone())
        .working_dir(scratch.path());

    let limit = toolchain.compile.time_limit_duration();
    let output = run_with_deadline(&command, b"", limit, COMPILER_OUTPUT_LIMIT).await?;
    let time = output.elapsed.as_secs_f64();

    // Combine stdout and stderr for compiler output
    let mut compiler_output = output.stdout.to_text();
    let stderr = output.stderr.to_text();
    if !compiler_output.is_empty() && !stderr.is_empty() {
        compiler_output.push('\n');
    }
    compiler_output.push_str(&stderr);

    let (mut errors, warnings) = partition_diagnostics(&compiler_output);

    let artifact = scratch.file_path(toolchain.artifact_name())?;
    let exited_cleanly = !output.timed_out && output.exit_code() == Some(0);
    let artifact_exists = scratch.file_exists(toolchain.artifact_name()).await?;

    if output.timed_out {
        errors.push(format!(
            "compilation timed out after {:.1}s",
            limit.as_secs_f64()
        ));
    } else if !exited_cleanly && errors.is_empty() {
        errors.extend(
            compiler_output
                .lines()
                .map(str::trim_end)
                .filter(|line| !line.trim().is_empty())
                .map(str::to_owned),
        );
        if errors.is_empty() {
            errors.push(match (output.exit_code(), output.signal()) {
                (Some(code), _) => format!("compiler exited with code {code}"),
                (None, Some(signal)) => format!("compiler killed by signal {signal}"),
                (None, None) => "compiler exited abnormally".to_owned(),
            });
        }
    } else if exited_cleanly && !artifact_exists {
        errors.push(format!(
            "compiler reported success but produced no artifact '{}'",
            toolchain.artifact_name()
        ));
    }

    let success = exited_cleanly && artifact_exists;

    debug!(
        success,
        exit_code = ?output.exit_code(),
        errors = errors.len(),
        warnings = warnings.len(),
        "compilation complete"
    );

    Ok(CompilationOutcome {
        success,
        artifact: success.then_some(artifact),
        errors,
        warnings,
        time,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Error,
    Warning,
}

/// Severity of one compiler output line, if it carries one
fn classify(line: &str) -> Option<Severity> {
    let lower = line.to_ascii_lowercase();
    // `error:` / `error[E0425]:` / `fatal error:`; not `-Werror=...`
    let tagged = |word: &str| {
        lower
            .match_indices(word)
            .any(|(i, _)| matches!(lower.as_bytes().get(i + word.len()), Some(b':' | b'[')))
    };

    if tagged("error") {
        Some(Severity::Error)
    } else if tagged("warning") {
        Some(Severity::Warning)
    } else {
        None
    }
}

/// Split compiler output into error and warning diagnostics, keeping order
pub fn partition_diagnostics(output: &str) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for line in output.lines().map(str::trim_end) {
        match classify(line) {
            Some(Severity::Error) => errors.push(line.to_owned()),
            Some(Severity::Warning) => warnings.push(line.to_owned()),
            None => {}
        }
    }

    (errors, warnings)
}
