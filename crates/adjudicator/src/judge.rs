//! Judging orchestrator
//!
//! Runs one submission through `Compiling -> Executing -> Comparing ->
//! ReviewingQuality -> Scored`. A submission that fails a stage gets a zero
//! score; only faults in the orchestrator itself mark the result unsuccessful.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::compare::outputs_match;
use crate::config::{Config, ConfigError, Toolchain};
use crate::review::{ChatReviewer, QualityReviewer};
use crate::runner::Runner;
use crate::scratch::{ScratchDir, ScratchError};
use crate::types::{JudgingConfiguration, JudgingResult, Stage};

/// Faults that keep a judging call from completing
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("failed to prepare scratch storage: {0}")]
    Scratch(#[from] ScratchError),

    #[error("judging panicked: {0}")]
    Panicked(String),
}

/// Judges submissions for one toolchain
///
/// Cheap to clone. Concurrent calls share nothing but the toolchain and the
/// reviewer; every call gets its own scratch directory.
#[derive(Clone)]
pub struct Judge {
    runner: Runner,
    scratch_root: Option<PathBuf>,
    reviewer: Arc<dyn QualityReviewer>,
}

impl fmt::Debug for Judge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Judge")
            .field("runner", &self.runner)
            .field("scratch_root", &self.scratch_root)
            .finish_non_exhaustive()
    }
}

impl Judge {
    /// Create a judge using the HTTP chat reviewer
    pub fn new(toolchain: Toolchain) -> Self {
        Self {
            runner: Runner::new(toolchain),
            scratch_root: None,
            reviewer: Arc::new(ChatReviewer::new()),
        }
    }

    /// Create a judge for a configured toolchain
    pub fn from_config(config: &Config, toolchain: &str) -> Result<Self, ConfigError> {
        let judge = Self::new(config.get_toolchain(toolchain)?.clone());
        Ok(match config.scratch_root {
            Some(ref root) => judge.with_scratch_root(root),
            None => judge,
        })
    }

    /// Create session directories under `root` instead of the system temp dir
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// Replace the quality reviewer
    pub fn with_reviewer(mut self, reviewer: Arc<dyn QualityReviewer>) -> Self {
        self.reviewer = reviewer;
        self
    }

    pub fn toolchain(&self) -> &Toolchain {
        self.runner.toolchain()
    }

    pub fn scratch_root(&self) -> Option<&Path> {
        self.scratch_root.as_deref()
    }

    /// Judge one submission against one input/expected-output pair
    ///
    /// Never fails. Check [`JudgingResult::success`] to tell a zero score from
    /// a call that could not complete.
    #[instrument(skip_all, fields(toolchain = %self.toolchain().name))]
    pub async fn judge(
        &self,
        source: &str,
        input: &str,
        expected: &str,
        config: &JudgingConfiguration,
    ) -> JudgingResult {
        let mut result = JudgingResult::start(config.max_score);

        let outcome = AssertUnwindSafe(self.run_session(&mut result, source, input, expected, config))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(JudgeError::Panicked(panic_message(panic.as_ref()))));

        match outcome {
            Ok(()) => result.success = true,
            Err(e) => {
                warn!(stage = %result.stage, error = %e, "judging failed");
                result.compilation = None;
                result.execution = None;
                result.quality = None;
                result.output_matched = false;
                result.final_score = 0.0;
                result.success = false;
                result.error_message = Some(e.to_string());
            }
        }

        result.finished_at = Utc::now();

        info!(
            stage = %result.stage,
            score = result.final_score,
            max_score = result.max_score,
            success = result.success,
            "judging complete"
        );

        result
    }

    /// Own the scratch directory for the whole pipeline and always release it
    async fn run_session(
        &self,
        result: &mut JudgingResult,
        source: &str,
        input: &str,
        expected: &str,
        config: &JudgingConfiguration,
    ) -> Result<(), JudgeError> {
        let mut scratch = ScratchDir::create(self.scratch_root.as_deref())?;

        self.run_stages(&scratch, result, source, input, expected, config)
            .await;

        if let Err(e) = scratch.cleanup() {
            warn!(error = %e, "failed to remove scratch directory");
        }

        Ok(())
    }

    async fn run_stages(
        &self,
        scratch: &ScratchDir,
        result: &mut JudgingResult,
        source: &str,
        input: &str,
        expected: &str,
        config: &JudgingConfiguration,
    ) {
        result.stage = Stage::Compiling;
        let compilation = self.runner.compile(scratch, source).await;
        let artifact = compilation
            .artifact
            .clone()
            .filter(|_| compilation.is_success());
        result.compilation = Some(compilation);

        let Some(artifact) = artifact else {
            return zero_score(result, "compilation failed");
        };

        result.stage = Stage::Executing;
        let execution = self
            .runner
            .run(
                &artifact,
                input,
                config.timeout_duration(),
                config.max_output_bytes,
            )
            .await;
        let executed = execution.is_success();
        let timed_out = execution.timed_out;
        let actual = execution.stdout.clone();
        result.execution = Some(execution);

        if !executed {
            let message = if timed_out {
                "execution timed out"
            } else {
                "execution failed"
            };
            return zero_score(result, message);
        }

        result.stage = Stage::Comparing;
        result.output_matched = outputs_match(
            Some(&actual),
            Some(expected),
            config.ignore_case,
            config.ignore_whitespace,
        );

        if !result.output_matched {
            return zero_score(result, "output does not match expected output");
        }

        if !config.quality_review {
            result.final_score = config.max_score;
            result.stage = Stage::Scored;
            return;
        }

        result.stage = Stage::ReviewingQuality;
        match self
            .reviewer
            .review(source, &actual, expected, config)
            .await
        {
            Ok(verdict) => {
                result.final_score = verdict.total_score.clamp(0.0, config.max_score.max(0.0));
                result.quality = Some(verdict);
            }
            Err(e) => {
                warn!(error = %e, "quality review failed, using fallback score");
                result.final_score = config.fallback_score();
                result.error_message = Some(format!("quality review failed, using fallback score: {e}"));
            }
        }

        result.stage = Stage::Scored;
    }
}

/// Record a zero score for a submission that failed the current stage
fn zero_score(result: &mut JudgingResult, message: &str) {
    debug!(stage = %result.stage, message, "submission scored zero");
    result.final_score = 0.0;
    result.error_message = Some(message.to_owned());
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
