use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of compiling one submission
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompilationOutcome {
    /// Whether the compiler produced a runnable artifact
    pub success: bool,

    /// Path of the artifact inside the session scratch directory
    pub artifact: Option<PathBuf>,

    /// Error diagnostics, in compiler order
    pub errors: Vec<String>,

    /// Warning diagnostics, in compiler order
    pub warnings: Vec<String>,

    /// Wall clock time spent compiling in seconds
    pub time: f64,
}

impl CompilationOutcome {
    /// A failed compilation carrying a single error diagnostic
    pub fn failed(message: impl Into<String>, time: f64) -> Self {
        Self {
            success: false,
            artifact: None,
            errors: vec![message.into()],
            warnings: Vec::new(),
            time,
        }
    }

    /// Check if compilation produced an artifact
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success && self.artifact.is_some()
    }
}

/// Result of running an artifact
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionOutcome {
    /// Exit code if the program exited normally
    pub exit_code: Option<i32>,

    /// Signal number if the program was killed by a signal
    pub signal: Option<i32>,

    /// Captured standard output
    pub stdout: String,

    /// Captured standard error
    pub stderr: String,

    /// Standard output exceeded the capture limit and was cut
    pub stdout_truncated: bool,

    /// Standard error exceeded the capture limit and was cut
    pub stderr_truncated: bool,

    /// The deadline elapsed before the program exited
    pub timed_out: bool,

    /// Wall clock time in seconds
    pub time: f64,

    /// Why the program could not be run or observed
    pub failure: Option<String>,
}

impl ExecutionOutcome {
    /// An execution that never produced an observable exit
    pub fn failed(message: impl Into<String>, time: f64) -> Self {
        Self {
            failure: Some(message.into()),
            time,
            ..Default::default()
        }
    }

    /// Check if the program exited on its own with code 0
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.timed_out && self.failure.is_none() && self.exit_code == Some(0)
    }
}

/// Structured quality assessment returned by the reviewer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityVerdict {
    /// Total quality score, capped to the configured maximum
    pub total_score: f64,

    /// Logic and correctness
    pub logic_score: f64,

    /// Absence of redundant code
    pub redundancy_score: f64,

    /// Structure and readability
    pub structure_score: f64,

    /// Algorithmic and resource efficiency
    pub efficiency_score: f64,

    /// Problems found, in reviewer order
    pub issues: Vec<String>,

    /// Improvement suggestions, in reviewer order
    pub suggestions: Vec<String>,

    /// Free-text feedback
    pub feedback: String,
}

/// Connection parameters for the quality reviewer
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewerSettings {
    /// Base URL of an OpenAI-compatible API
    pub endpoint: String,

    /// Bearer token; review fails fast when absent
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Model identifier
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Request timeout in seconds
    pub request_timeout: f64,
}

impl Default for ReviewerSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_owned(),
            api_key: None,
            model: "gpt-4o-mini".to_owned(),
            temperature: 0.1,
            request_timeout: 60.0,
        }
    }
}

impl fmt::Debug for ReviewerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewerSettings")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Per-call judging parameters. Read-only for the whole pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgingConfiguration {
    /// Execution deadline in seconds
    pub timeout: f64,

    /// Compare outputs ignoring case
    pub ignore_case: bool,

    /// Trim leading/trailing whitespace before comparing
    pub ignore_whitespace: bool,

    /// Ask the reviewer for a quality verdict after a correct run
    pub quality_review: bool,

    /// Score awarded for a correct run; also the quality total ceiling
    pub max_score: f64,

    /// Capture limit per output stream in bytes
    pub max_output_bytes: usize,

    /// Reviewer connection parameters
    pub reviewer: ReviewerSettings,
}

impl JudgingConfiguration {
    /// Share of `max_score` awarded when review is enabled but fails
    pub const REVIEW_FALLBACK_RATIO: f64 = 0.8;

    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the execution deadline in seconds
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Set case-insensitive comparison
    pub fn with_ignore_case(mut self, ignore: bool) -> Self {
        self.ignore_case = ignore;
        self
    }

    /// Set whitespace trimming before comparison
    pub fn with_ignore_whitespace(mut self, ignore: bool) -> Self {
        self.ignore_whitespace = ignore;
        self
    }

    /// Enable or disable the quality review stage
    pub fn with_quality_review(mut self, enabled: bool) -> Self {
        self.quality_review = enabled;
        self
    }

    /// Set the maximum score
    pub fn with_max_score(mut self, score: f64) -> Self {
        self.max_score = score;
        self
    }

    /// Set the per-stream capture limit in bytes
    pub fn with_max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    /// Set the reviewer connection parameters
    pub fn with_reviewer(mut self, reviewer: ReviewerSettings) -> Self {
        self.reviewer = reviewer;
        self
    }

    /// Execution deadline as a `Duration`
    ///
    /// Non-positive and NaN values give zero; values too large to represent
    /// saturate to `Duration::MAX`.
    pub fn timeout_duration(&self) -> Duration {
        seconds_to_duration(self.timeout)
    }

    /// Score given when review is enabled but could not produce a verdict
    pub fn fallback_score(&self) -> f64 {
        self.max_score * Self::REVIEW_FALLBACK_RATIO
    }
}

/// Convert seconds to a `Duration`, saturating instead of failing
pub(crate) fn seconds_to_duration(seconds: f64) -> Duration {
    if seconds.is_nan() || seconds <= 0.0 {
        Duration::ZERO
    } else {
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
    }
}

impl Default for JudgingConfiguration {
    fn default() -> Self {
        Self {
            timeout: 10.0,
            ignore_case: true,
            ignore_whitespace: true,
            quality_review: true,
            max_score: 30.0,
            max_output_bytes: 64 * 1024 * 1024,
            reviewer: ReviewerSettings::default(),
        }
    }
}

/// Pipeline stage of a judging call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Compiling,
    Executing,
    Comparing,
    ReviewingQuality,
    Scored,
}

impl Stage {
    /// Label used in results and logs
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Compiling => "Compiling",
            Stage::Executing => "Executing",
            Stage::Comparing => "Comparing",
            Stage::ReviewingQuality => "ReviewingQuality",
            Stage::Scored => "Scored",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of one judging call
///
/// `success` tells whether judging itself completed. A submission that failed
/// to compile has `success == true` and `final_score == 0`; a pipeline fault
/// has `success == false` and `error_message` set.
#[derive(Debug, Clone, Serialize)]
pub struct JudgingResult {
    /// Last stage entered
    pub stage: Stage,

    /// Present once the compile stage ran
    pub compilation: Option<CompilationOutcome>,

    /// Present once the execute stage ran
    pub execution: Option<ExecutionOutcome>,

    /// Present when the reviewer produced a verdict
    pub quality: Option<QualityVerdict>,

    /// Actual output matched the expected output
    pub output_matched: bool,

    /// Score for this submission
    pub final_score: f64,

    /// Configured maximum score
    pub max_score: f64,

    /// Judging completed (independent of the score)
    pub success: bool,

    /// Reason for a zero/fallback score, or the pipeline fault
    pub error_message: Option<String>,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,
}

impl JudgingResult {
    /// Fresh accumulator for a call starting now
    pub fn start(max_score: f64) -> Self {
        let now = Utc::now();
        Self {
            stage: Stage::Compiling,
            compilation: None,
            execution: None,
            quality: None,
            output_matched: false,
            final_score: 0.0,
            max_score,
            success: false,
            error_message: None,
            started_at: now,
            finished_at: now,
        }
    }

    /// Wall clock duration of the call
    pub fn duration(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}
