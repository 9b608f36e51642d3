//! A library for judging submitted programs.
//!
//! Adjudicator compiles a submission, runs it against a fixed input under a
//! deadline, compares its output to the expected answer and optionally asks an
//! external reviewer for a quality score.
//!
//! # Features
//!
//! - **Toolchain configuration**: per-language compile and run commands in TOML.
//! - **Deadline enforcement**: timed out programs are killed together with their descendants.
//! - **Concurrent output capture**: stdout and stderr are drained while waiting, so large output never deadlocks.
//! - **Quality review**: rubric-based grading through an OpenAI-compatible API, with clamped scores and an 80% fallback.
//! - **Scratch isolation**: every judging call owns a directory that is removed when it ends.
//!
//! # Example
//!
//! ```no_run
//! use adjudicator::{Config, Judge, JudgingConfiguration};
//!
//! # async fn example() -> Result<(), adjudicator::ConfigError> {
//! let config = Config::default();
//! let judge = Judge::from_config(&config, "python3")?;
//!
//! let settings = JudgingConfiguration::default().with_quality_review(false);
//! let result = judge
//!     .judge("a, b = map(int, input().split())\nprint(a * b)\n", "2 3", "6", &settings)
//!     .await;
//!
//! assert_eq!(result.final_score, settings.max_score);
//! # Ok(())
//! # }
//! ```

pub use compare::outputs_match;
pub use config::{Config, ConfigError, EXAMPLE_CONFIG, Toolchain};
pub use judge::{Judge, JudgeError};
pub use review::{ChatReviewer, QualityReviewer, ReviewError, Rubric};
pub use runner::{CompileError, ExecuteError, Runner};
pub use sandbox::SandboxError;
pub use scratch::{ScratchDir, ScratchError};
pub use types::{
    CompilationOutcome, ExecutionOutcome, JudgingConfiguration, JudgingResult, QualityVerdict,
    ReviewerSettings, Stage,
};

pub mod compare;
pub mod config;
pub mod judge;
pub mod review;
pub mod runner;
pub mod sandbox;
pub mod scratch;
pub mod types;
