//! Quality reviewer client
//!
//! After a correct run the submission can be sent to an external reviewer that
//! grades it against a fixed rubric. The reviewer is untrusted: whatever it
//! answers is clamped into the rubric before it reaches a [`QualityVerdict`].

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

pub use crate::review::client::ChatReviewer;
pub use crate::review::prompt::{Rubric, render_prompt};

mod client;
mod prompt;

use crate::types::{JudgingConfiguration, QualityVerdict};

/// Errors that occur while asking for a quality review
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("API key not configured")]
    MissingApiKey,

    #[error("reviewer request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("reviewer returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("reviewer returned an empty response")]
    EmptyResponse,

    #[error("unparsable reviewer response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Something that can grade the quality of a correct submission
#[async_trait]
pub trait QualityReviewer: Send + Sync {
    /// Review `source` given the output it produced and the output expected
    async fn review(
        &self,
        source: &str,
        actual_output: &str,
        expected_output: &str,
        config: &JudgingConfiguration,
    ) -> Result<QualityVerdict, ReviewError>;
}

/// Verdict as the reviewer sends it, before clamping
///
/// Every field is optional since the reviewer may omit or null any of them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewResponse {
    pub score: Option<f64>,
    pub logic_score: Option<f64>,
    pub redundancy_score: Option<f64>,
    pub structure_score: Option<f64>,
    pub efficiency_score: Option<f64>,
    pub issues: Option<Vec<String>>,
    pub suggestions: Option<Vec<String>>,
    pub detailed_feedback: Option<String>,
}

fn clamp_score(value: Option<f64>, ceiling: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() => v.clamp(0.0, ceiling.max(0.0)),
        _ => 0.0,
    }
}

/// Turn a raw reviewer response into a verdict inside the rubric
///
/// Each sub-score is clamped to `[0, ceiling]`, the total to `[0, max_score]`.
/// Missing or non-finite scores count as zero; a missing total is the sum of
/// the clamped sub-scores.
pub fn clamp_verdict(response: ReviewResponse, rubric: &Rubric, max_score: f64) -> QualityVerdict {
    let logic_score = clamp_score(response.logic_score, rubric.logic);
    let redundancy_score = clamp_score(response.redundancy_score, rubric.redundancy);
    let structure_score = clamp_score(response.structure_score, rubric.structure);
    let efficiency_score = clamp_score(response.efficiency_score, rubric.efficiency);

    let total = response
        .score
        .unwrap_or(logic_score + redundancy_score + structure_score + efficiency_score);

    QualityVerdict {
        total_score: clamp_score(Some(total), max_score),
        logic_score,
        redundancy_score,
        structure_score,
        efficiency_score,
        issues: response.issues.unwrap_or_default(),
        suggestions: response.suggestions.unwrap_or_default(),
        feedback: response.detailed_feedback.unwrap_or_default(),
    }
}
