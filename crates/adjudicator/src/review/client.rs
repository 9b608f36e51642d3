//! HTTP client for OpenAI-compatible chat completion endpoints

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::review::{
    QualityReviewer, ReviewError, ReviewResponse, Rubric, clamp_verdict, render_prompt,
};
use crate::types::{JudgingConfiguration, QualityVerdict};

/// Longest error body kept from a failed reviewer response
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Reviewer backed by a chat completion API
///
/// Connection parameters come from [`JudgingConfiguration::reviewer`] on every
/// call, so one client serves differently configured judging calls.
#[derive(Debug, Clone, Default)]
pub struct ChatReviewer {
    client: reqwest::Client,
    rubric: Rubric,
}

impl ChatReviewer {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Strip a Markdown code fence some models wrap JSON in
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[async_trait]
impl QualityReviewer for ChatReviewer {
    #[instrument(skip_all, fields(model = %config.reviewer.model))]
    async fn review(
        &self,
        source: &str,
        actual_output: &str,
        expected_output: &str,
        config: &JudgingConfiguration,
    ) -> Result<QualityVerdict, ReviewError> {
        let settings = &config.reviewer;
        let api_key = settings
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ReviewError::MissingApiKey)?;

        let prompt = render_prompt(&self.rubric, source, actual_output, expected_output);
        let body = ChatRequest {
            model: &settings.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
            temperature: settings.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let url = format!("{}/chat/completions", settings.endpoint.trim_end_matches('/'));
        debug!(%url, "requesting quality review");

        let mut request = self.client.post(&url).bearer_auth(api_key).json(&body);
        if let Ok(timeout) = Duration::try_from_secs_f64(settings.request_timeout)
            && !timeout.is_zero()
        {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReviewError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let completion: ChatResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ReviewError::EmptyResponse)?;

        let raw: ReviewResponse = serde_json::from_str(strip_code_fence(&content))?;
        let verdict = clamp_verdict(raw, &self.rubric, config.max_score);

        debug!(total = verdict.total_score, "quality review complete");
        Ok(verdict)
    }
}
