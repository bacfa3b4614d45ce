//! HTTP client for Gemini's `generateContent` endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use lexaudit_ai::{GenerationParams, TextGenerator, UpstreamError};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Finish reasons that mean the candidate was withheld by a content filter.
const BLOCKING_FINISH_REASONS: &[&str] = &["SAFETY", "BLOCKED_SAFETY", "RECITATION"];

#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("response blocked ({0})")]
    Blocked(String),
    #[error("response contained no text")]
    EmptyResponse,
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<GeminiError> for UpstreamError {
    fn from(err: GeminiError) -> Self {
        match err {
            GeminiError::Http(e) => UpstreamError::Transport(e.to_string()),
            GeminiError::Server { status: 400, body } => UpstreamError::InvalidPrompt(body),
            GeminiError::Server { status, body } => UpstreamError::Server { status, body },
            GeminiError::QuotaExceeded(body) => UpstreamError::QuotaExceeded(body),
            GeminiError::Blocked(reason) => UpstreamError::Blocked { reason },
            GeminiError::EmptyResponse => UpstreamError::EmptyResponse,
            GeminiError::Json(e) => UpstreamError::Transport(format!("malformed response body: {e}")),
        }
    }
}

// ── Wire format ──

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

fn request_body(prompt: &str, params: GenerationParams) -> GenerateRequest<'_> {
    GenerateRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![RequestPart { text: prompt }],
        }],
        generation_config: GenerationConfig {
            temperature: params.temperature,
            max_output_tokens: params.max_tokens,
        },
    }
}

/// Pull the generated text out of a successful response body.
fn response_text(body: &str) -> Result<String, GeminiError> {
    let response: GenerateResponse = serde_json::from_str(body)?;

    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(GeminiError::Blocked(reason));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(GeminiError::EmptyResponse)?;

    if let Some(reason) = candidate.finish_reason.as_deref()
        && BLOCKING_FINISH_REASONS.contains(&reason)
    {
        return Err(GeminiError::Blocked(reason.to_string()));
    }

    let text: String = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    if text.trim().is_empty() {
        return Err(GeminiError::EmptyResponse);
    }
    Ok(text)
}

/// Gemini client bound to one model and API key.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    /// `base_url` is the API root, e.g. [`DEFAULT_BASE_URL`]; a trailing
    /// slash is ignored.
    pub fn new(base_url: String, model: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Send one prompt and return the candidate text.
    pub async fn generate_content(
        &self,
        prompt: &str,
        params: GenerationParams,
    ) -> Result<String, GeminiError> {
        let url = self.endpoint();
        debug!(
            model = %self.model,
            prompt_chars = prompt.len(),
            temperature = params.temperature,
            "calling gemini"
        );

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(prompt, params))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                warn!(model = %self.model, "gemini quota exhausted");
                return Err(GeminiError::QuotaExceeded(body));
            }
            return Err(GeminiError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        let text = response_text(&body)?;
        info!(model = %self.model, response_chars = text.len(), "gemini responded");
        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        params: GenerationParams,
    ) -> Result<String, UpstreamError> {
        Ok(self.generate_content(prompt, params).await?)
    }
}
