use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use legalease_core::{agent::ModelBackend, config::DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Calls Google's Gemini `generateContent` REST endpoint.
///
/// Stateless: every call is a single-turn request with the full prompt. The
/// key travels in the `x-goog-api-key` header, never in the URL.
pub struct GeminiBackend {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Request timeout in seconds; 0 disables it.
    pub timeout_secs: u64,
}

impl GeminiBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 0,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
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

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

fn build_request(prompt: &str) -> GenerateRequest<'_> {
    GenerateRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![RequestPart { text: prompt }],
        }],
    }
}

/// Pull the `error.message` out of an error body, falling back to the raw
/// body when it is not the usual envelope.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) if !env.error.message.is_empty() => env.error.message,
        _ => body.trim().to_string(),
    }
}

/// Concatenate the text parts of the first candidate.
fn reply_text(resp: GenerateResponse) -> Result<String> {
    let Some(candidate) = resp.candidates.into_iter().next() else {
        let reason = resp
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".into());
        bail!("Gemini returned no response ({reason})");
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "empty".into());
        bail!("Gemini returned an empty response ({reason})");
    }
    Ok(text)
}

#[async_trait]
impl ModelBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    fn api_key(&self) -> &str {
        &self.api_key
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        info!(
            model = %self.model,
            base_url = %self.base_url,
            prompt_len = prompt.len(),
            "calling gemini generateContent"
        );

        let mut builder = reqwest::Client::builder();
        if self.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(self.timeout_secs));
        }
        let client = builder.build()?;

        let response = match client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.trim())
            .json(&build_request(prompt))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                warn!(timeout_secs = self.timeout_secs, "gemini request timed out");
                bail!("Gemini request timed out after {}s", self.timeout_secs);
            },
            Err(e) => {
                warn!("gemini request failed: {}", e);
                bail!("Gemini request failed: {e}");
            },
        };

        let status = response.status();
        let body = response
            .text()
            .await
            .context("reading Gemini response body")?;
        if !status.is_success() {
            let message = error_message(&body);
            warn!(status = %status, "gemini returned non-200: {}", message);
            bail!("Gemini error {}: {}", status.as_u16(), message);
        }

        let parsed: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
            warn!("failed to parse gemini response: {}", e);
            anyhow!("Failed to parse Gemini response: {e}")
        })?;

        let text = reply_text(parsed).inspect_err(|e| warn!("{e}"))?;
        info!(output_len = text.len(), "gemini response received");
        Ok(text)
    }
}
