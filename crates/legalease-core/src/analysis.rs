use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::{
    agent::ModelBackend,
    config::validate_api_key,
    error::AnalysisError,
    prompt::build_prompt,
    types::DocumentAnalysis,
};

/// Fields that must be present and non-empty for a reply to be usable.
pub const REQUIRED_FIELDS: [&str; 3] = ["documentType", "riskLevel", "plainSummary"];

/// Sends documents to a [`ModelBackend`] and turns the reply into a
/// [`DocumentAnalysis`]. Stateless: every call hits the backend.
#[derive(Clone)]
pub struct AnalysisClient {
    backend: Arc<dyn ModelBackend>,
}

impl AnalysisClient {
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Whether the backend's credential passes the key validator.
    pub fn is_configured(&self) -> bool {
        validate_api_key(self.backend.api_key())
    }

    pub async fn analyze(&self, document_text: &str) -> Result<DocumentAnalysis, AnalysisError> {
        if !self.is_configured() {
            warn!(backend = %self.backend.name(), "analysis requested without a usable API key");
            return Err(AnalysisError::NotConfigured);
        }

        let prompt = build_prompt(document_text);
        info!(
            backend = %self.backend.name(),
            document_len = document_text.len(),
            prompt_len = prompt.len(),
            "requesting document analysis"
        );

        let reply = match self.backend.generate(&prompt).await {
            Ok(r) => r,
            Err(e) => {
                warn!(backend = %self.backend.name(), "model call failed: {e:#}");
                return Err(AnalysisError::Model(format!("{e:#}")));
            }
        };

        match parse_analysis(&reply) {
            Ok(analysis) => {
                info!(
                    backend = %self.backend.name(),
                    reply_len = reply.len(),
                    document_type = %analysis.document_type,
                    risk_level = %analysis.risk_level,
                    risks = analysis.risks.len(),
                    "document analysis complete"
                );
                Ok(analysis)
            }
            Err(e) => {
                warn!(backend = %self.backend.name(), reply_len = reply.len(), "{e}");
                Err(e)
            }
        }
    }
}

/// Parse a free-form model reply into a validated [`DocumentAnalysis`].
pub fn parse_analysis(reply: &str) -> Result<DocumentAnalysis, AnalysisError> {
    let body = strip_fences(reply);
    let candidate = greedy_object(body)
        .ok_or_else(|| AnalysisError::Format("no JSON object in reply".into()))?;

    let value: Value = match serde_json::from_str(candidate) {
        Ok(v) => v,
        // Trailing prose with its own braces breaks the greedy span.
        Err(e) => balanced_object(body)
            .and_then(|b| serde_json::from_str(b).ok())
            .ok_or_else(|| AnalysisError::Format(e.to_string()))?,
    };

    if !value.is_object() {
        return Err(AnalysisError::Format("reply JSON is not an object".into()));
    }

    let missing: Vec<&'static str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|f| {
            !value
                .get(*f)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.trim().is_empty())
        })
        .collect();
    if !missing.is_empty() {
        return Err(AnalysisError::Incomplete(missing));
    }

    serde_json::from_value(value).map_err(|e| AnalysisError::Format(e.to_string()))
}

/// Drop a surrounding Markdown code fence (```` ```json ... ``` ````), if any.
pub fn strip_fences(text: &str) -> &str {
    let t = text.trim();
    if !t.starts_with("```") {
        return t;
    }
    let nl = match t.find('\n') {
        Some(i) => i,
        None => return t,
    };
    let inner = &t[nl + 1..];
    if inner.ends_with("```") {
        inner[..inner.len() - 3].trim_end()
    } else {
        inner
    }
}

/// Span from the first `{` to the last `}`.
pub fn greedy_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// First brace-balanced object starting at the first `{`, ignoring braces
/// inside JSON strings.
pub fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
