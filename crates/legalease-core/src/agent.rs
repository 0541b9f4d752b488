use anyhow::Result;
use async_trait::async_trait;

/// A hosted (or local) generative-language model that turns one prompt into
/// one text reply.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Short identifier used in logs, e.g. `"gemini"`.
    fn name(&self) -> &str;

    /// Credential this backend will send. Checked with
    /// [`crate::config::validate_api_key`] before any call is made.
    fn api_key(&self) -> &str;

    /// Submit `prompt` and return the model's complete text response.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
