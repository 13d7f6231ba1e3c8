//! LLM provider trait definition

use crate::{CompletionRequest, CompletionResponse, Result};
use async_trait::async_trait;

/// Trait for generative text providers
///
/// Implementations wrap one hosted API (Gemini, an OpenAI-compatible
/// endpoint, ...). The model identifier travels with each request, so a
/// single provider instance can serve a primary and a fallback model.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion from the model named in `request.model`
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Get the provider name (e.g., "gemini", "openai")
    fn name(&self) -> &str;
}
