//! Provider failover state machine
//!
//! ```text
//! PrimaryModel ──(half the attempt budget failed)──▶ FallbackModel
//!      │                                                  │
//!      └────(request exhausted, alternate configured)─────┴──▶ alternate call
//!
//! AlternateProvider: only the alternate is configured
//! Unavailable: nothing could be initialised (terminal)
//! ```

use super::GenerationOptions;
use crate::config::ReviewConfig;
use crate::error::{Result, ReviewError};
use crate::retry::{RetryPolicy, log_attempt_failure, truncate_error};
use review_llm::providers::{GeminiConfig, GeminiProvider, OpenAIConfig, OpenAIProvider};
use review_llm::{CompletionRequest, LLMError, LLMProvider, Message};
use std::fmt;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Which provider/model currently serves generation requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
    PrimaryModel,
    FallbackModel,
    AlternateProvider,
    Unavailable,
}

impl fmt::Display for ProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderState::PrimaryModel => "primary-model",
            ProviderState::FallbackModel => "fallback-model",
            ProviderState::AlternateProvider => "alternate-provider",
            ProviderState::Unavailable => "unavailable",
        };
        f.write_str(name)
    }
}

/// A provider handle bound to the model it is called with
#[derive(Clone)]
pub struct ProviderSlot {
    pub provider: Arc<dyn LLMProvider>,
    pub model: String,
}

impl ProviderSlot {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    fn label(&self) -> String {
        format!("{}/{}", self.provider.name(), self.model)
    }
}

impl fmt::Debug for ProviderSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSlot")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .finish()
    }
}

/// Generates text through the primary provider, its fallback model and an
/// alternate provider, with bounded retry on each
#[derive(Debug)]
pub struct FailoverGenerator {
    state: ProviderState,
    /// Primary provider bound to the model of the current state
    active: Option<ProviderSlot>,
    fallback_model: String,
    alternate: Option<ProviderSlot>,
    retry: RetryPolicy,
}

impl FailoverGenerator {
    /// Create a generator from already-built providers
    ///
    /// The initial state is the first of primary model, fallback model and
    /// alternate provider that can be used. A blank model name counts as a
    /// failed initialisation.
    pub fn new(
        primary: Option<Arc<dyn LLMProvider>>,
        primary_model: &str,
        fallback_model: &str,
        alternate: Option<ProviderSlot>,
        retry: RetryPolicy,
    ) -> Self {
        let alternate = alternate.filter(|slot| !slot.model.trim().is_empty());
        let fallback_model = fallback_model.trim().to_string();

        let (state, active) = match primary {
            Some(provider) if !primary_model.trim().is_empty() => (
                ProviderState::PrimaryModel,
                Some(ProviderSlot::new(provider, primary_model.trim())),
            ),
            Some(provider) if !fallback_model.is_empty() => {
                warn!(
                    "Primary model is not set, starting with fallback model {}",
                    fallback_model
                );
                (
                    ProviderState::FallbackModel,
                    Some(ProviderSlot::new(provider, fallback_model.clone())),
                )
            }
            _ if alternate.is_some() => (ProviderState::AlternateProvider, None),
            _ => (ProviderState::Unavailable, None),
        };

        match (&active, &alternate) {
            (Some(slot), _) => info!("Generation provider ready ({}, {})", state, slot.label()),
            (None, Some(slot)) => info!("Generation provider ready ({}, {})", state, slot.label()),
            (None, None) => warn!("No generation provider configured, reports use templates"),
        }

        Self {
            state,
            active,
            fallback_model,
            alternate,
            retry,
        }
    }

    /// Build the Gemini and OpenAI-compatible providers from configuration
    ///
    /// Placeholder keys and client build failures leave the corresponding
    /// provider out.
    pub fn from_config(config: &ReviewConfig) -> Self {
        let timeout = config.request_timeout.as_secs().max(1);

        let primary: Option<Arc<dyn LLMProvider>> = config.gemini_key().and_then(|key| {
            match GeminiProvider::with_config(GeminiConfig::new(key).with_timeout(timeout)) {
                Ok(provider) => Some(Arc::new(provider) as Arc<dyn LLMProvider>),
                Err(e) => {
                    warn!("Gemini initialisation failed: {}", e);
                    None
                }
            }
        });
        if primary.is_none() {
            info!("Gemini API key not configured, trying the OpenAI-compatible provider");
        }

        let alternate = config.openai_key().and_then(|key| {
            let mut openai = OpenAIConfig::new(key).with_timeout(timeout);
            if let Some(base) = config.openai_base_url.as_deref() {
                openai = openai.with_api_base(base);
            }
            match OpenAIProvider::with_config(openai) {
                Ok(provider) => Some(ProviderSlot::new(Arc::new(provider), &config.openai_model)),
                Err(e) => {
                    error!("OpenAI-compatible provider initialisation failed: {}", e);
                    None
                }
            }
        });

        Self::new(
            primary,
            &config.gemini_model,
            &config.gemini_model_fallback,
            alternate,
            config.llm_retry.clone(),
        )
    }

    /// Generator that never calls a provider
    pub fn unavailable() -> Self {
        Self::new(None, "", "", None, RetryPolicy::no_retry())
    }

    /// Current state
    pub fn state(&self) -> ProviderState {
        self.state
    }

    /// Whether any provider can be called
    pub fn is_available(&self) -> bool {
        self.state != ProviderState::Unavailable
    }

    /// Model name currently used for requests
    pub fn current_model(&self) -> Option<&str> {
        self.active
            .as_ref()
            .or(self.alternate.as_ref())
            .map(|slot| slot.model.as_str())
    }

    /// Generate text for a prompt
    ///
    /// The primary provider gets the full retry budget, switching to the
    /// fallback model once half of it is spent. If that is exhausted the
    /// alternate provider gets its own budget. Empty responses count as
    /// failures.
    pub async fn generate(
        &mut self,
        system: &str,
        prompt: &str,
        options: GenerationOptions,
    ) -> Result<String> {
        match self.state {
            ProviderState::Unavailable => Err(ReviewError::GenerationUnavailable),
            ProviderState::AlternateProvider => self.generate_alternate(system, prompt, options).await,
            ProviderState::PrimaryModel | ProviderState::FallbackModel => {
                match self.generate_primary(system, prompt, options).await {
                    Ok(text) => Ok(text),
                    Err(e) if self.alternate.is_some() => {
                        warn!(
                            "Primary provider exhausted ({}), trying the alternate provider",
                            truncate_error(&e)
                        );
                        self.generate_alternate(system, prompt, options).await
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    async fn generate_primary(
        &mut self,
        system: &str,
        prompt: &str,
        options: GenerationOptions,
    ) -> Result<String> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_error = ReviewError::GenerationUnavailable;

        for attempt in 1..=max_attempts {
            let Some(slot) = self.active.clone() else {
                break;
            };

            let backoff = self.retry.backoff_before(attempt);
            if !backoff.is_zero() {
                info!(
                    "Retrying {} (attempt {}/{}) in {:.1}s",
                    slot.label(),
                    attempt,
                    max_attempts,
                    backoff.as_secs_f64()
                );
                sleep(backoff).await;
            }

            match call_once(&slot, system, prompt, options).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    log_attempt_failure(&slot.label(), attempt, max_attempts, &e);
                    last_error = e;
                    if attempt > max_attempts / 2 {
                        self.switch_to_fallback();
                    }
                }
            }
        }

        Err(last_error)
    }

    async fn generate_alternate(
        &self,
        system: &str,
        prompt: &str,
        options: GenerationOptions,
    ) -> Result<String> {
        let Some(slot) = self.alternate.as_ref() else {
            return Err(ReviewError::GenerationUnavailable);
        };
        let label = slot.label();
        self.retry
            .execute(&label, || call_once(slot, system, prompt, options))
            .await
    }

    /// Move from the primary to the fallback model; sticky for this instance
    fn switch_to_fallback(&mut self) {
        if self.state != ProviderState::PrimaryModel || self.fallback_model.is_empty() {
            return;
        }
        if let Some(slot) = self.active.as_mut() {
            if slot.model == self.fallback_model {
                return;
            }
            warn!("Switching to fallback model {}", self.fallback_model);
            slot.model.clone_from(&self.fallback_model);
            self.state = ProviderState::FallbackModel;
        }
    }
}

async fn call_once(
    slot: &ProviderSlot,
    system: &str,
    prompt: &str,
    options: GenerationOptions,
) -> Result<String> {
    let mut builder = CompletionRequest::builder(&slot.model)
        .add_message(Message::user(prompt))
        .max_tokens(options.max_output_tokens)
        .temperature(options.temperature);
    if !system.is_empty() {
        builder = builder.system(system);
    }

    let response = slot.provider.complete(builder.build()).await?;
    match response.text() {
        Some(text) => {
            debug!("{} returned {} characters", slot.label(), text.chars().count());
            Ok(text.to_string())
        }
        None => Err(LLMError::EmptyResponse(slot.model.clone()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use review_llm::{CompletionResponse, StopReason, TokenUsage};
    use tokio::sync::Mutex;

    /// Scripted provider: fails the first `failures` calls, then answers
    struct MockProvider {
        name: &'static str,
        failures: usize,
        reply: String,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl MockProvider {
        fn new(name: &'static str, failures: usize, reply: &str) -> Self {
            Self {
                name,
                failures,
                reply: reply.to_string(),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for MockProvider {
        async fn complete(&self, request: CompletionRequest) -> review_llm::Result<CompletionResponse> {
            let mut calls = self.calls.lock().await;
            calls.push(request.model.clone());
            if calls.len() <= self.failures {
                return Err(LLMError::RateLimitExceeded("quota exceeded".to_string()));
            }
            Ok(CompletionResponse {
                message: Message::assistant(self.reply.clone()),
                model: request.model,
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            })
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    fn options() -> GenerationOptions {
        GenerationOptions::review()
    }

    #[tokio::test]
    async fn test_unavailable_is_terminal() {
        let mut generator = FailoverGenerator::unavailable();
        assert_eq!(generator.state(), ProviderState::Unavailable);
        assert!(!generator.is_available());

        for _ in 0..2 {
            let result = generator.generate("", "prompt", options()).await;
            assert!(matches!(result, Err(ReviewError::GenerationUnavailable)));
        }
        assert_eq!(generator.state(), ProviderState::Unavailable);
    }

    #[tokio::test]
    async fn test_initial_state_selection() {
        let gemini: Arc<dyn LLMProvider> = Arc::new(MockProvider::new("gemini", 0, "ok"));
        let openai = ProviderSlot::new(Arc::new(MockProvider::new("openai", 0, "ok")), "gpt-4o-mini");

        let generator = FailoverGenerator::new(
            Some(gemini.clone()),
            "gemini-2.5-flash",
            "gemini-2.0-flash",
            None,
            RetryPolicy::immediate(1),
        );
        assert_eq!(generator.state(), ProviderState::PrimaryModel);
        assert_eq!(generator.current_model(), Some("gemini-2.5-flash"));

        let generator = FailoverGenerator::new(
            Some(gemini),
            " ",
            "gemini-2.0-flash",
            None,
            RetryPolicy::immediate(1),
        );
        assert_eq!(generator.state(), ProviderState::FallbackModel);
        assert_eq!(generator.current_model(), Some("gemini-2.0-flash"));

        let generator =
            FailoverGenerator::new(None, "gemini-2.5-flash", "", Some(openai), RetryPolicy::immediate(1));
        assert_eq!(generator.state(), ProviderState::AlternateProvider);
        assert_eq!(generator.current_model(), Some("gpt-4o-mini"));
    }

    #[tokio::test]
    async fn test_primary_success() {
        let gemini = MockProvider::new("gemini", 0, "市场复盘");
        let calls = gemini.calls.clone();
        let mut generator = FailoverGenerator::new(
            Some(Arc::new(gemini)),
            "primary",
            "fallback",
            None,
            RetryPolicy::immediate(5),
        );

        let text = generator.generate("sys", "prompt", options()).await.unwrap();
        assert_eq!(text, "市场复盘");
        assert_eq!(*calls.lock().await, vec!["primary".to_string()]);
    }

    #[tokio::test]
    async fn test_switches_to_fallback_after_half_budget() {
        let gemini = MockProvider::new("gemini", 3, "ok");
        let calls = gemini.calls.clone();
        let mut generator = FailoverGenerator::new(
            Some(Arc::new(gemini)),
            "primary",
            "fallback",
            None,
            RetryPolicy::immediate(5),
        );

        let text = generator.generate("", "prompt", options()).await.unwrap();
        assert_eq!(text, "ok");
        assert_eq!(
            *calls.lock().await,
            vec!["primary", "primary", "primary", "fallback"]
        );
        assert_eq!(generator.state(), ProviderState::FallbackModel);

        // Sticky for the next request
        generator.generate("", "again", options()).await.unwrap();
        assert_eq!(calls.lock().await.last().map(String::as_str), Some("fallback"));
    }

    #[tokio::test]
    async fn test_alternate_after_primary_exhausted() {
        let gemini = MockProvider::new("gemini", usize::MAX, "never");
        let gemini_calls = gemini.calls.clone();
        let openai = MockProvider::new("openai", 1, "from openai");
        let openai_calls = openai.calls.clone();

        let mut generator = FailoverGenerator::new(
            Some(Arc::new(gemini)),
            "primary",
            "fallback",
            Some(ProviderSlot::new(Arc::new(openai), "gpt-4o-mini")),
            RetryPolicy::immediate(4),
        );

        let text = generator.generate("", "prompt", options()).await.unwrap();
        assert_eq!(text, "from openai");
        assert_eq!(gemini_calls.lock().await.len(), 4);
        assert_eq!(openai_calls.lock().await.len(), 2);
        assert_eq!(generator.state(), ProviderState::FallbackModel);
    }

    #[tokio::test]
    async fn test_alternate_only_retries_with_own_budget() {
        let openai = MockProvider::new("openai", 1, "from openai");
        let calls = openai.calls.clone();
        let mut generator = FailoverGenerator::new(
            None,
            "primary",
            "fallback",
            Some(ProviderSlot::new(Arc::new(openai), "gpt-4o-mini")),
            RetryPolicy::immediate(3),
        );

        let text = generator.generate("sys", "prompt", options()).await.unwrap();
        assert_eq!(text, "from openai");
        assert_eq!(*calls.lock().await, vec!["gpt-4o-mini", "gpt-4o-mini"]);
        assert_eq!(generator.state(), ProviderState::AlternateProvider);
        assert_eq!(generator.current_model(), Some("gpt-4o-mini"));
    }

    #[tokio::test]
    async fn test_alternate_only_exhausted() {
        let openai = MockProvider::new("openai", usize::MAX, "never");
        let calls = openai.calls.clone();
        let mut generator = FailoverGenerator::new(
            None,
            "primary",
            "fallback",
            Some(ProviderSlot::new(Arc::new(openai), "gpt-4o-mini")),
            RetryPolicy::immediate(3),
        );

        let result = generator.generate("", "prompt", options()).await;
        assert!(matches!(result, Err(ReviewError::Llm(LLMError::RateLimitExceeded(_)))));
        assert_eq!(calls.lock().await.len(), 3);
        assert_eq!(generator.state(), ProviderState::AlternateProvider);
        assert!(generator.is_available());
    }

    #[tokio::test]
    async fn test_all_providers_fail() {
        let gemini = MockProvider::new("gemini", usize::MAX, "never");
        let openai = MockProvider::new("openai", usize::MAX, "never");
        let openai_calls = openai.calls.clone();

        let mut generator = FailoverGenerator::new(
            Some(Arc::new(gemini)),
            "primary",
            "fallback",
            Some(ProviderSlot::new(Arc::new(openai), "gpt-4o-mini")),
            RetryPolicy::immediate(2),
        );

        let result = generator.generate("", "prompt", options()).await;
        assert!(matches!(result, Err(ReviewError::Llm(LLMError::RateLimitExceeded(_)))));
        assert_eq!(openai_calls.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_response_is_retried() {
        let gemini = MockProvider::new("gemini", 0, "   ");
        let calls = gemini.calls.clone();
        let mut generator = FailoverGenerator::new(
            Some(Arc::new(gemini)),
            "primary",
            "",
            None,
            RetryPolicy::immediate(3),
        );

        let result = generator.generate("", "prompt", options()).await;
        assert!(matches!(result, Err(ReviewError::Llm(LLMError::EmptyResponse(_)))));
        assert_eq!(calls.lock().await.len(), 3);
        assert_eq!(generator.state(), ProviderState::PrimaryModel);
    }

    #[test]
    fn test_generation_option_defaults() {
        assert_eq!(GenerationOptions::review().max_output_tokens, 2048);
        assert_eq!(GenerationOptions::analysis().max_output_tokens, 8192);
    }
}
