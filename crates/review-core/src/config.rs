//! Configuration for market review and stock analysis

use crate::error::{Result, ReviewError};
use crate::prompts::Language;
use crate::retry::RetryPolicy;
use review_utils::{env_parse, env_string, is_configured_key};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for data fetching and report generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Gemini API key
    pub gemini_api_key: Option<String>,

    /// Primary Gemini model
    pub gemini_model: String,

    /// Gemini model used after the primary keeps failing
    pub gemini_model_fallback: String,

    /// API key for the OpenAI-compatible alternate provider
    pub openai_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint (official API when unset)
    pub openai_base_url: Option<String>,

    /// Model name sent to the alternate provider
    pub openai_model: String,

    /// Tavily API key for news search
    pub tavily_api_key: Option<String>,

    /// Retry policy for generation calls
    pub llm_retry: RetryPolicy,

    /// Retry policy for market data calls
    pub data_retry: RetryPolicy,

    /// Sampling temperature for every generation request
    pub temperature: f32,

    /// Output token budget for the market review
    pub review_max_tokens: usize,

    /// Output token budget for single-stock analysis
    pub analysis_max_tokens: usize,

    /// Per-request HTTP timeout
    pub request_timeout: Duration,

    /// Pause between consecutive analyses in a batch
    pub batch_delay: Duration,

    /// Report and prompt language
    pub language: Language,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: "gemini-2.5-flash".to_string(),
            gemini_model_fallback: "gemini-2.0-flash".to_string(),
            openai_api_key: None,
            openai_base_url: None,
            openai_model: "gpt-4o-mini".to_string(),
            tavily_api_key: None,
            llm_retry: RetryPolicy::generation(),
            data_retry: RetryPolicy::data_fetch(),
            temperature: 0.7,
            review_max_tokens: 2048,
            analysis_max_tokens: 8192,
            request_timeout: Duration::from_secs(120),
            batch_delay: Duration::from_secs(2),
            language: Language::Chinese,
        }
    }
}

impl ReviewConfig {
    /// Create a new configuration builder
    pub fn builder() -> ReviewConfigBuilder {
        ReviewConfigBuilder::default()
    }

    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self {
            gemini_api_key: env_string("GEMINI_API_KEY"),
            openai_api_key: env_string("OPENAI_API_KEY"),
            openai_base_url: env_string("OPENAI_BASE_URL"),
            tavily_api_key: env_string("TAVILY_API_KEY"),
            ..Self::default()
        };

        if let Some(model) = env_string("GEMINI_MODEL") {
            config.gemini_model = model;
        }
        if let Some(model) = env_string("GEMINI_MODEL_FALLBACK") {
            config.gemini_model_fallback = model;
        }
        if let Some(model) = env_string("OPENAI_MODEL") {
            config.openai_model = model;
        }
        if let Some(attempts) = env_parse::<u32>("GEMINI_MAX_RETRIES")? {
            config.llm_retry.max_attempts = attempts;
        }
        if let Some(seconds) = env_parse::<f64>("GEMINI_RETRY_DELAY")? {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(ReviewError::Config(format!(
                    "GEMINI_RETRY_DELAY must be a non-negative number, got {seconds}"
                )));
            }
            config.llm_retry.base_delay = Duration::from_secs_f64(seconds);
        }
        if let Some(attempts) = env_parse::<u32>("DATA_MAX_RETRIES")? {
            config.data_retry.max_attempts = attempts;
        }
        if let Some(language) = env_string("REPORT_LANGUAGE") {
            config.language = Language::from_code(&language);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.llm_retry.validate("llm_retry")?;
        self.data_retry.validate("data_retry")?;

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ReviewError::Config(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }

        if self.review_max_tokens == 0 || self.analysis_max_tokens == 0 {
            return Err(ReviewError::Config(
                "max token budgets must be greater than 0".to_string(),
            ));
        }

        if let Some(base) = &self.openai_base_url {
            let parsed = url::Url::parse(base).map_err(|e| {
                ReviewError::Config(format!("openai_base_url '{base}' is not a valid URL: {e}"))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ReviewError::Config(format!(
                    "openai_base_url must use http or https, got '{}'",
                    parsed.scheme()
                )));
            }
        }

        Ok(())
    }

    /// Gemini key, if it looks like a real credential
    pub fn gemini_key(&self) -> Option<&str> {
        self.gemini_api_key
            .as_deref()
            .filter(|k| is_configured_key(Some(k)))
    }

    /// OpenAI-compatible key, if it looks like a real credential
    pub fn openai_key(&self) -> Option<&str> {
        self.openai_api_key
            .as_deref()
            .filter(|k| is_configured_key(Some(k)))
    }

    /// Tavily key, if it looks like a real credential
    pub fn tavily_key(&self) -> Option<&str> {
        self.tavily_api_key
            .as_deref()
            .filter(|k| is_configured_key(Some(k)))
    }
}

/// Builder for ReviewConfig
#[derive(Debug, Default)]
pub struct ReviewConfigBuilder {
    config: Option<ReviewConfig>,
}

impl ReviewConfigBuilder {
    fn inner(&mut self) -> &mut ReviewConfig {
        self.config.get_or_insert_with(ReviewConfig::default)
    }

    /// Set the Gemini API key
    pub fn gemini_api_key(mut self, key: impl Into<String>) -> Self {
        self.inner().gemini_api_key = Some(key.into());
        self
    }

    /// Set the primary and fallback Gemini models
    pub fn gemini_models(mut self, primary: impl Into<String>, fallback: impl Into<String>) -> Self {
        let config = self.inner();
        config.gemini_model = primary.into();
        config.gemini_model_fallback = fallback.into();
        self
    }

    /// Set the OpenAI-compatible key
    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.inner().openai_api_key = Some(key.into());
        self
    }

    /// Set the OpenAI-compatible base URL
    pub fn openai_base_url(mut self, url: impl Into<String>) -> Self {
        self.inner().openai_base_url = Some(url.into());
        self
    }

    /// Set the OpenAI-compatible model
    pub fn openai_model(mut self, model: impl Into<String>) -> Self {
        self.inner().openai_model = model.into();
        self
    }

    /// Set the Tavily key
    pub fn tavily_api_key(mut self, key: impl Into<String>) -> Self {
        self.inner().tavily_api_key = Some(key.into());
        self
    }

    /// Set the generation retry policy
    pub fn llm_retry(mut self, policy: RetryPolicy) -> Self {
        self.inner().llm_retry = policy;
        self
    }

    /// Set the data retry policy
    pub fn data_retry(mut self, policy: RetryPolicy) -> Self {
        self.inner().data_retry = policy;
        self
    }

    /// Set the sampling temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.inner().temperature = temperature;
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.inner().request_timeout = timeout;
        self
    }

    /// Set the pause between batch analyses
    pub fn batch_delay(mut self, delay: Duration) -> Self {
        self.inner().batch_delay = delay;
        self
    }

    /// Set the report language
    pub fn language(mut self, language: Language) -> Self {
        self.inner().language = language;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ReviewConfig> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }
}
