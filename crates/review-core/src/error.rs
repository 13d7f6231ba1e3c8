//! Error types for market review operations

use review_llm::LLMError;
use thiserror::Error;

/// Errors raised while fetching data or generating reports
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Market data provider returned an error or an unusable payload
    #[error("Data provider error: {0}")]
    DataProvider(String),

    /// News search failed
    #[error("News search error: {0}")]
    News(String),

    /// Generation provider call failed
    #[error("LLM error: {0}")]
    Llm(#[from] LLMError),

    /// No generation provider could be initialised
    #[error("No generation provider available")]
    GenerationUnavailable,

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Prompt template failed to render
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    /// Model output could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<review_utils::EnvError> for ReviewError {
    fn from(err: review_utils::EnvError) -> Self {
        ReviewError::Config(err.to_string())
    }
}

impl ReviewError {
    /// Whether the failure looks like provider throttling
    ///
    /// Matches a 429 status or the words "rate" / "quota" anywhere in the
    /// error text.
    pub fn is_rate_limited(&self) -> bool {
        if matches!(self, ReviewError::Llm(LLMError::RateLimitExceeded(_))) {
            return true;
        }
        if let ReviewError::Network(err) = self {
            if err.status().is_some_and(|s| s.as_u16() == 429) {
                return true;
            }
        }
        let text = self.to_string().to_lowercase();
        text.contains("429") || text.contains("rate") || text.contains("quota")
    }
}

/// Result type alias for review operations
pub type Result<T> = std::result::Result<T, ReviewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReviewError::DataProvider("empty diff".to_string());
        assert_eq!(err.to_string(), "Data provider error: empty diff");

        let err: ReviewError = LLMError::ModelNotFound("gemini-x".to_string()).into();
        assert!(err.to_string().starts_with("LLM error:"));
    }

    #[test]
    fn test_rate_limit_classification() {
        let throttled: ReviewError = LLMError::RateLimitExceeded("slow down".into()).into();
        assert!(throttled.is_rate_limited());

        assert!(ReviewError::DataProvider("HTTP 429 Too Many Requests".into()).is_rate_limited());
        assert!(ReviewError::News("Quota exhausted".into()).is_rate_limited());
        assert!(ReviewError::Parse("RATE exceeded".into()).is_rate_limited());

        assert!(!ReviewError::DataProvider("connection reset".into()).is_rate_limited());
        assert!(!ReviewError::GenerationUnavailable.is_rate_limited());
    }
}
