//! Tavily web search client

use super::{NewsItem, NewsSearch};
use crate::error::{Result, ReviewError};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";
const DEFAULT_RATE_LIMIT: NonZeroU32 = NonZeroU32::MIN.saturating_add(59);

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Tavily client with client-side rate limiting
pub struct TavilyClient {
    client: Client,
    api_key: String,
    rate_limiter: SharedRateLimiter,
}

impl TavilyClient {
    /// Create a new Tavily client
    ///
    /// # Arguments
    /// * `api_key` - Tavily API key
    /// * `rate_limit` - Requests per minute (zero means the default of 60)
    /// * `timeout` - Per-request timeout
    pub fn new(api_key: impl Into<String>, rate_limit: u32, timeout: Duration) -> Result<Self> {
        let quota = Quota::per_minute(NonZeroU32::new(rate_limit).unwrap_or(DEFAULT_RATE_LIMIT));
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }
}

#[async_trait]
impl NewsSearch for TavilyClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<NewsItem>> {
        self.rate_limiter.until_ready().await;

        let request = TavilyRequest {
            api_key: &self.api_key,
            query,
            max_results,
            topic: "news",
        };

        let response = self
            .client
            .post(TAVILY_SEARCH_URL)
            .json(&request)
            .send()
            .await
            .map_err(|e| ReviewError::News(format!("Tavily request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ReviewError::News(format!("Tavily API error {status}: {body}")));
        }

        let body: TavilyResponse = response
            .json()
            .await
            .map_err(|e| ReviewError::News(format!("Failed to parse Tavily response: {e}")))?;

        debug!("Tavily returned {} results", body.results.len());
        Ok(body.into_items(max_results))
    }

    fn name(&self) -> &'static str {
        "tavily"
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
    topic: &'a str,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

impl TavilyResponse {
    fn into_items(self, max_results: usize) -> Vec<NewsItem> {
        self.results
            .into_iter()
            .take(max_results)
            .map(|r| NewsItem {
                title: r.title,
                snippet: r.content,
                url: r.url,
            })
            .collect()
    }
}
