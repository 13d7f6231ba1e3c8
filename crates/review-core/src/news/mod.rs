//! News search collaborators

mod tavily;

pub use tavily::TavilyClient;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub snippet: String,
    #[serde(default)]
    pub url: String,
}

impl NewsItem {
    pub fn new(title: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            snippet: snippet.into(),
            url: String::new(),
        }
    }
}

/// Query → ordered news items
#[async_trait]
pub trait NewsSearch: Send + Sync {
    /// Search for at most `max_results` items
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<NewsItem>>;

    /// Service name for logging
    fn name(&self) -> &str;
}
