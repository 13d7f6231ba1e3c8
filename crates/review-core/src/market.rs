//! Daily market review
//!
//! [`MarketAnalyzer`] assembles a [`MarketSnapshot`] from independent
//! best-effort fetch steps, gathers news, and asks the generator for a
//! Markdown report. Every public call returns a value; failures are logged
//! and the affected section keeps its default.

use crate::config::ReviewConfig;
use crate::data::{MarketDataProvider, Row, columns};
use crate::generation::{FailoverGenerator, GenerationOptions};
use crate::news::{NewsItem, NewsSearch};
use crate::prompts::{Language, render_review_prompt, render_template_review, review_system_prompt};
use crate::retry::RetryPolicy;
use crate::snapshot::{MarketSnapshot, classify_breadth, rank_sectors, select_main_indices};
use chrono::{Datelike, Local, NaiveDate};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Results requested per news query
const NEWS_PER_QUERY: usize = 3;

/// Report used when even the template cannot be rendered
const LAST_RESORT_REPORT: &str = "# Market Review\n\nMarket data is unavailable for this session.\n";

/// Market overview, news and report generation
pub struct MarketAnalyzer {
    data: Arc<dyn MarketDataProvider>,
    news: Option<Arc<dyn NewsSearch>>,
    generator: FailoverGenerator,
    data_retry: RetryPolicy,
    options: GenerationOptions,
    language: Language,
}

impl MarketAnalyzer {
    pub fn new(
        data: Arc<dyn MarketDataProvider>,
        news: Option<Arc<dyn NewsSearch>>,
        generator: FailoverGenerator,
    ) -> Self {
        Self {
            data,
            news,
            generator,
            data_retry: RetryPolicy::data_fetch(),
            options: GenerationOptions::review(),
            language: Language::default(),
        }
    }

    /// Wire generator, retry policy and options from configuration
    pub fn from_config(
        config: &ReviewConfig,
        data: Arc<dyn MarketDataProvider>,
        news: Option<Arc<dyn NewsSearch>>,
    ) -> Self {
        Self::new(data, news, FailoverGenerator::from_config(config))
            .with_data_retry(config.data_retry.clone())
            .with_options(GenerationOptions::new(config.temperature, config.review_max_tokens))
            .with_language(config.language)
    }

    pub fn with_data_retry(mut self, retry: RetryPolicy) -> Self {
        self.data_retry = retry;
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn generator(&self) -> &FailoverGenerator {
        &self.generator
    }

    /// Snapshot for today in local time
    pub async fn get_market_overview(&self) -> MarketSnapshot {
        self.overview_for(Local::now().date_naive()).await
    }

    /// Snapshot for a given date
    ///
    /// Index quotes, breadth, sector ranking and margin balance are fetched
    /// one after another; a failing step leaves its fields untouched.
    pub async fn overview_for(&self, date: NaiveDate) -> MarketSnapshot {
        let mut snapshot = MarketSnapshot::new(date);
        info!("Building market overview for {} via {}", date, self.data.name());

        if let Some(rows) = self.fetch("index quotes", || self.data.index_quotes()).await {
            snapshot.indices = select_main_indices(&rows);
            info!("Loaded {} main indices", snapshot.indices.len());
        }

        if let Some(rows) = self.fetch("market breadth", || self.data.stock_quotes()).await {
            snapshot.apply_breadth(classify_breadth(&rows));
            info!(
                "Breadth: up {} down {} flat {} limit-up {} limit-down {} turnover {:.0}",
                snapshot.up_count,
                snapshot.down_count,
                snapshot.flat_count,
                snapshot.limit_up_count,
                snapshot.limit_down_count,
                snapshot.total_amount
            );
        }

        if let Some(rows) = self.fetch("sector ranking", || self.data.sector_quotes()).await {
            let (top, bottom) = rank_sectors(&rows);
            snapshot.top_sectors = top;
            snapshot.bottom_sectors = bottom;
        }

        if let Some(rows) = self.fetch("margin balance", || self.data.margin_balance()).await {
            apply_margin(&mut snapshot, &rows);
        }

        snapshot
    }

    async fn fetch<F, Fut>(&self, step: &str, operation: F) -> Option<Vec<Row>>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = crate::error::Result<Vec<Row>>>,
    {
        match self.data_retry.execute(step, operation).await {
            Ok(rows) => Some(rows),
            Err(e) => {
                error!("Failed to fetch {}: {}", step, e);
                None
            }
        }
    }

    /// Collect market news from all queries for the current month
    pub async fn search_market_news(&self) -> Vec<NewsItem> {
        let Some(news) = &self.news else {
            warn!("No news search service configured, skipping news");
            return Vec::new();
        };

        let mut items = Vec::new();
        for query in news_queries(Local::now().date_naive()) {
            match news.search(&query, NEWS_PER_QUERY).await {
                Ok(found) => {
                    info!("News query '{}' returned {} items", query, found.len());
                    items.extend(found);
                }
                Err(e) => {
                    error!("News search via {} failed: {}", news.name(), e);
                    break;
                }
            }
        }
        items
    }

    /// Markdown review for a snapshot; never fails
    ///
    /// Falls back to the deterministic template when the generator is
    /// unavailable, errors, or returns nothing.
    pub async fn generate_report(&mut self, snapshot: &MarketSnapshot, news: &[NewsItem]) -> String {
        if !self.generator.is_available() {
            warn!("No generation provider available, using template review");
            return self.template_report(snapshot);
        }

        let prompt = match render_review_prompt(self.language, snapshot, news) {
            Ok(prompt) => prompt,
            Err(e) => {
                error!("Failed to build review prompt: {}", e);
                return self.template_report(snapshot);
            }
        };

        info!(
            "Requesting market review ({} chars, {} news items) via {}",
            prompt.chars().count(),
            news.len(),
            self.generator.state()
        );

        let system = review_system_prompt(self.language);
        match self.generator.generate(system, &prompt, self.options).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!("Generator returned an empty review, using template review");
                self.template_report(snapshot)
            }
            Err(e) => {
                warn!("Review generation failed ({}), using template review", e);
                self.template_report(snapshot)
            }
        }
    }

    fn template_report(&self, snapshot: &MarketSnapshot) -> String {
        render_template_review(self.language, snapshot).unwrap_or_else(|e| {
            error!("Failed to render template review: {}", e);
            LAST_RESORT_REPORT.to_string()
        })
    }

    /// Overview, news, then report
    pub async fn run_daily_review(&mut self) -> String {
        info!("Starting daily market review");
        let snapshot = self.get_market_overview().await;
        let news = self.search_market_news().await;
        let report = self.generate_report(&snapshot, &news).await;
        info!("Daily market review finished ({} chars)", report.chars().count());
        report
    }
}

/// Search queries for a month's market news
pub fn news_queries(date: NaiveDate) -> Vec<String> {
    let month = format!("{}年{}月", date.year(), date.month());
    vec![
        format!("A股 大盘 复盘 {month}"),
        format!("股市 行情 分析 今日 {month}"),
        format!("A股 市场 热点 板块 {month}"),
    ]
}

/// Take the newest margin row that carries a balance
fn apply_margin(snapshot: &mut MarketSnapshot, rows: &[Row]) {
    let latest = rows
        .iter()
        .find_map(|row| row.number(columns::MARGIN_BALANCE).map(|balance| (row, balance)));

    match latest {
        Some((row, balance)) => {
            snapshot.margin_balance = balance;
            snapshot.margin_date = row.text(columns::TRADE_DATE);
        }
        None => warn!("Margin data contained no usable balance"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, ReviewError};
    use async_trait::async_trait;
    use review_llm::{
        CompletionRequest, CompletionResponse, LLMError, LLMProvider, Message, StopReason,
        TokenUsage,
    };
    use serde_json::json;
    use tokio::sync::Mutex;

    /// Data provider with switchable failing sections
    #[derive(Default)]
    struct MockData {
        fail_indices: bool,
        fail_stocks: bool,
        fail_sectors: bool,
        fail_margin: bool,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    impl MockData {
        async fn record(&self, call: &'static str, fail: bool, rows: Vec<Row>) -> Result<Vec<Row>> {
            self.calls.lock().await.push(call);
            if fail {
                Err(ReviewError::DataProvider(format!("{call} unavailable")))
            } else {
                Ok(rows)
            }
        }
    }

    fn index_rows() -> Vec<Row> {
        vec![
            Row::new()
                .with(columns::CODE, json!("sh000001"))
                .with(columns::NAME, json!("上证指数"))
                .with(columns::CURRENT, json!(3200.5))
                .with(columns::CHANGE_PCT, json!(0.85)),
            Row::new()
                .with(columns::CODE, json!("sz399006"))
                .with(columns::NAME, json!("创业板指"))
                .with(columns::CURRENT, json!(2100.0))
                .with(columns::CHANGE_PCT, json!(-1.2)),
        ]
    }

    fn stock_rows() -> Vec<Row> {
        [10.0, -9.95, 0.0, 5.0, -11.0]
            .iter()
            .map(|pct| {
                Row::new()
                    .with(columns::CHANGE_PCT, json!(pct))
                    .with(columns::AMOUNT, json!(2e11))
            })
            .collect()
    }

    fn sector_rows() -> Vec<Row> {
        vec![
            Row::new().with(columns::NAME, json!("半导体")).with(columns::CHANGE_PCT, json!(3.1)),
            Row::new().with(columns::NAME, json!("银行")).with(columns::CHANGE_PCT, json!(-0.4)),
        ]
    }

    fn margin_rows() -> Vec<Row> {
        vec![
            Row::new()
                .with(columns::TRADE_DATE, json!("2025-01-09"))
                .with(columns::MARGIN_BALANCE, json!(1.85e12)),
        ]
    }

    #[async_trait]
    impl MarketDataProvider for MockData {
        async fn index_quotes(&self) -> Result<Vec<Row>> {
            self.record("index", self.fail_indices, index_rows()).await
        }

        async fn stock_quotes(&self) -> Result<Vec<Row>> {
            self.record("stocks", self.fail_stocks, stock_rows()).await
        }

        async fn sector_quotes(&self) -> Result<Vec<Row>> {
            self.record("sectors", self.fail_sectors, sector_rows()).await
        }

        async fn margin_balance(&self) -> Result<Vec<Row>> {
            self.record("margin", self.fail_margin, margin_rows()).await
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    struct MockNews {
        fail_after: usize,
        queries: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl NewsSearch for MockNews {
        async fn search(&self, query: &str, max_results: usize) -> Result<Vec<NewsItem>> {
            let mut queries = self.queries.lock().await;
            queries.push(query.to_string());
            if queries.len() > self.fail_after {
                return Err(ReviewError::News("quota exceeded".into()));
            }
            Ok((0..max_results)
                .map(|i| NewsItem::new(format!("{query} #{i}"), "snippet"))
                .collect())
        }

        fn name(&self) -> &str {
            "mock-news"
        }
    }

    struct MockLlm {
        reply: String,
    }

    #[async_trait]
    impl LLMProvider for MockLlm {
        async fn complete(&self, request: CompletionRequest) -> review_llm::Result<CompletionResponse> {
            if self.reply.is_empty() {
                return Err(LLMError::RequestFailed("HTTP 503: overloaded".into()));
            }
            Ok(CompletionResponse {
                message: Message::assistant(self.reply.clone()),
                model: request.model,
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            })
        }

        fn name(&self) -> &str {
            "mock-llm"
        }
    }

    fn generator(reply: &str) -> FailoverGenerator {
        FailoverGenerator::new(
            Some(Arc::new(MockLlm {
                reply: reply.to_string(),
            })),
            "primary",
            "fallback",
            None,
            RetryPolicy::immediate(2),
        )
    }

    fn analyzer(data: MockData, generator: FailoverGenerator) -> MarketAnalyzer {
        MarketAnalyzer::new(Arc::new(data), None, generator).with_data_retry(RetryPolicy::immediate(2))
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()
    }

    #[tokio::test]
    async fn test_full_overview() {
        let analyzer = analyzer(MockData::default(), FailoverGenerator::unavailable());
        let snapshot = analyzer.overview_for(date()).await;

        assert_eq!(snapshot.indices.len(), 2);
        assert_eq!(snapshot.indices[0].code, "sh000001");
        assert_eq!(snapshot.up_count, 2);
        assert_eq!(snapshot.down_count, 2);
        assert_eq!(snapshot.limit_down_count, 2);
        assert_eq!(snapshot.top_sectors[0].name, "半导体");
        assert_eq!(snapshot.margin_date.as_deref(), Some("2025-01-09"));
        assert!((snapshot.margin_balance - 1.85e12).abs() < 1.0);
        assert_eq!(snapshot.north_flow, 0.0);
    }

    #[tokio::test]
    async fn test_sector_failure_is_isolated() {
        let data = MockData {
            fail_sectors: true,
            ..MockData::default()
        };
        let calls = data.calls.clone();
        let analyzer = analyzer(data, FailoverGenerator::unavailable());
        let snapshot = analyzer.overview_for(date()).await;

        assert_eq!(snapshot.indices.len(), 2);
        assert!(snapshot.top_sectors.is_empty());
        assert!(snapshot.bottom_sectors.is_empty());
        assert_eq!(snapshot.up_count, 2);

        let calls = calls.lock().await;
        assert_eq!(calls.iter().filter(|c| **c == "sectors").count(), 2);
        assert_eq!(calls.last(), Some(&"margin"));
    }

    #[tokio::test]
    async fn test_everything_fails_keeps_defaults() {
        let data = MockData {
            fail_indices: true,
            fail_stocks: true,
            fail_sectors: true,
            fail_margin: true,
            ..MockData::default()
        };
        let analyzer = analyzer(data, FailoverGenerator::unavailable());
        let snapshot = analyzer.overview_for(date()).await;

        assert_eq!(snapshot, MarketSnapshot::new(date()));
    }

    #[tokio::test]
    async fn test_report_without_provider() {
        let mut analyzer = analyzer(MockData::default(), FailoverGenerator::unavailable());
        let snapshot = MarketSnapshot::new(date());
        let report = analyzer.generate_report(&snapshot, &[]).await;

        assert!(!report.trim().is_empty());
        assert_eq!(report, analyzer.generate_report(&snapshot, &[]).await);
    }

    #[tokio::test]
    async fn test_report_from_provider() {
        let mut analyzer = analyzer(MockData::default(), generator("## 今日复盘\n指数震荡。"));
        let snapshot = analyzer.overview_for(date()).await;
        let report = analyzer.generate_report(&snapshot, &[]).await;

        assert_eq!(report, "## 今日复盘\n指数震荡。");
    }

    #[tokio::test]
    async fn test_provider_failure_uses_template() {
        let mut analyzer = analyzer(MockData::default(), generator(""));
        let snapshot = analyzer.overview_for(date()).await;
        let report = analyzer.generate_report(&snapshot, &[]).await;

        let template = render_template_review(Language::Chinese, &snapshot).unwrap();
        assert_eq!(report, template);
    }

    #[tokio::test]
    async fn test_news_without_service() {
        let analyzer = analyzer(MockData::default(), FailoverGenerator::unavailable());
        assert!(analyzer.search_market_news().await.is_empty());
    }

    #[tokio::test]
    async fn test_news_collects_until_error() {
        let queries = Arc::new(Mutex::new(Vec::new()));
        let news = MockNews {
            fail_after: 1,
            queries: queries.clone(),
        };
        let analyzer = MarketAnalyzer::new(
            Arc::new(MockData::default()),
            Some(Arc::new(news)),
            FailoverGenerator::unavailable(),
        );
        let items = analyzer.search_market_news().await;

        assert_eq!(items.len(), NEWS_PER_QUERY);
        assert_eq!(queries.lock().await.len(), 2);
    }

    #[test]
    fn test_news_queries() {
        let queries = news_queries(date());
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[0], "A股 大盘 复盘 2025年1月");
        assert!(queries.iter().all(|q| q.ends_with("2025年1月")));
    }
}
