//! Prompting the generator for single-stock analysis

use super::{AnalysisResult, StockContext, parse_response};
use crate::config::ReviewConfig;
use crate::generation::{FailoverGenerator, GenerationOptions};
use crate::prompts::{Language, render_stock_prompt, stock_system_prompt};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Per-stock analysis through the failover generator
#[derive(Debug)]
pub struct StockAnalyzer {
    generator: FailoverGenerator,
    options: GenerationOptions,
    language: Language,
}

impl StockAnalyzer {
    pub fn new(generator: FailoverGenerator, options: GenerationOptions, language: Language) -> Self {
        Self {
            generator,
            options,
            language,
        }
    }

    /// Build providers and options from configuration
    pub fn from_config(config: &ReviewConfig) -> Self {
        Self::new(
            FailoverGenerator::from_config(config),
            GenerationOptions::new(config.temperature, config.analysis_max_tokens),
            config.language,
        )
    }

    pub fn is_available(&self) -> bool {
        self.generator.is_available()
    }

    /// Analyse one stock; never fails
    ///
    /// `news_context` is pre-searched news text. Provider or prompt failures
    /// produce a neutral result with `success = false`.
    pub async fn analyze(
        &mut self,
        context: &StockContext,
        news_context: Option<&str>,
    ) -> AnalysisResult {
        let code = context.code.as_str();
        let name = context.display_name();

        if !self.generator.is_available() {
            warn!("[{}] No generation provider configured, skipping analysis", code);
            return AnalysisResult::failed(
                code,
                &name,
                "No generation provider configured; set GEMINI_API_KEY or OPENAI_API_KEY",
            );
        }

        let news_context = news_context.filter(|n| !n.trim().is_empty());
        let prompt = match render_stock_prompt(self.language, context, news_context) {
            Ok(prompt) => prompt,
            Err(e) => {
                error!("[{}] Failed to build prompt: {}", code, e);
                return AnalysisResult::failed(code, &name, e.to_string());
            }
        };

        info!(
            "[{}] {} analysing (prompt {} chars, news: {})",
            code,
            name,
            prompt.chars().count(),
            news_context.is_some()
        );

        let system = stock_system_prompt(self.language);
        match self.generator.generate(system, &prompt, self.options).await {
            Ok(reply) => {
                let result = parse_response(&reply, code, &name, news_context.is_some());
                info!(
                    "[{}] {} done: {} {} (score {})",
                    code, name, result.trend_prediction, result.operation_advice, result.sentiment_score
                );
                result
            }
            Err(e) => {
                error!("[{}] Analysis failed: {}", code, e);
                AnalysisResult::failed(code, &name, e.to_string())
            }
        }
    }

    /// Analyse stocks one after another, pausing `delay` between requests
    pub async fn analyze_batch(
        &mut self,
        contexts: &[StockContext],
        delay: Duration,
    ) -> Vec<AnalysisResult> {
        self.analyze_batch_with_news(contexts, &[], delay).await
    }

    /// Batch analysis where `news[i]` is the news context for `contexts[i]`
    ///
    /// Missing entries mean no news for that stock.
    pub async fn analyze_batch_with_news(
        &mut self,
        contexts: &[StockContext],
        news: &[Option<String>],
        delay: Duration,
    ) -> Vec<AnalysisResult> {
        let mut results = Vec::with_capacity(contexts.len());

        for (i, context) in contexts.iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                info!("Waiting {:.1}s before the next analysis", delay.as_secs_f64());
                sleep(delay).await;
            }
            let news_context = news.get(i).and_then(Option::as_deref);
            results.push(self.analyze(context, news_context).await);
        }

        results
    }
}
