//! Market review and stock analysis core
//!
//! Fetches A-share market data through a [`data::MarketDataProvider`],
//! optionally gathers news, and turns both into a Markdown market review or
//! a per-stock [`analysis::AnalysisResult`] via hosted text-generation
//! models. Every external call is retried with bounded backoff and
//! generation fails over between models and providers before degrading to a
//! deterministic template.

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod generation;
pub mod market;
pub mod news;
pub mod prompts;
pub mod retry;
pub mod snapshot;

pub use analysis::{AnalysisResult, StockAnalyzer, StockContext};
pub use config::ReviewConfig;
pub use error::{Result, ReviewError};
pub use generation::{FailoverGenerator, GenerationOptions, ProviderState};
pub use market::MarketAnalyzer;
pub use retry::RetryPolicy;
pub use snapshot::{IndexSnapshot, MarketSnapshot};
