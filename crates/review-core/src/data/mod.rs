//! Market data access
//!
//! Providers return loosely-typed [`Row`]s keyed by the canonical names in
//! [`columns`]. Mapping rows onto strict records happens in
//! [`crate::snapshot`], with zero as the documented default for anything
//! missing.

mod eastmoney;
mod row;

pub use eastmoney::EastmoneyClient;
pub use row::{Row, columns};

use crate::error::Result;
use async_trait::async_trait;

/// Source of tabular market data
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Spot quotes for all exchange indices
    async fn index_quotes(&self) -> Result<Vec<Row>>;

    /// Spot quotes for every listed A-share
    async fn stock_quotes(&self) -> Result<Vec<Row>>;

    /// Spot quotes for industry sectors
    async fn sector_quotes(&self) -> Result<Vec<Row>>;

    /// Recent two-market margin balance, newest first
    async fn margin_balance(&self) -> Result<Vec<Row>>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
