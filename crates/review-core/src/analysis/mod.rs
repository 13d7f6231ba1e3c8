//! Single-stock analysis
//!
//! [`StockAnalyzer`] formats a [`StockContext`] into a prompt, sends it
//! through the failover generator and turns the reply into an
//! [`AnalysisResult`]. It always returns a result; failures are recorded in
//! the result instead of being raised.

mod analyzer;
mod context;
mod names;
mod parser;
mod result;

pub use analyzer::StockAnalyzer;
pub use context::{DailyBar, StockContext};
pub use names::stock_name;
pub use parser::{extract_json, parse_response};
pub use result::AnalysisResult;
