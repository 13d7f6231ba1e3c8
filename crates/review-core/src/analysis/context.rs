//! Per-stock market context fed into the analysis prompt

use super::stock_name;
use crate::data::{Row, columns};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Today's trading bar with the indicators the prompt shows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub close: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub change_pct: f64,
    pub volume: f64,
    pub amount: f64,
    pub ma5: Option<f64>,
    pub ma10: Option<f64>,
    pub ma20: Option<f64>,
    pub volume_ratio: Option<f64>,
    pub turnover_rate: Option<f64>,
}

/// Everything known about one stock before it is analysed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockContext {
    pub code: String,
    pub name: Option<String>,
    pub date: NaiveDate,
    pub today: DailyBar,
    pub prev_close: Option<f64>,
    pub trend_notes: Option<String>,
}

impl StockContext {
    /// Context with an empty bar
    pub fn new(code: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            code: code.into(),
            name: None,
            date,
            today: DailyBar::default(),
            prev_close: None,
            trend_notes: None,
        }
    }

    /// Build from a full-market quote row; `None` without a code
    pub fn from_quote(row: &Row, date: NaiveDate) -> Option<Self> {
        let code = row.text(columns::CODE)?;
        Some(Self {
            code,
            name: row.text(columns::NAME),
            date,
            today: DailyBar {
                close: row.number_or_zero(columns::CURRENT),
                open: row.number_or_zero(columns::OPEN),
                high: row.number_or_zero(columns::HIGH),
                low: row.number_or_zero(columns::LOW),
                change_pct: row.number_or_zero(columns::CHANGE_PCT),
                volume: row.number_or_zero(columns::VOLUME),
                amount: row.number_or_zero(columns::AMOUNT),
                ma5: None,
                ma10: None,
                ma20: None,
                volume_ratio: row.number(columns::VOLUME_RATIO),
                turnover_rate: row.number(columns::TURNOVER_RATE),
            },
            prev_close: row.number(columns::PREV_CLOSE),
            trend_notes: None,
        })
    }

    /// Name to show: explicit name, then the built-in table, then `股票{code}`
    pub fn display_name(&self) -> String {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or_else(|| stock_name(&self.code).map(str::to_string))
            .unwrap_or_else(|| format!("股票{}", self.code))
    }
}
