//! Loosely-typed provider rows and canonical column names

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Canonical column names shared by every provider
pub mod columns {
    pub const CODE: &str = "code";
    pub const NAME: &str = "name";
    pub const CURRENT: &str = "current";
    pub const CHANGE: &str = "change";
    pub const CHANGE_PCT: &str = "change_pct";
    pub const OPEN: &str = "open";
    pub const HIGH: &str = "high";
    pub const LOW: &str = "low";
    pub const PREV_CLOSE: &str = "prev_close";
    pub const VOLUME: &str = "volume";
    pub const AMOUNT: &str = "amount";
    pub const AMPLITUDE: &str = "amplitude";
    pub const TURNOVER_RATE: &str = "turnover_rate";
    pub const VOLUME_RATIO: &str = "volume_ratio";
    pub const TRADE_DATE: &str = "trade_date";
    pub const MARGIN_BALANCE: &str = "margin_balance";
}

/// One loosely-typed record from a tabular provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(HashMap<String, Value>);

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Set a column value
    pub fn insert(&mut self, column: &str, value: impl Into<Value>) {
        self.0.insert(column.to_string(), value.into());
    }

    /// Raw value of a column
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Whether the row has no columns
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Text value of a column; numbers are rendered, blanks are missing
    pub fn text(&self, column: &str) -> Option<String> {
        match self.0.get(column)? {
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Numeric value of a column
    ///
    /// Accepts JSON numbers and numeric strings. `null`, `"-"`, blanks and
    /// non-numeric text are missing, as are NaN and infinities.
    pub fn number(&self, column: &str) -> Option<f64> {
        let value = match self.0.get(column)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
            _ => None,
        }?;
        value.is_finite().then_some(value)
    }

    /// Numeric value of a column, zero when missing
    pub fn number_or_zero(&self, column: &str) -> f64 {
        self.number(column).unwrap_or(0.0)
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
