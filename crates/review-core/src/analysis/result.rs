//! Structured outcome of a single-stock analysis

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Outcome of one stock analysis
///
/// Deserialises leniently from model output: every field has a default,
/// text fields accept null, numbers, booleans and lists, and
/// `sentiment_score` accepts numbers or numeric strings, clamped to 0..=100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisResult {
    #[serde(deserialize_with = "lenient_text")]
    pub code: String,
    #[serde(deserialize_with = "lenient_text")]
    pub name: String,

    /// 0-100; above 60 bullish, below 40 bearish
    #[serde(deserialize_with = "lenient_score")]
    pub sentiment_score: u8,
    #[serde(deserialize_with = "lenient_trend")]
    pub trend_prediction: String,
    #[serde(deserialize_with = "lenient_advice")]
    pub operation_advice: String,
    #[serde(deserialize_with = "lenient_confidence")]
    pub confidence_level: String,

    /// Structured decision dashboard as returned by the model
    pub dashboard: Option<Value>,


    #[serde(deserialize_with = "lenient_text")]
    pub trend_analysis: String,
    #[serde(deserialize_with = "lenient_text")]
    pub short_term_outlook: String,
    #[serde(deserialize_with = "lenient_text")]
    pub medium_term_outlook: String,
    #[serde(deserialize_with = "lenient_text")]
    pub technical_analysis: String,
    #[serde(deserialize_with = "lenient_text")]
    pub ma_analysis: String,
    #[serde(deserialize_with = "lenient_text")]
    pub volume_analysis: String,
    #[serde(deserialize_with = "lenient_text")]
    pub pattern_analysis: String,
    #[serde(deserialize_with = "lenient_text")]
    pub fundamental_analysis: String,
    #[serde(deserialize_with = "lenient_text")]
    pub sector_position: String,
    #[serde(deserialize_with = "lenient_text")]
    pub company_highlights: String,
    #[serde(deserialize_with = "lenient_text")]
    pub news_summary: String,
    #[serde(deserialize_with = "lenient_text")]
    pub market_sentiment: String,
    #[serde(deserialize_with = "lenient_text")]
    pub hot_topics: String,
    #[serde(deserialize_with = "lenient_text")]
    pub analysis_summary: String,
    #[serde(deserialize_with = "lenient_text")]
    pub key_points: String,
    #[serde(deserialize_with = "lenient_text")]
    pub risk_warning: String,
    #[serde(deserialize_with = "lenient_text")]
    pub buy_reason: String,

    /// Raw model text, kept for debugging
    #[serde(skip)]
    pub raw_response: Option<String>,
    #[serde(deserialize_with = "lenient_flag")]
    pub search_performed: bool,
    #[serde(deserialize_with = "lenient_text")]
    pub data_sources: String,
    #[serde(deserialize_with = "lenient_flag")]
    pub success: bool,
    #[serde(deserialize_with = "lenient_optional_text")]
    pub error_message: Option<String>,
}

impl Default for AnalysisResult {
    fn default() -> Self {
        Self {
            code: String::new(),
            name: String::new(),
            sentiment_score: 50,
            trend_prediction: "震荡".to_string(),
            operation_advice: "持有".to_string(),
            confidence_level: "中".to_string(),
            dashboard: None,
            trend_analysis: String::new(),
            short_term_outlook: String::new(),
            medium_term_outlook: String::new(),
            technical_analysis: String::new(),
            ma_analysis: String::new(),
            volume_analysis: String::new(),
            pattern_analysis: String::new(),
            fundamental_analysis: String::new(),
            sector_position: String::new(),
            company_highlights: String::new(),
            news_summary: String::new(),
            market_sentiment: String::new(),
            hot_topics: String::new(),
            analysis_summary: String::new(),
            key_points: String::new(),
            risk_warning: String::new(),
            buy_reason: String::new(),
            raw_response: None,
            search_performed: false,
            data_sources: String::new(),
            success: true,
            error_message: None,
        }
    }
}

impl AnalysisResult {
    /// Neutral result recording a failure
    pub fn failed(code: &str, name: &str, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            code: code.to_string(),
            name: name.to_string(),
            confidence_level: "低".to_string(),
            analysis_summary: format!("分析失败: {}", error.chars().take(100).collect::<String>()),
            risk_warning: "分析失败，请稍后重试或手动分析".to_string(),
            success: false,
            error_message: Some(error),
            ..Self::default()
        }
    }

    /// Plain key/value view
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// One-sentence conclusion, falling back to the summary
    pub fn core_conclusion(&self) -> String {
        self.dashboard_str(&["core_conclusion", "one_sentence"])
            .unwrap_or_else(|| self.analysis_summary.clone())
    }

    /// Advice for holders or for those without a position
    pub fn position_advice(&self, has_position: bool) -> String {
        let key = if has_position {
            "has_position"
        } else {
            "no_position"
        };
        self.dashboard_str(&["core_conclusion", "position_advice", key])
            .unwrap_or_else(|| self.operation_advice.clone())
    }

    /// Entry, stop-loss and take-profit levels
    pub fn sniper_points(&self) -> BTreeMap<String, String> {
        match self.dashboard_path(&["battle_plan", "sniper_points"]) {
            Some(Value::Object(points)) => points
                .iter()
                .filter_map(|(k, v)| value_text(v).map(|text| (k.clone(), text)))
                .collect(),
            _ => BTreeMap::new(),
        }
    }

    pub fn checklist(&self) -> Vec<String> {
        self.dashboard_list(&["battle_plan", "action_checklist"])
    }

    pub fn risk_alerts(&self) -> Vec<String> {
        self.dashboard_list(&["intelligence", "risk_alerts"])
    }

    /// Traffic-light emoji for the operation advice
    pub fn emoji(&self) -> &'static str {
        match self.operation_advice.as_str() {
            "买入" | "加仓" => "🟢",
            "强烈买入" => "💚",
            "观望" => "⚪",
            "减仓" => "🟠",
            "卖出" => "🔴",
            "强烈卖出" => "❌",
            _ => "🟡",
        }
    }

    pub fn confidence_stars(&self) -> &'static str {
        match self.confidence_level.as_str() {
            "高" => "⭐⭐⭐",
            "低" => "⭐",
            _ => "⭐⭐",
        }
    }

    fn dashboard_path(&self, path: &[&str]) -> Option<&Value> {
        path.iter()
            .try_fold(self.dashboard.as_ref()?, |value, key| value.get(key))
    }

    fn dashboard_str(&self, path: &[&str]) -> Option<String> {
        self.dashboard_path(path).and_then(value_text)
    }

    fn dashboard_list(&self, path: &[&str]) -> Vec<String> {
        match self.dashboard_path(path) {
            Some(Value::Array(items)) => items.iter().filter_map(value_text).collect(),
            _ => Vec::new(),
        }
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Flatten any JSON value into text; lists become one item per line
fn flatten_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(flatten_text)
            .filter(|item| !item.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(_) => value.to_string(),
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Value::deserialize(deserializer).map(|value| flatten_text(&value))
}

/// Categorical text; blank values keep the neutral default
fn lenient_label<'de, D: Deserializer<'de>>(
    deserializer: D,
    default: &str,
) -> Result<String, D::Error> {
    let text = lenient_text(deserializer)?;
    let text = text.trim();
    Ok(if text.is_empty() { default } else { text }.to_string())
}

fn lenient_trend<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    lenient_label(deserializer, "震荡")
}

fn lenient_advice<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    lenient_label(deserializer, "持有")
}

fn lenient_confidence<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    lenient_label(deserializer, "中")
}

fn lenient_optional_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let text = lenient_text(deserializer)?;
    Ok(Some(text).filter(|t| !t.trim().is_empty()))
}

fn lenient_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1" | "是"),
        _ => false,
    })
}

fn lenient_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let score = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(score
        .filter(|s| s.is_finite())
        .map_or(50, |s| s.round().clamp(0.0, 100.0) as u8))
}
