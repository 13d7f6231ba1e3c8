//! Interpreting model replies as analysis results

use super::AnalysisResult;
use regex::Regex;
use tracing::warn;

const TRAILING_COMMA: &str = r",\s*([}\]])";

const POSITIVE_KEYWORDS: &[&str] = &[
    "看多", "买入", "上涨", "突破", "强势", "利好", "加仓", "bullish", "buy",
];
const NEGATIVE_KEYWORDS: &[&str] = &[
    "看空", "卖出", "下跌", "跌破", "弱势", "利空", "减仓", "bearish", "sell",
];

const SUMMARY_CHARS: usize = 500;

/// Pull the JSON object out of a model reply
///
/// Strips Markdown code fences, keeps the outermost `{...}` and removes
/// trailing commas before `}` or `]`.
pub fn extract_json(text: &str) -> Option<String> {
    let cleaned = text.replace("```json", "").replace("```", "");
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end <= start {
        return None;
    }
    let trailing_comma = Regex::new(TRAILING_COMMA).ok()?;
    Some(
        trailing_comma
            .replace_all(&cleaned[start..=end], "$1")
            .into_owned(),
    )
}

/// Turn a model reply into a result for the given stock
///
/// JSON replies are deserialised with defaults for missing fields; anything
/// else goes through a keyword count. `search_performed` always reflects
/// whether news was supplied.
pub fn parse_response(
    text: &str,
    code: &str,
    name: &str,
    search_performed: bool,
) -> AnalysisResult {
    let parsed = extract_json(text)
        .and_then(|json| match serde_json::from_str::<AnalysisResult>(&json) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!("[{}] JSON reply could not be parsed ({}), using text fallback", code, e);
                None
            }
        });

    let mut result = parsed.unwrap_or_else(|| parse_text(text));
    result.code = code.to_string();
    result.name = name.to_string();
    result.search_performed = search_performed;
    result.success = true;
    result.error_message = None;
    result.raw_response = Some(text.to_string());
    result
}

/// Keyword-count fallback for replies without usable JSON
fn parse_text(text: &str) -> AnalysisResult {
    let lower = text.to_lowercase();
    let positive = POSITIVE_KEYWORDS.iter().filter(|k| lower.contains(*k)).count();
    let negative = NEGATIVE_KEYWORDS.iter().filter(|k| lower.contains(*k)).count();

    let (score, trend, advice) = if positive > negative + 1 {
        (65, "看多", "买入")
    } else if negative > positive + 1 {
        (35, "看空", "卖出")
    } else {
        (50, "震荡", "持有")
    };

    AnalysisResult {
        sentiment_score: score,
        trend_prediction: trend.to_string(),
        operation_advice: advice.to_string(),
        confidence_level: "低".to_string(),
        analysis_summary: text.chars().take(SUMMARY_CHARS).collect(),
        key_points: "JSON解析失败，仅供参考".to_string(),
        risk_warning: "分析结果可能不准确，建议结合其他信息判断".to_string(),
        ..AnalysisResult::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_fenced_block() {
        let text = "分析如下：\n```json\n{\"sentiment_score\": 78, \"dashboard\": {\"a\": [1, 2,],},}\n```\n以上";
        let json = extract_json(text).unwrap();
        assert_eq!(json, "{\"sentiment_score\": 78, \"dashboard\": {\"a\": [1, 2]}}");
        assert!(serde_json::from_str::<serde_json::Value>(&json).is_ok());
    }

    #[test]
    fn test_extract_without_braces() {
        assert!(extract_json("no json here").is_none());
        assert!(extract_json("} backwards {").is_none());
    }

    #[test]
    fn test_parse_json_reply() {
        let reply = r#"```json
{
  "sentiment_score": 82,
  "trend_prediction": "看多",
  "operation_advice": "买入",
  "confidence_level": "高",
  "analysis_summary": "均线多头排列",
  "search_performed": true,
}
```"#;
        let result = parse_response(reply, "600519", "贵州茅台", false);
        assert!(result.success);
        assert_eq!(result.code, "600519");
        assert_eq!(result.name, "贵州茅台");
        assert_eq!(result.sentiment_score, 82);
        assert_eq!(result.operation_advice, "买入");
        assert_eq!(result.analysis_summary, "均线多头排列");
        assert!(!result.search_performed);
        assert_eq!(result.raw_response.as_deref(), Some(reply));
    }

    #[test]
    fn test_null_field_keeps_json_reply() {
        let reply = r#"{"sentiment_score": 82, "trend_prediction": "看多", "operation_advice": "买入", "confidence_level": "高", "news_summary": null}"#;
        let result = parse_response(reply, "600519", "贵州茅台", false);

        assert_eq!(result.sentiment_score, 82);
        assert_eq!(result.confidence_level, "高");
        assert_eq!(result.news_summary, "");
        assert!(result.key_points.is_empty());
    }

    #[test]
    fn test_list_field_keeps_json_reply() {
        let reply = r#"{"sentiment_score": 30, "trend_prediction": "看空", "operation_advice": "减仓", "risk_warning": ["高位减持", "业绩下滑"], "dashboard": {"intelligence": {"risk_alerts": ["高位减持"]}}}"#;
        let result = parse_response(reply, "300750", "宁德时代", true);

        assert_eq!(result.sentiment_score, 30);
        assert_eq!(result.operation_advice, "减仓");
        assert!(result.risk_warning.contains("业绩下滑"));
        assert_eq!(result.risk_alerts(), vec!["高位减持".to_string()]);
        assert!(result.search_performed);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let result = parse_response("{\"analysis_summary\": \"ok\"}", "000001", "平安银行", true);
        assert_eq!(result.sentiment_score, 50);
        assert_eq!(result.trend_prediction, "震荡");
        assert_eq!(result.confidence_level, "中");
        assert!(result.search_performed);
    }

    #[test]
    fn test_text_fallback_positive() {
        let reply = "技术面强势突破，资金看多，建议买入，消息面利好。";
        let result = parse_response(reply, "300750", "宁德时代", false);
        assert_eq!(result.sentiment_score, 65);
        assert_eq!(result.trend_prediction, "看多");
        assert_eq!(result.operation_advice, "买入");
        assert_eq!(result.confidence_level, "低");
        assert!(result.success);
    }

    #[test]
    fn test_text_fallback_negative_and_neutral() {
        let result = parse_response("放量跌破年线，趋势看空，建议卖出或减仓", "1", "x", false);
        assert_eq!(result.sentiment_score, 35);
        assert_eq!(result.operation_advice, "卖出");

        let result = parse_response("上涨乏力，也有下跌风险", "1", "x", false);
        assert_eq!(result.sentiment_score, 50);
        assert_eq!(result.trend_prediction, "震荡");
    }

    #[test]
    fn test_text_fallback_summary_is_truncated() {
        let reply = "平".repeat(800);
        let result = parse_response(&reply, "1", "x", false);
        assert_eq!(result.analysis_summary.chars().count(), 500);
    }

    #[test]
    fn test_malformed_json_falls_back_to_text() {
        let result = parse_response("{\"sentiment_score\": 80, 看多 买入 突破}", "1", "x", false);
        assert_eq!(result.sentiment_score, 65);
    }
}
