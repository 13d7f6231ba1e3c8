//! Single-stock analysis prompts

use super::{BilingualTemplate, Language};
use crate::analysis::StockContext;
use crate::error::Result;
use serde::Serialize;

const STOCK_SYSTEM_ZH: &str = r#"你是一名专注A股短线交易的资深分析师，只看核心辨识度标的，纪律严格，止损果断。

请结合给定的行情数据与新闻，输出一份【决策仪表盘】。只输出一个 JSON 对象，不要输出任何其它文字，字段如下：

{
  "sentiment_score": 0-100 的整数,
  "trend_prediction": "强烈看多/看多/震荡/看空/强烈看空",
  "operation_advice": "买入/加仓/持有/减仓/卖出/观望",
  "confidence_level": "高/中/低",
  "dashboard": {
    "core_conclusion": {
      "one_sentence": "一句话结论",
      "signal_type": "信号类型",
      "time_sensitivity": "时效性",
      "position_advice": {"no_position": "空仓者建议", "has_position": "持仓者建议"}
    },
    "data_perspective": {
      "trend_status": {"ma_alignment": "均线排列", "is_bullish": true, "trend_score": 0},
      "price_position": {"current_price": 0, "ma5": 0, "ma10": 0, "ma20": 0, "bias_ma5": 0, "support_level": 0, "resistance_level": 0},
      "volume_analysis": {"volume_ratio": 0, "volume_status": "放量/缩量/平量", "turnover_rate": 0, "volume_meaning": "量能解读"}
    },
    "intelligence": {
      "latest_news": "最新消息解读",
      "risk_alerts": ["风险点"],
      "positive_catalysts": ["利好催化"],
      "sentiment_summary": "情绪总结"
    },
    "battle_plan": {
      "sniper_points": {"ideal_buy": "理想买点", "secondary_buy": "次优买点", "stop_loss": "止损位", "take_profit": "止盈位"},
      "position_strategy": {"suggested_position": "建议仓位", "entry_plan": "建仓计划", "risk_control": "风控"},
      "action_checklist": ["✅/⚠️/❌ 检查项"]
    }
  },
  "analysis_summary": "100字综合分析",
  "key_points": "3-5个核心看点",
  "risk_warning": "风险提示",
  "buy_reason": "操作理由",
  "trend_analysis": "走势形态",
  "short_term_outlook": "1-3日展望",
  "medium_term_outlook": "1-2周展望",
  "technical_analysis": "技术面",
  "ma_analysis": "均线系统",
  "volume_analysis": "量能",
  "pattern_analysis": "K线形态",
  "fundamental_analysis": "基本面",
  "sector_position": "板块地位",
  "company_highlights": "亮点与风险",
  "news_summary": "新闻摘要",
  "market_sentiment": "市场情绪",
  "hot_topics": "相关热点",
  "data_sources": "数据来源"
}

评分标准：80-100 强烈看多（多头排列、低乖离、量价配合、利好催化）；60-79 看多；40-59 震荡观望；0-39 看空（空头排列、跌破 MA20、放量下跌、重大利空）。狙击点位必须给出具体价格。"#;

const STOCK_SYSTEM_EN: &str = r#"You are a senior short-term trader of China A-shares with strict discipline.

Using the market data and news provided, produce a decision dashboard. Output exactly one JSON object and nothing else, with the fields:

{
  "sentiment_score": integer 0-100,
  "trend_prediction": "强烈看多/看多/震荡/看空/强烈看空",
  "operation_advice": "买入/加仓/持有/减仓/卖出/观望",
  "confidence_level": "高/中/低",
  "dashboard": {
    "core_conclusion": {"one_sentence": "...", "signal_type": "...", "time_sensitivity": "...",
      "position_advice": {"no_position": "...", "has_position": "..."}},
    "intelligence": {"latest_news": "...", "risk_alerts": ["..."], "positive_catalysts": ["..."], "sentiment_summary": "..."},
    "battle_plan": {
      "sniper_points": {"ideal_buy": "...", "secondary_buy": "...", "stop_loss": "...", "take_profit": "..."},
      "action_checklist": ["✅/⚠️/❌ ..."]
    }
  },
  "analysis_summary": "...", "key_points": "...", "risk_warning": "...", "buy_reason": "...",
  "trend_analysis": "...", "short_term_outlook": "...", "medium_term_outlook": "...",
  "technical_analysis": "...", "ma_analysis": "...", "volume_analysis": "...", "pattern_analysis": "...",
  "fundamental_analysis": "...", "sector_position": "...", "company_highlights": "...",
  "news_summary": "...", "market_sentiment": "...", "hot_topics": "...", "data_sources": "..."
}

Keep the categorical fields in the Chinese vocabulary shown. Scoring: 80-100 strongly bullish, 60-79 bullish, 40-59 neutral, 0-39 bearish. Sniper points must name concrete prices."#;

const STOCK_PROMPT: BilingualTemplate = BilingualTemplate::new(
    "stock_prompt",
    r"# 股票分析请求

## 基本信息
- 代码: {{ code }}
- 名称: {{ name }}
- 日期: {{ date }}

## 今日行情
| 指标 | 数值 |
|------|------|
{% for row in bar %}| {{ row[0] }} | {{ row[1] }} |
{% endfor %}
{% if trend %}## 趋势分析
{{ trend }}
{% endif %}
## 新闻与舆情
{% if news %}{{ news }}
{% else %}未搜索到近期新闻，请仅依据行情数据分析。
{% endif %}
请输出 {{ name }}({{ code }}) 的决策仪表盘 JSON。
",
    r"# Stock analysis request

## Basics
- Code: {{ code }}
- Name: {{ name }}
- Date: {{ date }}

## Today's bar
| Metric | Value |
|------|------|
{% for row in bar %}| {{ row[0] }} | {{ row[1] }} |
{% endfor %}
{% if trend %}## Trend notes
{{ trend }}
{% endif %}
## News
{% if news %}{{ news }}
{% else %}No recent news found; analyse from market data only.
{% endif %}
Output the decision dashboard JSON for {{ name }} ({{ code }}).
",
);

#[derive(Serialize)]
struct StockView<'a> {
    code: &'a str,
    name: String,
    date: String,
    bar: Vec<(&'static str, String)>,
    trend: Option<&'a str>,
    news: Option<&'a str>,
}

/// System instruction for single-stock analysis
pub fn stock_system_prompt(lang: Language) -> &'static str {
    match lang {
        Language::Chinese => STOCK_SYSTEM_ZH,
        Language::English => STOCK_SYSTEM_EN,
    }
}

/// User prompt for one stock
pub fn render_stock_prompt(
    lang: Language,
    context: &StockContext,
    news_context: Option<&str>,
) -> Result<String> {
    let view = StockView {
        code: &context.code,
        name: context.display_name(),
        date: context.date.to_string(),
        bar: bar_rows(context, lang),
        trend: context.trend_notes.as_deref().filter(|t| !t.trim().is_empty()),
        news: news_context.filter(|n| !n.trim().is_empty()),
    };
    STOCK_PROMPT.render(lang, &view)
}

fn bar_rows(context: &StockContext, lang: Language) -> Vec<(&'static str, String)> {
    let bar = &context.today;
    let labels: [&'static str; 12] = match lang {
        Language::Chinese => [
            "收盘价", "开盘价", "最高价", "最低价", "涨跌幅", "成交量", "成交额", "MA5", "MA10",
            "MA20", "量比", "换手率",
        ],
        Language::English => [
            "Close", "Open", "High", "Low", "Change", "Volume", "Amount", "MA5", "MA10", "MA20",
            "Volume ratio", "Turnover",
        ],
    };
    let values = [
        Some(format!("{:.2}", bar.close)),
        Some(format!("{:.2}", bar.open)),
        Some(format!("{:.2}", bar.high)),
        Some(format!("{:.2}", bar.low)),
        Some(format!("{:+.2}%", bar.change_pct)),
        Some(format!("{:.0}", bar.volume)),
        Some(format!("{:.0}", bar.amount)),
        bar.ma5.map(|v| format!("{v:.2}")),
        bar.ma10.map(|v| format!("{v:.2}")),
        bar.ma20.map(|v| format!("{v:.2}")),
        bar.volume_ratio.map(|v| format!("{v:.2}")),
        bar.turnover_rate.map(|v| format!("{v:.2}%")),
    ];

    let mut rows: Vec<(&'static str, String)> = labels
        .into_iter()
        .zip(values)
        .filter_map(|(label, value)| value.map(|v| (label, v)))
        .collect();

    if let Some(prev_close) = context.prev_close {
        let label = match lang {
            Language::Chinese => "昨收",
            Language::English => "Previous close",
        };
        rows.push((label, format!("{prev_close:.2}")));
    }
    rows
}
