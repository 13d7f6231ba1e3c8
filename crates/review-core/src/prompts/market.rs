//! Market review prompt and template report

use super::{BilingualTemplate, Language, directional_pct, truncate_chars};
use crate::error::Result;
use crate::news::NewsItem;
use crate::snapshot::{MarketSnapshot, SectorMove};
use serde::Serialize;

const MAX_PROMPT_NEWS: usize = 6;
const NEWS_TITLE_CHARS: usize = 50;
const NEWS_SNIPPET_CHARS: usize = 100;
const PROMPT_SECTORS: usize = 3;
const TEMPLATE_INDICES: usize = 4;
const TEMPLATE_SECTORS: usize = 2;

const REVIEW_SYSTEM_ZH: &str = "你是一名专注A股市场的资深复盘分析师。根据给定的当日数据撰写复盘报告，只输出 Markdown 文本，不要输出 JSON 或代码块，观点要直接、具体，不编造数据。";
const REVIEW_SYSTEM_EN: &str = "You are a senior analyst of the China A-share market. Write the daily market review from the data provided. Output Markdown only, no JSON and no code blocks. Be direct and specific and never invent numbers.";

const REVIEW_PROMPT: BilingualTemplate = BilingualTemplate::new(
    "review_prompt",
    r"# 今日市场数据

## 日期
{{ date }}

## 主要指数
{% for line in indices %}- {{ line }}
{% endfor %}
## 市场概况
- 上涨: {{ up }} 家 | 下跌: {{ down }} 家 | 平盘: {{ flat }} 家
- 涨停: {{ limit_up }} 家 | 跌停: {{ limit_down }} 家
- 两市成交额: {{ total_amount }} 亿元
- 北向资金: {{ north_flow }} 亿元
{% if margin %}- 两融余额({{ margin.date }}): {{ margin.balance }} 亿元
{% endif %}
## 板块表现
领涨: {{ top_sectors }}
领跌: {{ bottom_sectors }}

## 市场新闻
{% for item in news %}{{ loop.index }}. {{ item.title }}
   {{ item.snippet }}
{% else %}暂无相关新闻
{% endfor %}
---

# 输出要求
## {{ date }} 大盘复盘

### 一、情绪周期定位
### 二、量能与资金
### 三、板块与主线
### 四、风险点
### 五、明日展望
",
    r"# Market data

## Date
{{ date }}

## Main indices
{% for line in indices %}- {{ line }}
{% endfor %}
## Breadth
- Advancing: {{ up }} | Declining: {{ down }} | Unchanged: {{ flat }}
- Limit-up: {{ limit_up }} | Limit-down: {{ limit_down }}
- Turnover: {{ total_amount }} x100M CNY
- Northbound flow: {{ north_flow }} x100M CNY
{% if margin %}- Margin balance ({{ margin.date }}): {{ margin.balance }} x100M CNY
{% endif %}
## Sectors
Leading: {{ top_sectors }}
Lagging: {{ bottom_sectors }}

## News
{% for item in news %}{{ loop.index }}. {{ item.title }}
   {{ item.snippet }}
{% else %}No relevant news
{% endfor %}
---

# Required output
## {{ date }} Market Review

### 1. Sentiment cycle
### 2. Turnover and flows
### 3. Sectors and leading themes
### 4. Risks
### 5. Outlook for the next session
",
);

const TEMPLATE_REVIEW: BilingualTemplate = BilingualTemplate::new(
    "template_review",
    r"## {{ date }} 大盘复盘（模板版）

### 一、情绪定位
**当前状态**：{{ mood }}
两市成交额 **{{ total_amount }}亿**。

### 二、主要指数
{% for line in indices %}- {{ line }}
{% else %}- 暂无指数数据
{% endfor %}
### 三、涨跌统计
| 指标 | 数值 |
|------|------|
| 上涨家数 | {{ up }} |
| 下跌家数 | {{ down }} |
| 平盘家数 | {{ flat }} |
| 涨停 | {{ limit_up }} |
| 跌停 | {{ limit_down }} |
| 两市成交额 | {{ total_amount }}亿 |

**结论**：{{ conclusion }}

### 四、板块表现
- **领涨**：{{ top_sectors }}
- **领跌**：{{ bottom_sectors }}

### 五、风险提示
市场有风险，投资需谨慎。以上内容由模板生成，仅供参考，不构成投资建议。
",
    r"## {{ date }} Market Review (template)

### 1. Sentiment
**Current state**: {{ mood }}
Two-market turnover **{{ total_amount }} x100M CNY**.

### 2. Main indices
{% for line in indices %}- {{ line }}
{% else %}- No index data
{% endfor %}
### 3. Breadth
| Metric | Value |
|------|------|
| Advancing | {{ up }} |
| Declining | {{ down }} |
| Unchanged | {{ flat }} |
| Limit-up | {{ limit_up }} |
| Limit-down | {{ limit_down }} |
| Turnover | {{ total_amount }} x100M CNY |

**Conclusion**: {{ conclusion }}

### 4. Sectors
- **Leading**: {{ top_sectors }}
- **Lagging**: {{ bottom_sectors }}

### 5. Disclaimer
Generated from a template for reference only. Not investment advice.
",
);

/// Market temperature derived from breadth and turnover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketMood {
    /// Many limit-ups, almost no limit-downs
    Euphoric,
    /// Limit-downs spreading
    Ebb,
    /// Thin turnover, only a few leaders work
    StockGame,
    Choppy,
}

impl MarketMood {
    /// Classify a snapshot; rules are checked in order
    pub fn classify(snapshot: &MarketSnapshot) -> Self {
        if snapshot.limit_up_count > 60 && snapshot.limit_down_count < 5 {
            MarketMood::Euphoric
        } else if snapshot.limit_down_count > 15 {
            MarketMood::Ebb
        } else if snapshot.total_amount < 8000.0 {
            MarketMood::StockGame
        } else {
            MarketMood::Choppy
        }
    }

    fn describe(self, lang: Language) -> &'static str {
        match (self, lang) {
            (MarketMood::Euphoric, Language::Chinese) => "情绪亢奋，赚钱效应充分",
            (MarketMood::Ebb, Language::Chinese) => "跌停扩散，退潮预警",
            (MarketMood::StockGame, Language::Chinese) => "存量博弈，只有局部龙头能活",
            (MarketMood::Choppy, Language::Chinese) => "混沌震荡，只看核心辨识度",
            (MarketMood::Euphoric, Language::English) => "Euphoric, broad profit effect",
            (MarketMood::Ebb, Language::English) => "Limit-downs spreading, ebb warning",
            (MarketMood::StockGame, Language::English) => {
                "Thin turnover, only a few leaders survive"
            }
            (MarketMood::Choppy, Language::English) => "Choppy, focus on core leaders only",
        }
    }
}

#[derive(Serialize)]
struct NewsView {
    title: String,
    snippet: String,
}

#[derive(Serialize)]
struct MarginView {
    date: String,
    balance: String,
}

#[derive(Serialize)]
struct ReviewView {
    date: String,
    indices: Vec<String>,
    up: usize,
    down: usize,
    flat: usize,
    limit_up: usize,
    limit_down: usize,
    total_amount: String,
    north_flow: String,
    margin: Option<MarginView>,
    top_sectors: String,
    bottom_sectors: String,
    news: Vec<NewsView>,
}

#[derive(Serialize)]
struct TemplateView {
    date: String,
    mood: &'static str,
    conclusion: &'static str,
    indices: Vec<String>,
    up: usize,
    down: usize,
    flat: usize,
    limit_up: usize,
    limit_down: usize,
    total_amount: String,
    top_sectors: String,
    bottom_sectors: String,
}

/// System instruction for the market review
pub fn review_system_prompt(lang: Language) -> &'static str {
    match lang {
        Language::Chinese => REVIEW_SYSTEM_ZH,
        Language::English => REVIEW_SYSTEM_EN,
    }
}

/// User prompt for the market review
pub fn render_review_prompt(
    lang: Language,
    snapshot: &MarketSnapshot,
    news: &[NewsItem],
) -> Result<String> {
    let view = ReviewView {
        date: snapshot.date.to_string(),
        indices: snapshot
            .indices
            .iter()
            .map(|idx| {
                format!(
                    "{}: {:.2} ({})",
                    idx.name,
                    idx.current,
                    directional_pct(idx.change_pct)
                )
            })
            .collect(),
        up: snapshot.up_count,
        down: snapshot.down_count,
        flat: snapshot.flat_count,
        limit_up: snapshot.limit_up_count,
        limit_down: snapshot.limit_down_count,
        total_amount: format!("{:.0}", snapshot.total_amount),
        north_flow: format!("{:+.2}", snapshot.north_flow),
        margin: snapshot.margin_date.as_ref().map(|date| MarginView {
            date: date.clone(),
            balance: format!("{:.2}", snapshot.margin_balance / 1e8),
        }),
        top_sectors: sector_changes(&snapshot.top_sectors),
        bottom_sectors: sector_changes(&snapshot.bottom_sectors),
        news: news
            .iter()
            .take(MAX_PROMPT_NEWS)
            .map(|item| NewsView {
                title: truncate_chars(&item.title, NEWS_TITLE_CHARS),
                snippet: truncate_chars(&item.snippet, NEWS_SNIPPET_CHARS),
            })
            .collect(),
    };
    REVIEW_PROMPT.render(lang, &view)
}

/// Deterministic report used when no generation provider answers
pub fn render_template_review(lang: Language, snapshot: &MarketSnapshot) -> Result<String> {
    let conclusion = match (snapshot.up_count > snapshot.down_count, lang) {
        (true, Language::Chinese) => "赚钱效应回暖，资金在试错新方向",
        (false, Language::Chinese) => "亏钱效应扩散，跟风票不要碰",
        (true, Language::English) => "Profit effect recovering, money is probing new themes",
        (false, Language::English) => "Losses spreading, stay away from followers",
    };

    let view = TemplateView {
        date: snapshot.date.to_string(),
        mood: MarketMood::classify(snapshot).describe(lang),
        conclusion,
        indices: snapshot
            .indices
            .iter()
            .take(TEMPLATE_INDICES)
            .map(|idx| {
                format!(
                    "**{}**: {:.2} ({})",
                    idx.name,
                    idx.current,
                    directional_pct(idx.change_pct)
                )
            })
            .collect(),
        up: snapshot.up_count,
        down: snapshot.down_count,
        flat: snapshot.flat_count,
        limit_up: snapshot.limit_up_count,
        limit_down: snapshot.limit_down_count,
        total_amount: format!("{:.0}", snapshot.total_amount),
        top_sectors: sector_names(&snapshot.top_sectors, TEMPLATE_SECTORS, lang),
        bottom_sectors: sector_names(&snapshot.bottom_sectors, TEMPLATE_SECTORS, lang),
    };
    TEMPLATE_REVIEW.render(lang, &view)
}

fn sector_changes(sectors: &[SectorMove]) -> String {
    sectors
        .iter()
        .take(PROMPT_SECTORS)
        .map(|s| format!("{}({:+.2}%)", s.name, s.change_pct))
        .collect::<Vec<_>>()
        .join(", ")
}

fn sector_names(sectors: &[SectorMove], count: usize, lang: Language) -> String {
    if sectors.is_empty() {
        return match lang {
            Language::Chinese => "暂无数据".to_string(),
            Language::English => "n/a".to_string(),
        };
    }
    let separator = match lang {
        Language::Chinese => "、",
        Language::English => ", ",
    };
    sectors
        .iter()
        .take(count)
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}
