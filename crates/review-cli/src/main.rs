//! Command-line interface for market-review

use anyhow::Context as _;
use chrono::Local;
use clap::{Parser, Subcommand};
use comfy_table::{Table, presets::UTF8_FULL};
use review_core::data::{EastmoneyClient, MarketDataProvider, Row, columns};
use review_core::news::{NewsSearch, TavilyClient};
use review_core::{MarketAnalyzer, MarketSnapshot, ReviewConfig, StockAnalyzer, StockContext};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// News items folded into a single stock's prompt
const STOCK_NEWS_RESULTS: usize = 5;

/// Snippet characters kept per news item
const STOCK_NEWS_SNIPPET_CHARS: usize = 200;

#[derive(Parser, Debug)]
#[command(name = "market-review")]
#[command(about = "A-share market review and stock analysis", long_about = None)]
struct Args {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print today's Markdown market review
    Market,

    /// Analyse one or more stocks and print the results as JSON
    Stock {
        /// Six-digit stock codes
        #[arg(required = true)]
        codes: Vec<String>,

        /// Search recent news for each stock first
        #[arg(long)]
        news: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    review_utils::init_tracing(args.json_logs);

    let config = ReviewConfig::from_env().context("invalid configuration")?;
    let data: Arc<dyn MarketDataProvider> = Arc::new(
        EastmoneyClient::new(config.request_timeout).context("failed to build market data client")?,
    );
    let news = news_client(&config);

    match args.command {
        Command::Market => run_market(&config, data, news).await,
        Command::Stock { codes, news: search } => {
            let news = if search { news } else { None };
            run_stock(&config, data.as_ref(), news.as_deref(), &codes).await
        }
    }
}

fn news_client(config: &ReviewConfig) -> Option<Arc<dyn NewsSearch>> {
    let key = config.tavily_key()?;
    match TavilyClient::new(key, 0, config.request_timeout) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!("News search disabled: {}", e);
            None
        }
    }
}

async fn run_market(
    config: &ReviewConfig,
    data: Arc<dyn MarketDataProvider>,
    news: Option<Arc<dyn NewsSearch>>,
) -> anyhow::Result<()> {
    let mut analyzer = MarketAnalyzer::from_config(config, data, news);

    let snapshot = analyzer.get_market_overview().await;
    eprintln!("{}", overview_table(&snapshot));

    let items = analyzer.search_market_news().await;
    let report = analyzer.generate_report(&snapshot, &items).await;
    println!("{report}");
    Ok(())
}

fn overview_table(snapshot: &MarketSnapshot) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Index", "Close", "Change %", "Amplitude %"]);

    for index in &snapshot.indices {
        table.add_row(vec![
            index.name.clone(),
            format!("{:.2}", index.current),
            format!("{:+.2}", index.change_pct),
            format!("{:.2}", index.amplitude),
        ]);
    }

    table.add_row(vec![
        format!("{} up / {} down", snapshot.up_count, snapshot.down_count),
        format!("{:.0} 亿", snapshot.total_amount),
        format!("{} limit-up", snapshot.limit_up_count),
        format!("{} limit-down", snapshot.limit_down_count),
    ]);
    table
}

async fn run_stock(
    config: &ReviewConfig,
    data: &dyn MarketDataProvider,
    news: Option<&dyn NewsSearch>,
    codes: &[String],
) -> anyhow::Result<()> {
    let today = Local::now().date_naive();
    let quotes = match config
        .data_retry
        .execute("stock quotes", || data.stock_quotes())
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            warn!("Stock quotes unavailable, analysing without price data: {}", e);
            Vec::new()
        }
    };

    let mut contexts = Vec::with_capacity(codes.len());
    for code in codes {
        let context = find_quote(&quotes, code)
            .and_then(|row| StockContext::from_quote(row, today))
            .unwrap_or_else(|| {
                warn!("[{}] No quote found", code);
                StockContext::new(code.as_str(), today)
            });
        contexts.push(context);
    }

    let mut analyzer = StockAnalyzer::from_config(config);
    let results = match news {
        None => analyzer.analyze_batch(&contexts, config.batch_delay).await,
        Some(search) => {
            let mut news_contexts = Vec::with_capacity(contexts.len());
            for context in &contexts {
                news_contexts.push(stock_news(search, context).await);
            }
            analyzer
                .analyze_batch_with_news(&contexts, &news_contexts, config.batch_delay)
                .await
        }
    };

    info!("Analysed {} stocks", results.len());
    let output: Vec<Value> = results
        .iter()
        .map(|r| Value::Object(r.to_map()))
        .collect();
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn find_quote<'a>(rows: &'a [Row], code: &str) -> Option<&'a Row> {
    rows.iter()
        .find(|row| row.text(columns::CODE).as_deref() == Some(code))
}

async fn stock_news(search: &dyn NewsSearch, context: &StockContext) -> Option<String> {
    let query = format!("{} {} 最新消息", context.display_name(), context.code);
    match search.search(&query, STOCK_NEWS_RESULTS).await {
        Ok(items) if !items.is_empty() => Some(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let snippet: String = item.snippet.chars().take(STOCK_NEWS_SNIPPET_CHARS).collect();
                    format!("{}. {}: {}", i + 1, item.title, snippet)
                })
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        Ok(_) => None,
        Err(e) => {
            warn!("[{}] News search failed: {}", context.code, e);
            None
        }
    }
}
