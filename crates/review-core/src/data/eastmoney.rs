//! HTTP market data client for Eastmoney and Sina quote endpoints

use super::{MarketDataProvider, Row, columns};
use crate::error::{Result, ReviewError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

const SINA_NODE_URL: &str = "https://vip.stock.finance.sina.com.cn/quotes_service/api/json_v2.php/Market_Center.getHQNodeData";
const EASTMONEY_CLIST_URL: &str = "https://push2.eastmoney.com/api/qt/clist/get";
const EASTMONEY_DATACENTER_URL: &str = "https://datacenter-web.eastmoney.com/api/data/v1/get";

/// Shanghai/Shenzhen/Beijing A-share boards
const A_SHARE_FILTER: &str = "m:0 t:6,m:0 t:80,m:1 t:2,m:1 t:23,m:0 t:81 s:2048";
/// Industry sector boards
const INDUSTRY_FILTER: &str = "m:90 t:2 f:!50";
const QUOTE_FIELDS: &str = "f2,f3,f4,f5,f6,f7,f8,f10,f12,f14,f15,f16,f17,f18";

const PAGE_SIZE: usize = 100;
const MAX_PAGES: usize = 80;
const SINA_PAGE_SIZE: usize = 80;
const SINA_MAX_PAGES: usize = 10;

/// Eastmoney field ids mapped onto canonical columns
const EASTMONEY_COLUMNS: &[(&str, &str)] = &[
    ("f12", columns::CODE),
    ("f14", columns::NAME),
    ("f2", columns::CURRENT),
    ("f3", columns::CHANGE_PCT),
    ("f4", columns::CHANGE),
    ("f5", columns::VOLUME),
    ("f6", columns::AMOUNT),
    ("f7", columns::AMPLITUDE),
    ("f8", columns::TURNOVER_RATE),
    ("f10", columns::VOLUME_RATIO),
    ("f15", columns::HIGH),
    ("f16", columns::LOW),
    ("f17", columns::OPEN),
    ("f18", columns::PREV_CLOSE),
];

/// Sina node fields mapped onto canonical columns
const SINA_COLUMNS: &[(&str, &str)] = &[
    ("symbol", columns::CODE),
    ("name", columns::NAME),
    ("trade", columns::CURRENT),
    ("pricechange", columns::CHANGE),
    ("changepercent", columns::CHANGE_PCT),
    ("open", columns::OPEN),
    ("high", columns::HIGH),
    ("low", columns::LOW),
    ("settlement", columns::PREV_CLOSE),
    ("volume", columns::VOLUME),
    ("amount", columns::AMOUNT),
];

/// Market data over the public Eastmoney and Sina quote APIs
pub struct EastmoneyClient {
    client: Client,
}

impl EastmoneyClient {
    /// Create a client with the given per-request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) market-review")
            .build()?;
        Ok(Self { client })
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value> {
        let response = self.client.get(url).query(query).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ReviewError::DataProvider(format!(
                "HTTP {status} from {url}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        Ok(response.json::<Value>().await?)
    }

    /// Page through a `clist/get` listing
    async fn clist(&self, filter: &str) -> Result<Vec<Row>> {
        let mut rows = Vec::new();

        for page in 1..=MAX_PAGES {
            let query = [
                ("pn", page.to_string()),
                ("pz", PAGE_SIZE.to_string()),
                ("po", "1".to_string()),
                ("np", "1".to_string()),
                ("fltt", "2".to_string()),
                ("invt", "2".to_string()),
                ("fid", "f3".to_string()),
                ("fs", filter.to_string()),
                ("fields", QUOTE_FIELDS.to_string()),
            ];
            let body: ClistResponse = serde_json::from_value(self.get_json(EASTMONEY_CLIST_URL, &query).await?)?;

            let Some(data) = body.data else {
                break;
            };
            let count = data.diff.len();
            rows.extend(data.diff.iter().map(|item| map_columns(item, EASTMONEY_COLUMNS)));

            if count < PAGE_SIZE || rows.len() >= data.total {
                break;
            }
        }

        if rows.is_empty() {
            return Err(ReviewError::DataProvider(format!(
                "Eastmoney returned no rows for '{filter}'"
            )));
        }
        debug!("Fetched {} rows for '{}'", rows.len(), filter);
        Ok(rows)
    }
}

#[async_trait]
impl MarketDataProvider for EastmoneyClient {
    #[instrument(skip(self))]
    async fn index_quotes(&self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();

        for page in 1..=SINA_MAX_PAGES {
            let query = [
                ("page", page.to_string()),
                ("num", SINA_PAGE_SIZE.to_string()),
                ("sort", "symbol".to_string()),
                ("asc", "1".to_string()),
                ("node", "hs_s".to_string()),
                ("_s_r_a", "page".to_string()),
            ];
            let body = self.get_json(SINA_NODE_URL, &query).await?;
            let Value::Array(items) = body else {
                break;
            };
            let count = items.len();
            rows.extend(items.iter().map(|item| map_columns(item, SINA_COLUMNS)));
            if count < SINA_PAGE_SIZE {
                break;
            }
        }

        if rows.is_empty() {
            return Err(ReviewError::DataProvider(
                "Sina returned no index quotes".to_string(),
            ));
        }
        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn stock_quotes(&self) -> Result<Vec<Row>> {
        self.clist(A_SHARE_FILTER).await
    }

    #[instrument(skip(self))]
    async fn sector_quotes(&self) -> Result<Vec<Row>> {
        self.clist(INDUSTRY_FILTER).await
    }

    #[instrument(skip(self))]
    async fn margin_balance(&self) -> Result<Vec<Row>> {
        let query = [
            ("reportName", "RPTA_RZRQ_LSHJ".to_string()),
            ("columns", "ALL".to_string()),
            ("source", "WEB".to_string()),
            ("sortColumns", "DIM_DATE".to_string()),
            ("sortTypes", "-1".to_string()),
            ("pageNumber", "1".to_string()),
            ("pageSize", "5".to_string()),
        ];
        let body: DatacenterResponse =
            serde_json::from_value(self.get_json(EASTMONEY_DATACENTER_URL, &query).await?)?;

        let rows: Vec<Row> = body
            .result
            .map(|r| r.data)
            .unwrap_or_default()
            .iter()
            .map(margin_row)
            .collect();

        if rows.is_empty() {
            return Err(ReviewError::DataProvider(
                "Eastmoney returned no margin data".to_string(),
            ));
        }
        Ok(rows)
    }

    fn name(&self) -> &'static str {
        "eastmoney"
    }
}

#[derive(Debug, Deserialize)]
struct ClistResponse {
    data: Option<ClistData>,
}

#[derive(Debug, Deserialize)]
struct ClistData {
    #[serde(default)]
    total: usize,
    #[serde(default)]
    diff: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct DatacenterResponse {
    result: Option<DatacenterResult>,
}

#[derive(Debug, Deserialize)]
struct DatacenterResult {
    #[serde(default)]
    data: Vec<Value>,
}

/// Copy the known fields of a provider record into a canonical row
fn map_columns(item: &Value, mapping: &[(&str, &str)]) -> Row {
    mapping
        .iter()
        .filter_map(|(source, target)| {
            item.get(*source)
                .map(|value| ((*target).to_string(), value.clone()))
        })
        .collect()
}

fn margin_row(item: &Value) -> Row {
    let mut row = Row::new();
    if let Some(date) = item.get("DIM_DATE").and_then(Value::as_str) {
        row.insert(columns::TRADE_DATE, date.chars().take(10).collect::<String>());
    }
    if let Some(balance) = item.get("RZYE") {
        row.insert(columns::MARGIN_BALANCE, balance.clone());
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_eastmoney_item() {
        let item = json!({
            "f2": 1520.5, "f3": 2.35, "f4": 34.9, "f5": 31000, "f6": 4.7e9,
            "f7": 3.1, "f8": 0.25, "f10": 1.4, "f12": "600519", "f14": "贵州茅台",
            "f15": 1530.0, "f16": 1483.0, "f17": 1490.0, "f18": 1485.6
        });
        let row = map_columns(&item, EASTMONEY_COLUMNS);
        assert_eq!(row.text(columns::CODE).as_deref(), Some("600519"));
        assert_eq!(row.text(columns::NAME).as_deref(), Some("贵州茅台"));
        assert_eq!(row.number(columns::CHANGE_PCT), Some(2.35));
        assert_eq!(row.number(columns::PREV_CLOSE), Some(1485.6));
        assert_eq!(row.number(columns::VOLUME_RATIO), Some(1.4));
    }

    #[test]
    fn test_suspended_stock_dashes_are_missing() {
        let item = json!({"f12": "000001", "f14": "平安银行", "f2": "-", "f3": "-", "f6": "-"});
        let row = map_columns(&item, EASTMONEY_COLUMNS);
        assert_eq!(row.number(columns::CHANGE_PCT), None);
        assert_eq!(row.number(columns::AMOUNT), None);
    }

    #[test]
    fn test_map_sina_item() {
        let item = json!({
            "symbol": "sh000001", "name": "上证指数", "trade": "3250.120",
            "pricechange": "12.300", "changepercent": "0.380", "open": "3240.000",
            "high": "3260.500", "low": "3235.100", "settlement": "3237.820",
            "volume": 350000000, "amount": 410000000000.0_f64
        });
        let row = map_columns(&item, SINA_COLUMNS);
        assert_eq!(row.text(columns::CODE).as_deref(), Some("sh000001"));
        assert_eq!(row.number(columns::CURRENT), Some(3250.12));
        assert_eq!(row.number(columns::PREV_CLOSE), Some(3237.82));
    }

    #[test]
    fn test_margin_row() {
        let item = json!({"DIM_DATE": "2025-01-10 00:00:00", "RZYE": 1.83e12});
        let row = margin_row(&item);
        assert_eq!(row.text(columns::TRADE_DATE).as_deref(), Some("2025-01-10"));
        assert_eq!(row.number(columns::MARGIN_BALANCE), Some(1.83e12));
    }

    #[test]
    fn test_clist_response_shape() {
        let raw = json!({"rc": 0, "data": {"total": 2, "diff": [{"f12": "1"}, {"f12": "2"}]}});
        let parsed: ClistResponse = serde_json::from_value(raw).unwrap();
        let data = parsed.data.unwrap();
        assert_eq!(data.total, 2);
        assert_eq!(data.diff.len(), 2);

        let empty: ClistResponse = serde_json::from_value(json!({"rc": 0, "data": null})).unwrap();
        assert!(empty.data.is_none());
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_live_index_quotes() {
        let client = EastmoneyClient::new(Duration::from_secs(30)).unwrap();
        let rows = client.index_quotes().await.unwrap();
        assert!(rows.iter().any(|r| r.text(columns::CODE).as_deref() == Some("sh000001")));
    }
}
