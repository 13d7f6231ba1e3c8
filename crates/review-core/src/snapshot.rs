//! Market snapshot records and the pure functions that fill them from rows

use crate::data::{Row, columns};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Indices tracked by the market review, in report order
pub const MAIN_INDICES: &[(&str, &str)] = &[
    ("sh000001", "上证指数"),
    ("sz399001", "深证成指"),
    ("sz399006", "创业板指"),
    ("sh000688", "科创50"),
    ("sh000016", "上证50"),
    ("sh000300", "沪深300"),
];

/// Daily price-limit threshold in percent
const LIMIT_PCT: f64 = 9.9;

/// Number of sectors kept at each end of the ranking
const SECTOR_RANK_SIZE: usize = 5;

/// Spot quote of one index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub code: String,
    pub name: String,
    pub current: f64,
    pub change: f64,
    pub change_pct: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub prev_close: f64,
    pub volume: f64,
    pub amount: f64,
    /// Intraday range as a percentage of the previous close
    pub amplitude: f64,
}

impl IndexSnapshot {
    /// Build from a provider row; missing numbers become zero
    pub fn from_row(code: &str, name: &str, row: &Row) -> Self {
        let high = row.number_or_zero(columns::HIGH);
        let low = row.number_or_zero(columns::LOW);
        let prev_close = row.number_or_zero(columns::PREV_CLOSE);

        Self {
            code: code.to_string(),
            name: name.to_string(),
            current: row.number_or_zero(columns::CURRENT),
            change: row.number_or_zero(columns::CHANGE),
            change_pct: row.number_or_zero(columns::CHANGE_PCT),
            open: row.number_or_zero(columns::OPEN),
            high,
            low,
            prev_close,
            volume: row.number_or_zero(columns::VOLUME),
            amount: row.number_or_zero(columns::AMOUNT),
            amplitude: amplitude(high, low, prev_close),
        }
    }
}

/// `(high - low) / prev_close * 100`, or zero without a positive close
pub fn amplitude(high: f64, low: f64, prev_close: f64) -> f64 {
    if prev_close > 0.0 {
        (high - low) / prev_close * 100.0
    } else {
        0.0
    }
}

/// A sector and its change percentage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorMove {
    pub name: String,
    pub change_pct: f64,
}

/// Advance/decline counts and turnover across the whole market
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Breadth {
    pub up: usize,
    pub down: usize,
    pub flat: usize,
    pub limit_up: usize,
    pub limit_down: usize,
    /// Turnover in units of 100 million yuan
    pub total_amount: f64,
}

/// Point-in-time aggregation of market data for one review cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub date: NaiveDate,
    pub indices: Vec<IndexSnapshot>,
    pub up_count: usize,
    pub down_count: usize,
    pub flat_count: usize,
    pub limit_up_count: usize,
    pub limit_down_count: usize,
    /// Two-market turnover in 100 million yuan
    pub total_amount: f64,
    /// Northbound net inflow in 100 million yuan
    pub north_flow: f64,
    /// Two-market margin balance in yuan
    pub margin_balance: f64,
    /// Trading day the margin balance refers to
    pub margin_date: Option<String>,
    pub top_sectors: Vec<SectorMove>,
    pub bottom_sectors: Vec<SectorMove>,
}

impl MarketSnapshot {
    /// Empty snapshot for a date; every section starts at its default
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            indices: Vec::new(),
            up_count: 0,
            down_count: 0,
            flat_count: 0,
            limit_up_count: 0,
            limit_down_count: 0,
            total_amount: 0.0,
            north_flow: 0.0,
            margin_balance: 0.0,
            margin_date: None,
            top_sectors: Vec::new(),
            bottom_sectors: Vec::new(),
        }
    }

    /// Copy breadth statistics into the snapshot
    pub fn apply_breadth(&mut self, breadth: Breadth) {
        self.up_count = breadth.up;
        self.down_count = breadth.down;
        self.flat_count = breadth.flat;
        self.limit_up_count = breadth.limit_up;
        self.limit_down_count = breadth.limit_down;
        self.total_amount = breadth.total_amount;
    }

    /// Look up an index by code
    pub fn index(&self, code: &str) -> Option<&IndexSnapshot> {
        self.indices.iter().find(|i| i.code == code)
    }
}

/// Pick the main indices out of a full index listing
///
/// Exact code match first, then the first row whose code contains the
/// wanted code. Indices with no match are skipped.
pub fn select_main_indices(rows: &[Row]) -> Vec<IndexSnapshot> {
    let codes: Vec<Option<String>> = rows.iter().map(|r| r.text(columns::CODE)).collect();

    MAIN_INDICES
        .iter()
        .filter_map(|(code, name)| {
            let position = codes
                .iter()
                .position(|c| c.as_deref() == Some(*code))
                .or_else(|| {
                    codes
                        .iter()
                        .position(|c| c.as_deref().is_some_and(|c| c.contains(code)))
                })?;
            Some(IndexSnapshot::from_row(code, name, &rows[position]))
        })
        .collect()
}

/// Count advancing, declining and flat securities
///
/// Rows without a numeric change percentage are not counted; their turnover
/// still adds to `total_amount`. Limit-down rows are also counted as down.
pub fn classify_breadth(rows: &[Row]) -> Breadth {
    let mut breadth = Breadth::default();
    let mut amount_sum = 0.0;

    for row in rows {
        if let Some(pct) = row.number(columns::CHANGE_PCT) {
            if pct > 0.0 {
                breadth.up += 1;
            } else if pct < 0.0 {
                breadth.down += 1;
            } else {
                breadth.flat += 1;
            }
            if pct >= LIMIT_PCT {
                breadth.limit_up += 1;
            }
            if pct <= -LIMIT_PCT {
                breadth.limit_down += 1;
            }
        }
        if let Some(amount) = row.number(columns::AMOUNT) {
            amount_sum += amount;
        }
    }

    breadth.total_amount = amount_sum / 1e8;
    breadth
}

/// Top and bottom sectors by change percentage
///
/// Rows without a name or a numeric change are dropped. Both sorts are
/// stable, so ties keep provider order.
pub fn rank_sectors(rows: &[Row]) -> (Vec<SectorMove>, Vec<SectorMove>) {
    let sectors: Vec<SectorMove> = rows
        .iter()
        .filter_map(|row| {
            Some(SectorMove {
                name: row.text(columns::NAME)?,
                change_pct: row.number(columns::CHANGE_PCT)?,
            })
        })
        .collect();

    let mut descending = sectors.clone();
    descending.sort_by(|a, b| compare_pct(b.change_pct, a.change_pct));
    descending.truncate(SECTOR_RANK_SIZE);

    let mut ascending = sectors;
    ascending.sort_by(|a, b| compare_pct(a.change_pct, b.change_pct));
    ascending.truncate(SECTOR_RANK_SIZE);

    (descending, ascending)
}

fn compare_pct(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}
