//! Common market data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Latest quote for one instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub name: Option<String>,
    pub sector: Option<String>,
    pub price: f64,
    pub change_pct: f64,
    pub volume: i64,
    pub currency: Option<String>,
    pub exchange: Option<String>,
}

/// Reference-universe entry (symbol without pricing)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerRef {
    pub symbol: String,
    pub name: Option<String>,
    pub sector: Option<String>,
    pub exchange: Option<String>,
    pub currency: Option<String>,
}

/// Historical OHLCV bar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Fundamental ratio snapshot; fields default to zero when the upstream has
/// no value, and a snapshot of all zeros means "no fundamental data".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalSnapshot {
    #[serde(default)]
    pub pe: f64,
    #[serde(default)]
    pub ps: f64,
    #[serde(default)]
    pub roe: f64,
    #[serde(default)]
    pub debt_to_equity: f64,
    #[serde(default)]
    pub growth_5y: f64,
    #[serde(default)]
    pub profit_margin: f64,
    #[serde(default)]
    pub beta: f64,
    #[serde(default)]
    pub dividend_yield: f64,
}

impl FundamentalSnapshot {
    /// Whether every field is zero, i.e. nothing was available upstream
    pub fn is_empty(&self) -> bool {
        self.pe == 0.0
            && self.ps == 0.0
            && self.roe == 0.0
            && self.debt_to_equity == 0.0
            && self.growth_5y == 0.0
            && self.profit_margin == 0.0
            && self.beta == 0.0
            && self.dividend_yield == 0.0
    }
}

/// Supported history windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryPeriod {
    #[serde(rename = "1m")]
    Month1,
    #[serde(rename = "3m")]
    Month3,
    #[serde(rename = "6m")]
    Month6,
    #[serde(rename = "1y")]
    Year1,
    #[serde(rename = "3y")]
    Year3,
    #[serde(rename = "5y")]
    Year5,
    #[serde(rename = "max")]
    Max,
}

impl HistoryPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryPeriod::Month1 => "1m",
            HistoryPeriod::Month3 => "3m",
            HistoryPeriod::Month6 => "6m",
            HistoryPeriod::Year1 => "1y",
            HistoryPeriod::Year3 => "3y",
            HistoryPeriod::Year5 => "5y",
            HistoryPeriod::Max => "max",
        }
    }

    /// Calendar days covered by the window
    pub fn days(&self) -> i64 {
        match self {
            HistoryPeriod::Month1 => 30,
            HistoryPeriod::Month3 => 90,
            HistoryPeriod::Month6 => 180,
            HistoryPeriod::Year1 => 365,
            HistoryPeriod::Year3 => 365 * 3,
            HistoryPeriod::Year5 => 365 * 5,
            HistoryPeriod::Max => 365 * 15,
        }
    }

    /// Upstream bar resolution: intraday bars for short windows, weekly bars
    /// for multi-year ones.
    pub fn resolution(&self) -> (u32, &'static str) {
        match self {
            HistoryPeriod::Month1 => (1, "hour"),
            HistoryPeriod::Month3 | HistoryPeriod::Month6 | HistoryPeriod::Year1 => (1, "day"),
            HistoryPeriod::Year3 | HistoryPeriod::Year5 | HistoryPeriod::Max => (1, "week"),
        }
    }
}

impl std::str::FromStr for HistoryPeriod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1m" => Ok(HistoryPeriod::Month1),
            "3m" => Ok(HistoryPeriod::Month3),
            "6m" => Ok(HistoryPeriod::Month6),
            "1y" => Ok(HistoryPeriod::Year1),
            "3y" => Ok(HistoryPeriod::Year3),
            "5y" => Ok(HistoryPeriod::Year5),
            "max" => Ok(HistoryPeriod::Max),
            other => Err(AppError::Validation(format!(
                "Unsupported history period: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for HistoryPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Market overview derived from the tracked universe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSummary {
    pub updated_at: DateTime<Utc>,
    pub headline: String,
    pub movers: Vec<Quote>,
}
