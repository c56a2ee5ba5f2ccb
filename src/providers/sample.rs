//! Bundled sample data provider
//!
//! Offline variant used when no API credential is configured and as the
//! fallback when the live provider fails. Quotes and fundamentals come from
//! a fixed table; history is synthesized deterministically per symbol so
//! indicator output is stable across runs.

use async_trait::async_trait;
use chrono::{Duration, Utc};

use super::types::*;
use super::{summarize, MarketDataProvider, SEARCH_RESULT_LIMIT};
use crate::error::Result;

struct SampleEquity {
    symbol: &'static str,
    name: &'static str,
    sector: &'static str,
    price: f64,
    change_pct: f64,
    volume: i64,
    pe: f64,
    ps: f64,
    roe: f64,
    debt_to_equity: f64,
    growth_5y: f64,
    profit_margin: f64,
    beta: f64,
    dividend_yield: f64,
    /// Annualized price drift used for the synthetic history
    drift: f64,
    /// Relative amplitude of the synthetic oscillation
    swing: f64,
}

const SAMPLE_UNIVERSE: &[SampleEquity] = &[
    SampleEquity {
        symbol: "NLTC",
        name: "Northlake Technologies",
        sector: "Technology",
        price: 182.40,
        change_pct: 1.2,
        volume: 4_150_000,
        pe: 27.0,
        ps: 6.1,
        roe: 31.0,
        debt_to_equity: 0.45,
        growth_5y: 14.0,
        profit_margin: 24.0,
        beta: 1.15,
        dividend_yield: 0.6,
        drift: 0.22,
        swing: 0.015,
    },
    SampleEquity {
        symbol: "QTRM",
        name: "Quantum Relay Microsystems",
        sector: "Technology",
        price: 64.15,
        change_pct: -2.4,
        volume: 9_800_000,
        pe: 41.0,
        ps: 9.8,
        roe: 12.0,
        debt_to_equity: 0.30,
        growth_5y: 28.0,
        profit_margin: 9.0,
        beta: 1.55,
        dividend_yield: 0.0,
        drift: 0.35,
        swing: 0.045,
    },
    SampleEquity {
        symbol: "HXSW",
        name: "Helix Software Group",
        sector: "Technology",
        price: 112.70,
        change_pct: 0.4,
        volume: 2_350_000,
        pe: 22.0,
        ps: 5.0,
        roe: 19.0,
        debt_to_equity: 0.55,
        growth_5y: 11.0,
        profit_margin: 18.0,
        beta: 1.05,
        dividend_yield: 1.1,
        drift: 0.12,
        swing: 0.02,
    },
    SampleEquity {
        symbol: "MERB",
        name: "Meridian Bancorp",
        sector: "Financials",
        price: 48.90,
        change_pct: 0.8,
        volume: 3_600_000,
        pe: 11.0,
        ps: 2.8,
        roe: 13.5,
        debt_to_equity: 1.10,
        growth_5y: 5.0,
        profit_margin: 27.0,
        beta: 0.95,
        dividend_yield: 3.4,
        drift: 0.06,
        swing: 0.012,
    },
    SampleEquity {
        symbol: "ATLI",
        name: "Atlas Insurance Holdings",
        sector: "Financials",
        price: 86.35,
        change_pct: -0.3,
        volume: 1_200_000,
        pe: 13.5,
        ps: 1.9,
        roe: 16.0,
        debt_to_equity: 0.60,
        growth_5y: 7.5,
        profit_margin: 12.0,
        beta: 0.85,
        dividend_yield: 2.7,
        drift: 0.08,
        swing: 0.01,
    },
    SampleEquity {
        symbol: "CRSP",
        name: "Crestpoint Pharmaceuticals",
        sector: "Healthcare",
        price: 134.20,
        change_pct: 2.1,
        volume: 2_900_000,
        pe: 18.0,
        ps: 4.2,
        roe: 22.0,
        debt_to_equity: 0.40,
        growth_5y: 9.0,
        profit_margin: 21.0,
        beta: 0.80,
        dividend_yield: 2.1,
        drift: 0.10,
        swing: 0.018,
    },
    SampleEquity {
        symbol: "VITA",
        name: "Vitalis Medical Devices",
        sector: "Healthcare",
        price: 57.60,
        change_pct: -1.1,
        volume: 1_750_000,
        pe: 33.0,
        ps: 6.8,
        roe: 9.0,
        debt_to_equity: 0.75,
        growth_5y: 16.0,
        profit_margin: 8.0,
        beta: 1.20,
        dividend_yield: 0.0,
        drift: 0.18,
        swing: 0.03,
    },
    SampleEquity {
        symbol: "BORE",
        name: "Boreal Energy",
        sector: "Energy",
        price: 73.85,
        change_pct: 1.6,
        volume: 5_400_000,
        pe: 9.5,
        ps: 1.4,
        roe: 17.0,
        debt_to_equity: 0.90,
        growth_5y: 4.0,
        profit_margin: 13.0,
        beta: 1.35,
        dividend_yield: 4.2,
        drift: 0.05,
        swing: 0.035,
    },
    SampleEquity {
        symbol: "SOLV",
        name: "Solvent Renewables",
        sector: "Energy",
        price: 28.45,
        change_pct: -3.2,
        volume: 7_100_000,
        pe: 52.0,
        ps: 3.6,
        roe: 4.0,
        debt_to_equity: 1.40,
        growth_5y: 31.0,
        profit_margin: 3.0,
        beta: 1.70,
        dividend_yield: 0.0,
        drift: -0.12,
        swing: 0.05,
    },
    SampleEquity {
        symbol: "GRNR",
        name: "Garner Consumer Brands",
        sector: "Consumer Staples",
        price: 94.10,
        change_pct: 0.2,
        volume: 2_050_000,
        pe: 19.5,
        ps: 2.4,
        roe: 25.0,
        debt_to_equity: 0.85,
        growth_5y: 3.5,
        profit_margin: 16.0,
        beta: 0.60,
        dividend_yield: 3.1,
        drift: 0.04,
        swing: 0.008,
    },
    SampleEquity {
        symbol: "RLWY",
        name: "Redline Logistics",
        sector: "Industrials",
        price: 142.75,
        change_pct: 0.9,
        volume: 1_480_000,
        pe: 16.0,
        ps: 2.1,
        roe: 18.5,
        debt_to_equity: 0.70,
        growth_5y: 8.0,
        profit_margin: 11.0,
        beta: 1.00,
        dividend_yield: 1.8,
        drift: 0.09,
        swing: 0.016,
    },
    SampleEquity {
        symbol: "FNDY",
        name: "Foundry Materials Corp",
        sector: "Industrials",
        price: 39.30,
        change_pct: -0.7,
        volume: 3_250_000,
        pe: 14.0,
        ps: 1.1,
        roe: 10.5,
        debt_to_equity: 1.05,
        growth_5y: 6.0,
        profit_margin: 7.0,
        beta: 1.25,
        dividend_yield: 2.4,
        drift: 0.03,
        swing: 0.022,
    },
];

/// Static sample data provider
pub struct SampleProvider;

impl SampleProvider {
    pub fn new() -> Self {
        Self
    }

    fn lookup(symbol: &str) -> Option<&'static SampleEquity> {
        SAMPLE_UNIVERSE
            .iter()
            .find(|equity| equity.symbol.eq_ignore_ascii_case(symbol))
    }

    fn quote_for(equity: &SampleEquity) -> Quote {
        Quote {
            symbol: equity.symbol.to_string(),
            name: Some(equity.name.to_string()),
            sector: Some(equity.sector.to_string()),
            price: equity.price,
            change_pct: equity.change_pct,
            volume: equity.volume,
            currency: Some("USD".to_string()),
            exchange: Some("SAMPLE".to_string()),
        }
    }

    /// Deterministic synthetic daily bars ending at the current price.
    ///
    /// A linear drift plus a phase-shifted oscillation per symbol; the same
    /// symbol and period always produce the same price path.
    fn synthesize_history(equity: &SampleEquity, period: HistoryPeriod) -> Vec<Candle> {
        let bars = period.days().min(365 * 5) as usize;
        let phase = equity
            .symbol
            .bytes()
            .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
        let phase = (phase % 628) as f64 / 100.0;

        let now = Utc::now();
        let mut candles = Vec::with_capacity(bars);
        let mut prev_close = f64::NAN;

        for i in 0..bars {
            let age_days = (bars - 1 - i) as f64;
            let trend = equity.price / (1.0 + equity.drift * age_days / 365.0);
            let wobble = 1.0 + equity.swing * (i as f64 * 0.35 + phase).sin();
            let close = trend * wobble;

            let open = if prev_close.is_nan() { close } else { prev_close };
            let spread = close * equity.swing.max(0.004);
            candles.push(Candle {
                timestamp: now - Duration::days(age_days as i64),
                open,
                high: close.max(open) + spread,
                low: close.min(open) - spread,
                close,
                volume: equity.volume as f64 * (0.9 + 0.2 * ((i as f64 * 0.8 + phase).sin().abs())),
            });
            prev_close = close;
        }

        candles
    }
}

impl Default for SampleProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataProvider for SampleProvider {
    fn id(&self) -> &'static str {
        "sample"
    }

    fn name(&self) -> &'static str {
        "Sample Data"
    }

    async fn list_tickers(&self) -> Result<Vec<TickerRef>> {
        Ok(SAMPLE_UNIVERSE
            .iter()
            .map(|equity| TickerRef {
                symbol: equity.symbol.to_string(),
                name: Some(equity.name.to_string()),
                sector: Some(equity.sector.to_string()),
                exchange: Some("SAMPLE".to_string()),
                currency: Some("USD".to_string()),
            })
            .collect())
    }

    async fn get_quotes(&self, symbols: Option<&[String]>) -> Result<Vec<Quote>> {
        match symbols {
            None => Ok(SAMPLE_UNIVERSE.iter().map(Self::quote_for).collect()),
            Some(symbols) => Ok(symbols
                .iter()
                .filter_map(|symbol| Self::lookup(symbol).map(Self::quote_for))
                .collect()),
        }
    }

    async fn get_history(&self, symbol: &str, period: HistoryPeriod) -> Result<Vec<Candle>> {
        Ok(Self::lookup(symbol)
            .map(|equity| Self::synthesize_history(equity, period))
            .unwrap_or_default())
    }

    async fn get_fundamentals(&self, symbol: &str) -> Result<FundamentalSnapshot> {
        Ok(Self::lookup(symbol)
            .map(|equity| FundamentalSnapshot {
                pe: equity.pe,
                ps: equity.ps,
                roe: equity.roe,
                debt_to_equity: equity.debt_to_equity,
                growth_5y: equity.growth_5y,
                profit_margin: equity.profit_margin,
                beta: equity.beta,
                dividend_yield: equity.dividend_yield,
            })
            .unwrap_or_default())
    }

    async fn search_ticker(&self, query: &str) -> Result<Vec<Quote>> {
        let query = query.to_lowercase();
        Ok(SAMPLE_UNIVERSE
            .iter()
            .filter(|equity| {
                equity.symbol.to_lowercase().contains(&query)
                    || equity.name.to_lowercase().contains(&query)
            })
            .take(SEARCH_RESULT_LIMIT)
            .map(Self::quote_for)
            .collect())
    }

    async fn get_market_summary(&self) -> Result<MarketSummary> {
        let quotes = self.get_quotes(None).await?;
        Ok(summarize(quotes))
    }
}
