//! Massive API provider
//!
//! Live HTTP variant against the Massive market-data API: paginated
//! reference tickers, per-symbol snapshot quotes, date-ranged aggregate bars
//! and financial ratios. All requests funnel through a per-instance rate
//! limiter and are retried with backoff on transient failures.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use futures_util::future::join_all;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::rate_limiter::RateLimiter;
use super::retry::with_retries;
use super::types::*;
use super::{summarize, MarketDataProvider, SEARCH_RESULT_LIMIT};
use crate::config::ScreenerConfig;
use crate::error::{AppError, Result};

/// Page size requested from the reference tickers endpoint
const TICKER_PAGE_LIMIT: u32 = 1000;
/// Row cap requested from the aggregates endpoint
const AGGS_ROW_LIMIT: u32 = 5000;

#[derive(Deserialize, Debug)]
struct TickerListResponse {
    #[serde(default)]
    results: Vec<TickerReference>,
    next_url: Option<String>,
}

#[derive(Deserialize, Debug)]
struct TickerReference {
    ticker: String,
    name: Option<String>,
    sic_description: Option<String>,
    primary_exchange: Option<String>,
    currency_name: Option<String>,
}

#[derive(Deserialize, Debug)]
struct SnapshotResponse {
    ticker: Option<SnapshotTicker>,
}

#[derive(Deserialize, Debug)]
struct SnapshotTicker {
    #[serde(rename = "todaysChangePerc")]
    change_pct: Option<f64>,
    day: Option<DayAggregate>,
    #[serde(rename = "lastTrade")]
    last_trade: Option<LastTrade>,
}

#[derive(Deserialize, Debug)]
struct DayAggregate {
    c: Option<f64>,
    v: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct LastTrade {
    p: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct AggsResponse {
    #[serde(default)]
    results: Vec<AggRecord>,
}

#[derive(Deserialize, Debug)]
struct AggRecord {
    t: i64,
    o: Option<f64>,
    h: Option<f64>,
    l: Option<f64>,
    c: Option<f64>,
    v: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct FinancialsResponse {
    #[serde(default)]
    results: Vec<FinancialRecord>,
}

#[derive(Deserialize, Debug, Default)]
struct FinancialRecord {
    #[serde(default)]
    metrics: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    ratios: serde_json::Map<String, serde_json::Value>,
}

/// Massive API market data provider
pub struct MassiveProvider {
    client: Client,
    api_key: String,
    base_url: String,
    symbol_limit: usize,
    fetch_concurrency: usize,
    max_retries: u32,
    retry_base_delay: Duration,
    rate_limiter: RateLimiter,
}

impl MassiveProvider {
    pub fn new(config: &ScreenerConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(config.request_timeout)
                .build()
                .expect("Failed to create HTTP client"),
            api_key: config.api_key.clone().unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            symbol_limit: config.effective_symbol_limit(),
            fetch_concurrency: config.fetch_concurrency.max(1),
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay,
            rate_limiter: RateLimiter::new(config.rate_limit_interval),
        }
    }

    /// Build the request URL, appending the credential as a query parameter.
    ///
    /// Pagination URLs arrive absolute with their cursor already encoded;
    /// relative paths are joined onto the configured base.
    fn build_url(&self, path_or_url: &str, params: &[(&str, String)]) -> Result<Url> {
        let mut url = if path_or_url.starts_with("http") {
            Url::parse(path_or_url)
        } else {
            Url::parse(&format!(
                "{}/{}",
                self.base_url,
                path_or_url.trim_start_matches('/')
            ))
        }
        .map_err(|e| AppError::Parse(format!("Invalid upstream URL: {}", e)))?;

        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }

        let has_key = url.query_pairs().any(|(key, _)| key == "apiKey");
        if !has_key {
            url.query_pairs_mut().append_pair("apiKey", &self.api_key);
        }

        Ok(url)
    }

    /// Rate-limited, retried GET returning the JSON payload
    async fn fetch_json(&self, path_or_url: &str, params: &[(&str, String)]) -> Result<serde_json::Value> {
        let url = self.build_url(path_or_url, params)?;

        with_retries(self.max_retries, self.retry_base_delay, || {
            let url = url.clone();
            async move {
                self.rate_limiter.acquire().await;
                debug!("GET {}", url.path());

                let response = self.client.get(url).send().await?;
                let status = response.status();

                if status == StatusCode::TOO_MANY_REQUESTS {
                    let retry_after = response
                        .headers()
                        .get("Retry-After")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<f64>().ok())
                        .map(Duration::from_secs_f64);
                    return Err(AppError::Upstream {
                        status: status.as_u16(),
                        retry_after,
                    });
                }

                if !status.is_success() {
                    return Err(AppError::Upstream {
                        status: status.as_u16(),
                        retry_after: None,
                    });
                }

                let payload = response.json::<serde_json::Value>().await?;
                Ok(payload)
            }
        })
        .await
    }

    async fn get_quote(&self, symbol: &str) -> Result<Option<Quote>> {
        let symbol = symbol.to_uppercase();
        let payload = self
            .fetch_json(
                &format!("v2/snapshot/locale/us/markets/stocks/tickers/{}", symbol),
                &[],
            )
            .await?;

        let snapshot: SnapshotResponse = serde_json::from_value(payload)?;
        Ok(snapshot
            .ticker
            .and_then(|ticker| quote_from_snapshot(&symbol, ticker)))
    }
}

#[async_trait]
impl MarketDataProvider for MassiveProvider {
    fn id(&self) -> &'static str {
        "massive"
    }

    fn name(&self) -> &'static str {
        "Massive"
    }

    async fn list_tickers(&self) -> Result<Vec<TickerRef>> {
        let mut tickers = Vec::new();
        let mut next: Option<String> = Some("v3/reference/tickers".to_string());

        while let Some(path_or_url) = next {
            let params: Vec<(&str, String)> = if path_or_url.starts_with("http") {
                Vec::new() // cursor URL already carries the query
            } else {
                vec![
                    ("market", "stocks".to_string()),
                    ("active", "true".to_string()),
                    ("limit", TICKER_PAGE_LIMIT.to_string()),
                ]
            };

            let payload = self.fetch_json(&path_or_url, &params).await?;
            let page: TickerListResponse = serde_json::from_value(payload)?;

            for item in page.results {
                tickers.push(TickerRef {
                    symbol: item.ticker.trim().to_uppercase(),
                    name: item.name,
                    sector: item.sic_description,
                    exchange: item.primary_exchange,
                    currency: item.currency_name.map(|c| c.to_uppercase()),
                });
                if tickers.len() >= self.symbol_limit {
                    return Ok(tickers);
                }
            }

            next = page.next_url;
        }

        Ok(tickers)
    }

    async fn get_quotes(&self, symbols: Option<&[String]>) -> Result<Vec<Quote>> {
        let symbols: Vec<String> = match symbols {
            Some(symbols) => symbols.iter().map(|s| s.to_uppercase()).collect(),
            None => self
                .list_tickers()
                .await?
                .into_iter()
                .map(|ticker| ticker.symbol)
                .collect(),
        };

        // Chunked fan-out: bounded in-flight requests per chunk, symbols
        // that fail to resolve are omitted.
        let mut quotes = Vec::with_capacity(symbols.len());
        for chunk in symbols.chunks(self.fetch_concurrency) {
            let fetched = join_all(chunk.iter().map(|symbol| self.get_quote(symbol))).await;
            for (symbol, result) in chunk.iter().zip(fetched) {
                match result {
                    Ok(Some(quote)) => quotes.push(quote),
                    Ok(None) => debug!("No snapshot for {}", symbol),
                    Err(e) => warn!("Quote fetch failed for {}: {}", symbol, e),
                }
            }
        }

        Ok(quotes)
    }

    async fn get_history(&self, symbol: &str, period: HistoryPeriod) -> Result<Vec<Candle>> {
        let (multiplier, timespan) = period.resolution();
        let to = Utc::now();
        let from = to - ChronoDuration::days(period.days());

        let payload = self
            .fetch_json(
                &format!(
                    "v2/aggs/ticker/{}/range/{}/{}/{}/{}",
                    symbol.to_uppercase(),
                    multiplier,
                    timespan,
                    from.format("%Y-%m-%d"),
                    to.format("%Y-%m-%d"),
                ),
                &[
                    ("adjusted", "true".to_string()),
                    ("sort", "asc".to_string()),
                    ("limit", AGGS_ROW_LIMIT.to_string()),
                ],
            )
            .await?;

        let aggs: AggsResponse = serde_json::from_value(payload)?;
        Ok(candles_from_aggs(aggs))
    }

    async fn get_fundamentals(&self, symbol: &str) -> Result<FundamentalSnapshot> {
        let payload = self
            .fetch_json(
                &format!("v2/reference/financials/{}", symbol.to_uppercase()),
                &[("limit", "1".to_string())],
            )
            .await?;

        let financials: FinancialsResponse = serde_json::from_value(payload)?;
        Ok(fundamentals_from_financials(financials))
    }

    async fn search_ticker(&self, query: &str) -> Result<Vec<Quote>> {
        let query = query.to_lowercase();
        let matches: Vec<String> = self
            .list_tickers()
            .await?
            .into_iter()
            .filter(|ticker| {
                ticker.symbol.to_lowercase().contains(&query)
                    || ticker
                        .name
                        .as_ref()
                        .map(|name| name.to_lowercase().contains(&query))
                        .unwrap_or(false)
            })
            .take(SEARCH_RESULT_LIMIT)
            .map(|ticker| ticker.symbol)
            .collect();

        self.get_quotes(Some(&matches)).await
    }

    async fn get_market_summary(&self) -> Result<MarketSummary> {
        let quotes = self.get_quotes(None).await?;
        Ok(summarize(quotes))
    }
}

/// Snapshot price resolution: last trade first, day close second.
fn quote_from_snapshot(symbol: &str, snapshot: SnapshotTicker) -> Option<Quote> {
    let price = snapshot
        .last_trade
        .as_ref()
        .and_then(|trade| trade.p)
        .filter(|p| *p > 0.0)
        .or_else(|| snapshot.day.as_ref().and_then(|day| day.c).filter(|c| *c > 0.0))?;

    let volume = snapshot
        .day
        .as_ref()
        .and_then(|day| day.v)
        .unwrap_or(0.0) as i64;

    Some(Quote {
        symbol: symbol.to_string(),
        name: None,
        sector: None,
        price,
        change_pct: snapshot.change_pct.unwrap_or(0.0),
        volume,
        currency: None,
        exchange: None,
    })
}

fn candles_from_aggs(aggs: AggsResponse) -> Vec<Candle> {
    aggs.results
        .into_iter()
        .filter_map(|record| {
            let timestamp = Utc.timestamp_opt(record.t, 0).single()?;
            Some(Candle {
                timestamp,
                open: record.o.unwrap_or(0.0),
                high: record.h.unwrap_or(0.0),
                low: record.l.unwrap_or(0.0),
                close: record.c.unwrap_or(0.0),
                volume: record.v.unwrap_or(0.0),
            })
        })
        .collect()
}

/// Pick a ratio from the metrics map first, the ratios map second.
fn pick(record: &FinancialRecord, key: &str) -> f64 {
    record
        .metrics
        .get(key)
        .and_then(|v| v.as_f64())
        .or_else(|| record.ratios.get(key).and_then(|v| v.as_f64()))
        .unwrap_or(0.0)
}

fn fundamentals_from_financials(financials: FinancialsResponse) -> FundamentalSnapshot {
    let Some(record) = financials.results.into_iter().next() else {
        return FundamentalSnapshot::default();
    };

    FundamentalSnapshot {
        pe: pick(&record, "pe_ratio"),
        ps: pick(&record, "price_to_sales_ratio"),
        roe: pick(&record, "return_on_equity"),
        debt_to_equity: pick(&record, "debt_to_equity"),
        growth_5y: pick(&record, "revenue_growth_five_year"),
        profit_margin: pick(&record, "net_profit_margin"),
        beta: pick(&record, "beta"),
        dividend_yield: pick(&record, "dividend_yield"),
    }
}
