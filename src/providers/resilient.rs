//! Provider resilience wrappers
//!
//! `FallbackProvider` chains a primary provider with a designated fallback so
//! per-symbol failures never cross the provider boundary; `CachedProvider`
//! fronts any provider with the tiered TTL cache, independently keyed per
//! operation. The composition root stacks them as cache → fallback → live.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::types::*;
use super::{summarize, MarketDataProvider};
use crate::cache::{cache_key, CacheKind, TieredCache};
use crate::config::ScreenerConfig;
use crate::error::Result;

/// Primary provider with a fallback substituted on any failure.
///
/// Operations on this wrapper do not fail: when both providers error, the
/// result degrades to an empty or zero-filled value.
pub struct FallbackProvider {
    primary: Arc<dyn MarketDataProvider>,
    fallback: Arc<dyn MarketDataProvider>,
}

impl FallbackProvider {
    pub fn new(primary: Arc<dyn MarketDataProvider>, fallback: Arc<dyn MarketDataProvider>) -> Self {
        Self { primary, fallback }
    }

    fn log_primary_failure(&self, what: &str, err: &crate::error::AppError) {
        warn!(
            "{} failed on {} ({}); trying fallback {}",
            what,
            self.primary.id(),
            err,
            self.fallback.id()
        );
    }

    fn log_fallback_failure(&self, what: &str, err: &crate::error::AppError) {
        warn!(
            "{} failed on fallback {} ({}); returning default",
            what,
            self.fallback.id(),
            err
        );
    }
}

#[async_trait]
impl MarketDataProvider for FallbackProvider {
    fn id(&self) -> &'static str {
        "fallback"
    }

    fn name(&self) -> &'static str {
        "Fallback Chain"
    }

    async fn list_tickers(&self) -> Result<Vec<TickerRef>> {
        match self.primary.list_tickers().await {
            Ok(tickers) => Ok(tickers),
            Err(e) => {
                self.log_primary_failure("list_tickers", &e);
                match self.fallback.list_tickers().await {
                    Ok(tickers) => Ok(tickers),
                    Err(e) => {
                        self.log_fallback_failure("list_tickers", &e);
                        Ok(Vec::new())
                    }
                }
            }
        }
    }

    async fn get_quotes(&self, symbols: Option<&[String]>) -> Result<Vec<Quote>> {
        match self.primary.get_quotes(symbols).await {
            Ok(quotes) => Ok(quotes),
            Err(e) => {
                self.log_primary_failure("get_quotes", &e);
                match self.fallback.get_quotes(symbols).await {
                    Ok(quotes) => Ok(quotes),
                    Err(e) => {
                        self.log_fallback_failure("get_quotes", &e);
                        Ok(Vec::new())
                    }
                }
            }
        }
    }

    async fn get_history(&self, symbol: &str, period: HistoryPeriod) -> Result<Vec<Candle>> {
        match self.primary.get_history(symbol, period).await {
            Ok(candles) => Ok(candles),
            Err(e) => {
                self.log_primary_failure("get_history", &e);
                match self.fallback.get_history(symbol, period).await {
                    Ok(candles) => Ok(candles),
                    Err(e) => {
                        self.log_fallback_failure("get_history", &e);
                        Ok(Vec::new())
                    }
                }
            }
        }
    }

    async fn get_fundamentals(&self, symbol: &str) -> Result<FundamentalSnapshot> {
        match self.primary.get_fundamentals(symbol).await {
            Ok(fundamentals) => Ok(fundamentals),
            Err(e) => {
                self.log_primary_failure("get_fundamentals", &e);
                match self.fallback.get_fundamentals(symbol).await {
                    Ok(fundamentals) => Ok(fundamentals),
                    Err(e) => {
                        self.log_fallback_failure("get_fundamentals", &e);
                        Ok(FundamentalSnapshot::default())
                    }
                }
            }
        }
    }

    async fn search_ticker(&self, query: &str) -> Result<Vec<Quote>> {
        match self.primary.search_ticker(query).await {
            Ok(quotes) => Ok(quotes),
            Err(e) => {
                self.log_primary_failure("search_ticker", &e);
                match self.fallback.search_ticker(query).await {
                    Ok(quotes) => Ok(quotes),
                    Err(e) => {
                        self.log_fallback_failure("search_ticker", &e);
                        Ok(Vec::new())
                    }
                }
            }
        }
    }

    async fn get_market_summary(&self) -> Result<MarketSummary> {
        match self.primary.get_market_summary().await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                self.log_primary_failure("get_market_summary", &e);
                match self.fallback.get_market_summary().await {
                    Ok(summary) => Ok(summary),
                    Err(e) => {
                        self.log_fallback_failure("get_market_summary", &e);
                        Ok(summarize(Vec::new()))
                    }
                }
            }
        }
    }
}

/// TTL-caching front for any provider.
///
/// Every fetch is cached under its own `(kind, symbol[, period])` key with a
/// per-kind TTL; a hit before expiry short-circuits the inner provider, so
/// fallback-substituted data is retained under the same policy as primary
/// data.
pub struct CachedProvider {
    inner: Arc<dyn MarketDataProvider>,
    cache: TieredCache,
    quote_ttl: Duration,
    history_ttl: Duration,
    fundamentals_ttl: Duration,
    universe_ttl: Duration,
}

impl CachedProvider {
    pub fn new(
        inner: Arc<dyn MarketDataProvider>,
        cache: TieredCache,
        config: &ScreenerConfig,
    ) -> Self {
        Self {
            inner,
            cache,
            quote_ttl: config.quote_ttl,
            history_ttl: config.history_ttl,
            fundamentals_ttl: config.fundamentals_ttl,
            universe_ttl: config.universe_ttl,
        }
    }
}

#[async_trait]
impl MarketDataProvider for CachedProvider {
    fn id(&self) -> &'static str {
        "cached"
    }

    fn name(&self) -> &'static str {
        "Cached Provider"
    }

    async fn list_tickers(&self) -> Result<Vec<TickerRef>> {
        let key = cache_key(CacheKind::Universe, "all", None);
        if let Some(tickers) = self.cache.get::<Vec<TickerRef>>(&key) {
            return Ok(tickers);
        }

        let tickers = self.inner.list_tickers().await?;
        // An empty universe means resolution failed; don't pin it.
        if !tickers.is_empty() {
            self.cache.put(&key, &tickers, self.universe_ttl);
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

        let mut cached: Vec<Option<Quote>> = Vec::with_capacity(symbols.len());
        let mut missing: Vec<String> = Vec::new();
        for symbol in &symbols {
            let hit = self
                .cache
                .get::<Quote>(&cache_key(CacheKind::Quote, symbol, None));
            if hit.is_none() {
                missing.push(symbol.clone());
            }
            cached.push(hit);
        }

        if !missing.is_empty() {
            let fetched = self.inner.get_quotes(Some(&missing)).await?;
            for quote in fetched {
                let key = cache_key(CacheKind::Quote, &quote.symbol, None);
                self.cache.put(&key, &quote, self.quote_ttl);
                if let Some(slot) = symbols
                    .iter()
                    .position(|s| s.eq_ignore_ascii_case(&quote.symbol))
                {
                    cached[slot] = Some(quote);
                }
            }
        }

        Ok(cached.into_iter().flatten().collect())
    }

    async fn get_history(&self, symbol: &str, period: HistoryPeriod) -> Result<Vec<Candle>> {
        let symbol = symbol.to_uppercase();
        let key = cache_key(CacheKind::History, &symbol, Some(period));
        if let Some(candles) = self.cache.get::<Vec<Candle>>(&key) {
            return Ok(candles);
        }

        let candles = self.inner.get_history(&symbol, period).await?;
        self.cache.put(&key, &candles, self.history_ttl);
        Ok(candles)
    }

    async fn get_fundamentals(&self, symbol: &str) -> Result<FundamentalSnapshot> {
        let symbol = symbol.to_uppercase();
        let key = cache_key(CacheKind::Fundamentals, &symbol, None);
        if let Some(fundamentals) = self.cache.get::<FundamentalSnapshot>(&key) {
            return Ok(fundamentals);
        }

        let fundamentals = self.inner.get_fundamentals(&symbol).await?;
        self.cache.put(&key, &fundamentals, self.fundamentals_ttl);
        Ok(fundamentals)
    }

    async fn search_ticker(&self, query: &str) -> Result<Vec<Quote>> {
        self.inner.search_ticker(query).await
    }

    async fn get_market_summary(&self) -> Result<MarketSummary> {
        match self.get_quotes(None).await {
            Ok(quotes) => Ok(summarize(quotes)),
            Err(e) => {
                warn!("Market summary degraded, no quotes available: {}", e);
                Ok(summarize(Vec::new()))
            }
        }
    }
}
