//! Screener refresh service
//!
//! Drives one ranking cycle: resolve the symbol set, assemble per-instrument
//! snapshots in bounded chunks, then hand the batch to the ranking
//! orchestrator. Each cycle carries a generation token checked after every
//! suspension point so a superseded cycle discards its results instead of
//! applying them out of order; the shell calls `stop` on teardown.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::join_all;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::analysis::RankingInput;
use crate::config::ScreenerConfig;
use crate::error::{AppError, Result};
use crate::providers::types::{FundamentalSnapshot, HistoryPeriod, Quote};
use crate::providers::MarketDataProvider;
use crate::ranking::{build_recommendations, RankingOptions, Recommendation};

/// Minimal symbol set used when universe resolution comes back empty
const DEFAULT_SYMBOLS: &[&str] = &["NLTC", "MERB", "CRSP", "BORE", "GRNR"];

/// Refresh-cycle driver owning the provider stack for one screen
pub struct Screener {
    provider: Arc<dyn MarketDataProvider>,
    config: ScreenerConfig,
    live: AtomicBool,
    generation: AtomicU64,
    /// Symbols beyond the per-cycle cap, carried over to the next cycle
    deferred: Mutex<VecDeque<String>>,
}

impl Screener {
    pub fn new(provider: Arc<dyn MarketDataProvider>, config: ScreenerConfig) -> Self {
        Self {
            provider,
            config,
            live: AtomicBool::new(true),
            generation: AtomicU64::new(0),
            deferred: Mutex::new(VecDeque::new()),
        }
    }

    /// Run one ranking cycle.
    ///
    /// `symbols: None` resolves the default universe (deferred symbols from
    /// the previous cycle first). Returns an empty list when no instrument
    /// yields usable data; the shell renders that as an explicit no-data
    /// state. A cycle superseded by a newer one (or by `stop`) returns
    /// `AppError::Superseded`.
    pub async fn refresh(
        &self,
        symbols: Option<Vec<String>>,
        period: HistoryPeriod,
        options: &RankingOptions,
    ) -> Result<Vec<Recommendation>> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.ensure_current(generation)?;

        let symbols = match symbols {
            Some(list) => list.iter().map(|s| s.trim().to_uppercase()).collect(),
            None => self.resolve_universe().await?,
        };
        self.ensure_current(generation)?;

        let symbols = self.cap_symbols(symbols);
        if symbols.is_empty() {
            return Ok(Vec::new());
        }

        let quotes = match self
            .with_timeout(self.provider.get_quotes(Some(&symbols)))
            .await
        {
            Ok(quotes) => quotes,
            Err(e) => {
                warn!("Quote batch failed, presenting no-data state: {}", e);
                return Ok(Vec::new());
            }
        };
        self.ensure_current(generation)?;

        let inputs = self.assemble_inputs(generation, quotes, period).await?;
        info!(
            "Refresh cycle {} assembled {} instruments",
            generation,
            inputs.len()
        );

        Ok(build_recommendations(&inputs, options))
    }

    /// Mark the screener stopped; in-flight cycles discard their results.
    pub fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn ensure_current(&self, generation: u64) -> Result<()> {
        if !self.is_live() || self.generation.load(Ordering::SeqCst) != generation {
            return Err(AppError::Superseded);
        }
        Ok(())
    }

    /// Default universe: deferred symbols from the previous cycle, else the
    /// provider's reference universe, else a minimal built-in list.
    async fn resolve_universe(&self) -> Result<Vec<String>> {
        let deferred: Vec<String> = {
            let mut queue = self.deferred.lock();
            queue.drain(..).collect()
        };
        if !deferred.is_empty() {
            debug!("Resuming {} deferred symbols", deferred.len());
            return Ok(deferred);
        }

        let tickers = match self.with_timeout(self.provider.list_tickers()).await {
            Ok(tickers) => tickers,
            Err(e) => {
                warn!("Universe resolution failed: {}", e);
                Vec::new()
            }
        };

        if tickers.is_empty() {
            return Ok(DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect());
        }
        Ok(tickers.into_iter().map(|t| t.symbol).collect())
    }

    /// Enforce the per-cycle symbol cap, deferring the excess.
    fn cap_symbols(&self, mut symbols: Vec<String>) -> Vec<String> {
        let limit = self.config.effective_symbol_limit();
        if symbols.len() > limit {
            let excess: Vec<String> = symbols.split_off(limit);
            debug!("Deferring {} symbols to the next cycle", excess.len());
            *self.deferred.lock() = excess.into();
        }
        symbols
    }

    /// Fetch history and fundamentals per quote in bounded chunks.
    async fn assemble_inputs(
        &self,
        generation: u64,
        quotes: Vec<Quote>,
        period: HistoryPeriod,
    ) -> Result<Vec<RankingInput>> {
        let chunk_size = self.config.fetch_concurrency.max(1);
        let mut inputs = Vec::with_capacity(quotes.len());

        for chunk in quotes.chunks(chunk_size) {
            let assembled = join_all(
                chunk
                    .iter()
                    .map(|quote| self.assemble_one(quote.clone(), period)),
            )
            .await;
            self.ensure_current(generation)?;
            inputs.extend(assembled);
        }

        Ok(inputs)
    }

    async fn assemble_one(&self, quote: Quote, period: HistoryPeriod) -> RankingInput {
        let symbol = quote.symbol.clone();

        let (history, fundamentals) = tokio::join!(
            self.with_timeout(self.provider.get_history(&symbol, period)),
            self.with_timeout(self.provider.get_fundamentals(&symbol)),
        );

        let history = history.unwrap_or_else(|e| {
            warn!("History unavailable for {}: {}", symbol, e);
            Vec::new()
        });
        let fundamentals = fundamentals.unwrap_or_else(|e| {
            warn!("Fundamentals unavailable for {}: {}", symbol, e);
            FundamentalSnapshot::default()
        });

        RankingInput {
            quote,
            history,
            fundamentals,
        }
    }

    /// Race a fetch against the configured timeout; a timeout is an ordinary
    /// fetch failure.
    async fn with_timeout<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.config.request_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::sample::SampleProvider;
    use crate::providers::types::{Candle, MarketSummary, TickerRef};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn screener_with_sample() -> Screener {
        Screener::new(Arc::new(SampleProvider::new()), ScreenerConfig::default())
    }

    #[tokio::test]
    async fn test_refresh_produces_sorted_bounded_scores() {
        let screener = screener_with_sample();
        let recs = screener
            .refresh(None, HistoryPeriod::Year1, &RankingOptions::default())
            .await
            .unwrap();

        assert!(!recs.is_empty());
        for pair in recs.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        for rec in &recs {
            assert!(rec.score <= 100);
            assert!(rec.factors.len() <= 3);
        }
    }

    #[tokio::test]
    async fn test_unknown_symbols_yield_no_data_state() {
        let screener = screener_with_sample();
        let recs = screener
            .refresh(
                Some(vec!["NOPE1".to_string(), "NOPE2".to_string()]),
                HistoryPeriod::Year1,
                &RankingOptions::default(),
            )
            .await
            .unwrap();

        assert!(recs.is_empty());
    }

    #[tokio::test]
    async fn test_stopped_screener_discards_cycle() {
        let screener = screener_with_sample();
        screener.stop();

        let result = screener
            .refresh(None, HistoryPeriod::Year1, &RankingOptions::default())
            .await;
        assert!(matches!(result, Err(AppError::Superseded)));
    }

    #[tokio::test]
    async fn test_options_are_applied() {
        let screener = screener_with_sample();
        let recs = screener
            .refresh(
                None,
                HistoryPeriod::Year1,
                &RankingOptions {
                    sectors: Some(vec!["Technology".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(!recs.is_empty());
        assert!(recs
            .iter()
            .all(|rec| rec.sector.as_deref() == Some("Technology")));
    }

    /// Provider with a wide universe for exercising the symbol cap
    struct WideProvider {
        count: usize,
    }

    #[async_trait]
    impl MarketDataProvider for WideProvider {
        fn id(&self) -> &'static str {
            "wide"
        }

        fn name(&self) -> &'static str {
            "Wide Universe"
        }

        async fn list_tickers(&self) -> Result<Vec<TickerRef>> {
            Ok((0..self.count)
                .map(|i| TickerRef {
                    symbol: format!("SYM{i:03}"),
                    name: None,
                    sector: Some("Test".to_string()),
                    exchange: None,
                    currency: None,
                })
                .collect())
        }

        async fn get_quotes(&self, symbols: Option<&[String]>) -> Result<Vec<Quote>> {
            let symbols = symbols.unwrap_or(&[]);
            Ok(symbols
                .iter()
                .map(|symbol| Quote {
                    symbol: symbol.clone(),
                    name: None,
                    sector: Some("Test".to_string()),
                    price: 100.0,
                    change_pct: 0.0,
                    volume: 0,
                    currency: None,
                    exchange: None,
                })
                .collect())
        }

        async fn get_history(&self, _symbol: &str, _period: HistoryPeriod) -> Result<Vec<Candle>> {
            Ok(vec![Candle {
                timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.0,
                volume: 10.0,
            }])
        }

        async fn get_fundamentals(&self, _symbol: &str) -> Result<FundamentalSnapshot> {
            Ok(FundamentalSnapshot::default())
        }

        async fn search_ticker(&self, _query: &str) -> Result<Vec<Quote>> {
            Ok(Vec::new())
        }

        async fn get_market_summary(&self) -> Result<MarketSummary> {
            Ok(crate::providers::summarize(Vec::new()))
        }
    }

    #[tokio::test]
    async fn test_excess_symbols_deferred_to_next_cycle() {
        let config = ScreenerConfig {
            symbol_limit: 25,
            ..Default::default()
        };
        let screener = Screener::new(Arc::new(WideProvider { count: 30 }), config);

        let first = screener
            .refresh(None, HistoryPeriod::Year1, &RankingOptions::default())
            .await
            .unwrap();
        assert_eq!(first.len(), 25);

        // The next default-universe cycle drains the deferred queue.
        let second = screener
            .refresh(None, HistoryPeriod::Year1, &RankingOptions::default())
            .await
            .unwrap();
        assert_eq!(second.len(), 5);
        assert!(second.iter().all(|rec| rec.symbol.as_str() >= "SYM025"));
    }

    /// Provider that stalls long enough for a newer cycle to supersede it
    struct SlowProvider;

    #[async_trait]
    impl MarketDataProvider for SlowProvider {
        fn id(&self) -> &'static str {
            "slow"
        }

        fn name(&self) -> &'static str {
            "Slow"
        }

        async fn list_tickers(&self) -> Result<Vec<TickerRef>> {
            Ok(vec![TickerRef {
                symbol: "SLOW".to_string(),
                name: None,
                sector: None,
                exchange: None,
                currency: None,
            }])
        }

        async fn get_quotes(&self, _symbols: Option<&[String]>) -> Result<Vec<Quote>> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(vec![Quote {
                symbol: "SLOW".to_string(),
                name: None,
                sector: None,
                price: 1.0,
                change_pct: 0.0,
                volume: 0,
                currency: None,
                exchange: None,
            }])
        }

        async fn get_history(&self, _symbol: &str, _period: HistoryPeriod) -> Result<Vec<Candle>> {
            Ok(Vec::new())
        }

        async fn get_fundamentals(&self, _symbol: &str) -> Result<FundamentalSnapshot> {
            Ok(FundamentalSnapshot::default())
        }

        async fn search_ticker(&self, _query: &str) -> Result<Vec<Quote>> {
            Ok(Vec::new())
        }

        async fn get_market_summary(&self) -> Result<MarketSummary> {
            Ok(crate::providers::summarize(Vec::new()))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_superseded_cycle_discards_results() {
        let screener = Arc::new(Screener::new(
            Arc::new(SlowProvider),
            ScreenerConfig::default(),
        ));

        let slow_cycle = {
            let screener = screener.clone();
            tokio::spawn(async move {
                screener
                    .refresh(None, HistoryPeriod::Year1, &RankingOptions::default())
                    .await
            })
        };

        // Let the first cycle reach its quote fetch, then start a newer one.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = screener
            .refresh(None, HistoryPeriod::Year1, &RankingOptions::default())
            .await;

        let result = slow_cycle.await.unwrap();
        assert!(matches!(result, Err(AppError::Superseded)));
    }
}
