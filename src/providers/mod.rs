//! Market data provider adapters

pub mod massive;
pub mod rate_limiter;
pub mod resilient;
pub mod retry;
pub mod sample;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;

use crate::cache::{SqliteStore, TieredCache};
use crate::config::ScreenerConfig;
use crate::error::Result;
use resilient::{CachedProvider, FallbackProvider};
use types::*;

/// Number of quotes surfaced as market movers
const MOVER_COUNT: usize = 5;
/// Upper bound on ticker search results
pub const SEARCH_RESULT_LIMIT: usize = 10;

/// Capability trait all market data providers implement.
///
/// Implementations may fail individual operations; the composition root
/// wraps every live variant so that per-symbol failures degrade to
/// best-effort defaults instead of crossing this boundary.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Provider ID (e.g., "massive", "sample")
    fn id(&self) -> &'static str;

    /// Provider display name
    fn name(&self) -> &'static str;

    /// Resolve the reference universe, capped at the configured symbol limit
    async fn list_tickers(&self) -> Result<Vec<TickerRef>>;

    /// Get quotes for the given symbols, or for the default universe when
    /// `symbols` is `None`. Symbols that fail to resolve are omitted.
    async fn get_quotes(&self, symbols: Option<&[String]>) -> Result<Vec<Quote>>;

    /// Get historical candles; empty when the upstream has no data
    async fn get_history(&self, symbol: &str, period: HistoryPeriod) -> Result<Vec<Candle>>;

    /// Get the fundamental snapshot; zero-filled when nothing is available
    async fn get_fundamentals(&self, symbol: &str) -> Result<FundamentalSnapshot>;

    /// Free-text search over symbol and name, bounded result count
    async fn search_ticker(&self, query: &str) -> Result<Vec<Quote>>;

    /// Market overview derived from the tracked universe
    async fn get_market_summary(&self) -> Result<MarketSummary>;
}

/// Build the provider stack for a configuration.
///
/// A configured credential selects the live variant, wrapped with fallback
/// to sample data and the tiered cache; without a credential the sample
/// variant is used directly.
pub fn build_provider(config: &ScreenerConfig) -> Arc<dyn MarketDataProvider> {
    let sample = sample::SampleProvider::new();
    if !config.has_credential() {
        return Arc::new(sample);
    }

    let live = massive::MassiveProvider::new(config);
    let chained = FallbackProvider::new(Arc::new(live), Arc::new(sample));

    let cache = match &config.cache_dir {
        Some(dir) => match SqliteStore::new(&dir.join("marketlens-cache.db")) {
            Ok(store) => TieredCache::with_store(Arc::new(store)),
            Err(e) => {
                warn!("Persisted cache unavailable, falling back to memory: {}", e);
                TieredCache::new()
            }
        },
        None => TieredCache::new(),
    };

    Arc::new(CachedProvider::new(Arc::new(chained), cache, config))
}

/// Derive a market summary from a set of quotes: top movers by percent
/// change plus a synthesized headline. Never fails; an empty quote set
/// yields a placeholder.
pub fn summarize(mut quotes: Vec<Quote>) -> MarketSummary {
    if quotes.is_empty() {
        return MarketSummary {
            updated_at: Utc::now(),
            headline: "Market data unavailable".to_string(),
            movers: Vec::new(),
        };
    }

    let total = quotes.len();
    let gainers = quotes.iter().filter(|q| q.change_pct > 0.0).count();
    let headline = format!("{} of {} tracked stocks trading higher", gainers, total);

    quotes.sort_by(|a, b| {
        b.change_pct
            .partial_cmp(&a.change_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    quotes.truncate(MOVER_COUNT);

    MarketSummary {
        updated_at: Utc::now(),
        headline,
        movers: quotes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(symbol: &str, change_pct: f64) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            name: None,
            sector: None,
            price: 100.0,
            change_pct,
            volume: 0,
            currency: None,
            exchange: None,
        }
    }

    #[test]
    fn test_summary_orders_movers_by_percent_change() {
        let summary = summarize(vec![
            quote("AAA", -2.0),
            quote("BBB", 4.5),
            quote("CCC", 1.0),
        ]);

        assert_eq!(summary.headline, "2 of 3 tracked stocks trading higher");
        let symbols: Vec<&str> = summary.movers.iter().map(|q| q.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BBB", "CCC", "AAA"]);
    }

    #[test]
    fn test_summary_caps_mover_count() {
        let quotes: Vec<Quote> = (0..12)
            .map(|i| quote(&format!("S{i}"), i as f64))
            .collect();
        assert_eq!(summarize(quotes).movers.len(), MOVER_COUNT);
    }

    #[test]
    fn test_empty_quotes_yield_placeholder() {
        let summary = summarize(Vec::new());
        assert_eq!(summary.headline, "Market data unavailable");
        assert!(summary.movers.is_empty());
    }

    #[test]
    fn test_credential_presence_selects_variant() {
        let sample = build_provider(&ScreenerConfig::new(None));
        assert_eq!(sample.id(), "sample");

        let live = build_provider(&ScreenerConfig::new(Some("key".to_string())));
        assert_eq!(live.id(), "cached");
    }
}
