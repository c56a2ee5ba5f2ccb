//! MarketLens Desktop - Stock Screening & Recommendation Engine
//!
//! Core library behind the desktop shell: resilient market-data acquisition
//! (multi-provider fallback, batching, rate limiting, retry with backoff,
//! tiered TTL caching) feeding a recommendation ranking engine that turns
//! per-instrument snapshots into explainable 0-100 scores and Buy/Hold/Sell
//! signals.

pub mod analysis;
pub mod cache;
pub mod config;
pub mod error;
pub mod indicators;
pub mod providers;
pub mod ranking;
pub mod screener;

pub use analysis::{RankingInput, Signal};
pub use config::ScreenerConfig;
pub use error::{AppError, Result};
pub use providers::types::{Candle, FundamentalSnapshot, HistoryPeriod, MarketSummary, Quote};
pub use providers::{build_provider, MarketDataProvider};
pub use ranking::{build_recommendations, RankingOptions, Recommendation};
pub use screener::Screener;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging; called once by the shell at startup.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marketlens_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
