//! Screener configuration
//!
//! All tunables are explicit fields handed to the composition root; nothing
//! reads hidden globals. The shell populates this from its settings screen
//! and environment.

use std::path::PathBuf;
use std::time::Duration;

/// Smallest universe the screener will track
pub const MIN_SYMBOL_LIMIT: usize = 25;
/// Largest universe the screener will track
pub const MAX_SYMBOL_LIMIT: usize = 2000;

/// Configuration for the screening core
#[derive(Debug, Clone)]
pub struct ScreenerConfig {
    /// Upstream API credential; `None` selects the bundled sample provider
    pub api_key: Option<String>,

    /// Base URL of the live market-data API
    pub base_url: String,

    /// Maximum number of symbols resolved per refresh cycle
    pub symbol_limit: usize,

    /// Intraday quote cache TTL
    pub quote_ttl: Duration,

    /// End-of-day history cache TTL
    pub history_ttl: Duration,

    /// Fundamentals cache TTL
    pub fundamentals_ttl: Duration,

    /// Reference universe cache TTL
    pub universe_ttl: Duration,

    /// Minimum spacing between upstream requests
    pub rate_limit_interval: Duration,

    /// Attempt cap for transient upstream failures
    pub max_retries: u32,

    /// Base delay for exponential backoff
    pub retry_base_delay: Duration,

    /// Concurrent fetches per batch chunk
    pub fetch_concurrency: usize,

    /// Per-fetch timeout raced against each network operation
    pub request_timeout: Duration,

    /// Directory for the persisted cache tier; `None` keeps caching in memory
    pub cache_dir: Option<PathBuf>,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.massive.com".to_string(),
            symbol_limit: 50,
            quote_ttl: Duration::from_secs(30),
            history_ttl: Duration::from_secs(24 * 60 * 60),
            fundamentals_ttl: Duration::from_secs(24 * 60 * 60),
            universe_ttl: Duration::from_secs(60 * 60),
            rate_limit_interval: Duration::from_millis(250),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(200),
            fetch_concurrency: 5,
            request_timeout: Duration::from_secs(7),
            cache_dir: None,
        }
    }
}

impl ScreenerConfig {
    /// Create a configuration with the given credential and defaults otherwise
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            ..Self::default()
        }
    }

    /// Symbol limit clamped to the supported range
    pub fn effective_symbol_limit(&self) -> usize {
        self.symbol_limit.clamp(MIN_SYMBOL_LIMIT, MAX_SYMBOL_LIMIT)
    }

    /// Whether a live provider credential is configured
    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_limit_clamped() {
        let mut config = ScreenerConfig::default();

        config.symbol_limit = 5;
        assert_eq!(config.effective_symbol_limit(), MIN_SYMBOL_LIMIT);

        config.symbol_limit = 100_000;
        assert_eq!(config.effective_symbol_limit(), MAX_SYMBOL_LIMIT);

        config.symbol_limit = 500;
        assert_eq!(config.effective_symbol_limit(), 500);
    }

    #[test]
    fn test_blank_credential_selects_sample_variant() {
        assert!(!ScreenerConfig::new(None).has_credential());
        assert!(!ScreenerConfig::new(Some("   ".to_string())).has_credential());
        assert!(ScreenerConfig::new(Some("key".to_string())).has_credential());
    }
}
