//! Tiered TTL cache
//!
//! In-memory map in front of an optional persisted store. Reads check memory
//! first, then the store (populating memory on a hit); writes land in both
//! tiers. An entry whose expiry is at or before now is a miss regardless of
//! its stored value, and writes always replace.

pub mod store;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use store::SqliteStore;

use crate::providers::types::HistoryPeriod;

/// What a cache key refers to; each kind carries its own TTL policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Quote,
    History,
    Fundamentals,
    Universe,
}

impl CacheKind {
    fn as_str(&self) -> &'static str {
        match self {
            CacheKind::Quote => "quote",
            CacheKind::History => "history",
            CacheKind::Fundamentals => "fundamentals",
            CacheKind::Universe => "universe",
        }
    }
}

/// Build the canonical cache key for a kind/symbol/period triple
pub fn cache_key(kind: CacheKind, symbol: &str, period: Option<HistoryPeriod>) -> String {
    match period {
        Some(period) => format!("{}:{}:{}", kind.as_str(), symbol, period.as_str()),
        None => format!("{}:{}", kind.as_str(), symbol),
    }
}

/// A cached value plus its absolute expiry (epoch milliseconds)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: serde_json::Value,
    pub expires_at: i64,
}

impl CacheEntry {
    fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at <= now_ms
    }
}

/// Memory tier backed by an optional persisted store
pub struct TieredCache {
    memory: DashMap<String, CacheEntry>,
    store: Option<Arc<SqliteStore>>,
}

impl TieredCache {
    /// Memory-only cache
    pub fn new() -> Self {
        Self {
            memory: DashMap::new(),
            store: None,
        }
    }

    /// Cache with a persisted second tier
    pub fn with_store(store: Arc<SqliteStore>) -> Self {
        Self {
            memory: DashMap::new(),
            store: Some(store),
        }
    }

    /// Typed lookup; expired entries are treated as absent and dropped.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let now_ms = now_ms();

        if let Some(entry) = self.memory.get(key) {
            if !entry.is_expired(now_ms) {
                return serde_json::from_value(entry.value.clone()).ok();
            }
            drop(entry);
            self.memory.remove(key);
            if let Some(store) = &self.store {
                if let Err(e) = store.delete(key) {
                    warn!("Failed to drop expired cache row {}: {}", key, e);
                }
            }
            return None;
        }

        // Memory miss: consult the persisted tier and repopulate memory.
        let store = self.store.as_ref()?;
        match store.get(key) {
            Ok(Some((raw, expires_at))) if expires_at > now_ms => {
                let value: serde_json::Value = serde_json::from_str(&raw).ok()?;
                self.memory.insert(
                    key.to_string(),
                    CacheEntry {
                        value: value.clone(),
                        expires_at,
                    },
                );
                serde_json::from_value(value).ok()
            }
            Ok(Some(_)) => {
                if let Err(e) = store.delete(key) {
                    warn!("Failed to drop expired cache row {}: {}", key, e);
                }
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Persisted cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    /// Write to both tiers with the given TTL; replaces any previous entry.
    pub fn put<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to serialize cache value for {}: {}", key, e);
                return;
            }
        };
        let expires_at = now_ms() + ttl.as_millis() as i64;

        if let Some(store) = &self.store {
            if let Err(e) = store.set(key, &value.to_string(), expires_at) {
                warn!("Persisted cache write failed for {}: {}", key, e);
            }
        }

        self.memory.insert(key.to_string(), CacheEntry { value, expires_at });
    }

    /// Remove a key from both tiers
    pub fn remove(&self, key: &str) {
        self.memory.remove(key);
        if let Some(store) = &self.store {
            if let Err(e) = store.delete(key) {
                warn!("Persisted cache delete failed for {}: {}", key, e);
            }
        }
    }
}

impl Default for TieredCache {
    fn default() -> Self {
        Self::new()
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_scheme() {
        assert_eq!(cache_key(CacheKind::Quote, "AAPL", None), "quote:AAPL");
        assert_eq!(
            cache_key(CacheKind::History, "AAPL", Some(HistoryPeriod::Year1)),
            "history:AAPL:1y"
        );
    }

    #[test]
    fn test_hit_before_ttl_elapses() {
        let cache = TieredCache::new();
        cache.put("k", &42u32, Duration::from_secs(60));

        assert_eq!(cache.get::<u32>("k"), Some(42));
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = TieredCache::new();
        cache.put("k", &42u32, Duration::ZERO);

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get::<u32>("k"), None);
        // The expired entry was dropped, not just hidden.
        assert!(cache.memory.get("k").is_none());
    }

    #[test]
    fn test_write_replaces_previous_value() {
        let cache = TieredCache::new();
        cache.put("k", &1u32, Duration::from_secs(60));
        cache.put("k", &2u32, Duration::from_secs(60));

        assert_eq!(cache.get::<u32>("k"), Some(2));
    }

    #[test]
    fn test_persisted_hit_populates_memory() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::new(&dir.path().join("cache.db")).unwrap());

        let first = TieredCache::with_store(store.clone());
        first.put("k", &"hello", Duration::from_secs(60));

        // Fresh memory tier over the same store: read must come from disk.
        let second = TieredCache::with_store(store);
        assert_eq!(second.get::<String>("k"), Some("hello".to_string()));
        assert!(second.memory.get("k").is_some());
    }

    #[test]
    fn test_expired_persisted_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::new(&dir.path().join("cache.db")).unwrap());

        let first = TieredCache::with_store(store.clone());
        first.put("k", &1u32, Duration::ZERO);
        std::thread::sleep(Duration::from_millis(5));

        let second = TieredCache::with_store(store.clone());
        assert_eq!(second.get::<u32>("k"), None);
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_remove_clears_both_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::new(&dir.path().join("cache.db")).unwrap());

        let cache = TieredCache::with_store(store.clone());
        cache.put("k", &1u32, Duration::from_secs(60));
        cache.remove("k");

        assert_eq!(cache.get::<u32>("k"), None);
        assert!(store.get("k").unwrap().is_none());
    }
}
