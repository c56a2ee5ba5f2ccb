//! Persisted cache store
//!
//! Embedded SQLite key-value store backing the durable cache tier. The
//! on-disk format is private to this module; callers only see get/set/delete
//! over JSON payloads with absolute expiry timestamps.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;

/// SQLite-backed key/value store with per-row expiry
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at the given path
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )",
            [],
        )?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.purge_expired(chrono::Utc::now().timestamp_millis())?;

        Ok(store)
    }

    /// Fetch the raw JSON payload and expiry for a key
    pub fn get(&self, key: &str) -> Result<Option<(String, i64)>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT value, expires_at FROM cache_entries WHERE key = ?",
                [key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(row)
    }

    /// Insert or replace a key; flushed to disk before returning
    pub fn set(&self, key: &str, value: &str, expires_at: i64) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO cache_entries (key, value, expires_at) VALUES (?, ?, ?)",
            rusqlite::params![key, value, expires_at],
        )?;
        Ok(())
    }

    /// Delete a key (no-op when absent)
    pub fn delete(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM cache_entries WHERE key = ?", [key])?;
        Ok(())
    }

    /// Drop every row whose expiry is at or before `now_ms`
    pub fn purge_expired(&self, now_ms: i64) -> Result<usize> {
        let conn = self.conn.lock();
        let purged = conn.execute(
            "DELETE FROM cache_entries WHERE expires_at <= ?",
            [now_ms],
        )?;
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(&dir.path().join("cache.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_set_get_round_trip() {
        let (_dir, store) = temp_store();

        store.set("quote:AAA", "{\"price\":100.5}", i64::MAX).unwrap();
        let (value, expires) = store.get("quote:AAA").unwrap().unwrap();
        assert_eq!(value, "{\"price\":100.5}");
        assert_eq!(expires, i64::MAX);
    }

    #[test]
    fn test_replace_overwrites() {
        let (_dir, store) = temp_store();

        store.set("k", "old", 10).unwrap();
        store.set("k", "new", 20).unwrap();

        let (value, expires) = store.get("k").unwrap().unwrap();
        assert_eq!(value, "new");
        assert_eq!(expires, 20);
    }

    #[test]
    fn test_delete_and_missing_key() {
        let (_dir, store) = temp_store();

        assert!(store.get("missing").unwrap().is_none());
        store.set("k", "v", 10).unwrap();
        store.delete("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_purge_expired_rows() {
        let (_dir, store) = temp_store();

        store.set("stale", "v", 100).unwrap();
        store.set("fresh", "v", 10_000).unwrap();

        let purged = store.purge_expired(100).unwrap();
        assert_eq!(purged, 1);
        assert!(store.get("stale").unwrap().is_none());
        assert!(store.get("fresh").unwrap().is_some());
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");

        {
            let store = SqliteStore::new(&path).unwrap();
            store.set("k", "v", i64::MAX).unwrap();
        }

        let store = SqliteStore::new(&path).unwrap();
        assert!(store.get("k").unwrap().is_some());
    }
}
