//! In-memory [`Cache`] implementations for tests.
//!
//! [`MemoryCache`] honors TTLs via `Instant` arithmetic. [`FailingCache`]
//! errors on every call, for exercising the fail-soft degradation path
//! (a cache outage must not affect read correctness).

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::Cache;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// TTL-honoring in-memory cache.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries, for test assertions.
    pub fn live_len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .unwrap()
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().unwrap();
        Ok(entries
            .get(key)
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + Duration::from_secs(ttl_secs),
            },
        );
        Ok(())
    }

    async fn delete_by_pattern(&self, pattern: &str) -> Result<u64> {
        let prefix = pattern.strip_suffix('*').unwrap_or(pattern);
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(prefix));
        Ok((before - entries.len()) as u64)
    }
}

/// Cache double that fails every call, simulating a total outage.
pub struct FailingCache;

#[async_trait]
impl Cache for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        bail!("cache connection refused")
    }

    async fn set(&self, _key: &str, _value: &str, _ttl_secs: u64) -> Result<()> {
        bail!("cache connection refused")
    }

    async fn delete_by_pattern(&self, _pattern: &str) -> Result<u64> {
        bail!("cache connection refused")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let cache = MemoryCache::new();
        cache.set("k", "v", 60).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(cache.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_pattern_delete_removes_prefix_matches() {
        let cache = MemoryCache::new();
        cache.set("unspsc_hierarchy:25171501", "a", 60).await.unwrap();
        cache.set("unspsc_similar:25171501:5", "b", 60).await.unwrap();
        cache.set("unspsc_code:25171501", "c", 60).await.unwrap();
        let removed = cache.delete_by_pattern("unspsc_hierarchy:25171501*").await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(cache.get("unspsc_hierarchy:25171501").await.unwrap(), None);
        assert!(cache.get("unspsc_code:25171501").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failing_cache_errors() {
        let cache = FailingCache;
        assert!(cache.get("k").await.is_err());
        assert!(cache.set("k", "v", 1).await.is_err());
    }
}
