use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Configuration for the cache instances owned by the client.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// How long a full search response stays servable.
    pub response_ttl: Duration,
    /// How long AI-derived enrichment fields stay reusable. Enrichment is
    /// expensive and stable, so this is much longer than `response_ttl`.
    pub enrichment_ttl: Duration,
    /// How long raw provider payloads are reusable before a fresh fetch.
    pub raw_jobs_ttl: Duration,
    /// Maximum number of entries per cache instance.
    pub max_entries: usize,
    /// Interval for the background expiry sweep.
    pub sweep_interval: Duration,
    /// Whether caching is enabled.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            response_ttl: Duration::minutes(30),
            enrichment_ttl: Duration::hours(24),
            raw_jobs_ttl: Duration::hours(1),
            max_entries: 1000,
            sweep_interval: Duration::minutes(5),
            enabled: true,
        }
    }
}

/// A cached value with its expiry bookkeeping.
#[derive(Clone, Debug)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            created_at: Utc::now(),
            ttl,
        }
    }

    /// A read past `created_at + ttl` treats the entry as absent.
    pub fn is_valid(&self) -> bool {
        Utc::now() < self.created_at + self.ttl
    }
}

/// Generic expiring key→value store.
///
/// One instance per concern: full search responses, enrichment payloads,
/// raw fetched jobs. The TTL asymmetry between those instances is
/// intentional (see `CacheConfig`).
pub struct TtlCache<V: Clone> {
    entries: DashMap<String, CacheEntry<V>>,
    ttl: Duration,
    max_entries: usize,
    enabled: bool,
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    pub fn new(ttl: Duration, max_entries: usize, enabled: bool) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries,
            enabled,
        }
    }

    /// Get the value if present and unexpired; expired entries are evicted
    /// on read.
    pub fn get(&self, key: &str) -> Option<V> {
        if !self.enabled {
            return None;
        }

        if let Some(entry) = self.entries.get(key) {
            if entry.is_valid() {
                log::debug!("cache hit for key: {}", key);
                return Some(entry.value.clone());
            }
            drop(entry);
            log::debug!("cache expired for key: {}", key);
            self.entries.remove(key);
        }

        None
    }

    /// Store a value with `expires_at = now + ttl`.
    pub fn set(&self, key: impl Into<String>, value: V) {
        if !self.enabled {
            return;
        }

        if self.entries.len() >= self.max_entries {
            self.evict_expired();

            // Still at capacity: drop the oldest quarter.
            if self.entries.len() >= self.max_entries {
                self.evict_oldest();
            }
        }

        let key = key.into();
        self.entries.insert(key.clone(), CacheEntry::new(value, self.ttl));
        log::debug!("stored cache entry for key: {}", key);
    }

    pub fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Drop every entry whose key starts with `prefix`. Paged entries
    /// share a key prefix, so this clears all pages of one search.
    pub fn remove_prefix(&self, prefix: &str) {
        self.entries.retain(|key, _| !key.starts_with(prefix));
    }

    pub fn clear(&self) {
        self.entries.clear();
        log::info!("cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every expired entry.
    pub fn evict_expired(&self) {
        let expired_keys: Vec<_> = self
            .entries
            .iter()
            .filter(|entry| !entry.value().is_valid())
            .map(|entry| entry.key().clone())
            .collect();

        let expired_count = expired_keys.len();

        for key in expired_keys {
            self.entries.remove(&key);
        }

        if expired_count > 0 {
            log::debug!("evicted {} expired cache entries", expired_count);
        }
    }

    /// Remove the oldest entries when at capacity.
    fn evict_oldest(&self) {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().created_at))
            .collect();

        entries.sort_by_key(|(_, created_at)| *created_at);

        let to_remove = (self.max_entries / 4).max(1);
        for (key, _) in entries.into_iter().take(to_remove) {
            self.entries.remove(&key);
        }

        log::debug!("evicted {} oldest cache entries", to_remove);
    }

    /// Spawn a detached task that sweeps expired entries on a fixed
    /// interval, bounding memory even for keys that are never re-read.
    /// Must be called from within a tokio runtime.
    pub fn spawn_sweeper(
        cache: Arc<Self>,
        interval: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let period = interval
            .to_std()
            .unwrap_or_else(|_| std::time::Duration::from_secs(300));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                cache.evict_expired();
            }
        })
    }

    pub fn stats(&self) -> CacheStats {
        let total_entries = self.entries.len();
        let expired_entries = self
            .entries
            .iter()
            .filter(|entry| !entry.value().is_valid())
            .count();

        CacheStats {
            total_entries,
            valid_entries: total_entries - expired_entries,
            expired_entries,
            max_entries: self.max_entries,
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub max_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let cache: TtlCache<String> = TtlCache::new(Duration::minutes(5), 100, true);
        cache.set("k", "v".to_string());
        assert_eq!(cache.get("k"), Some("v".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_read_evicts() {
        let cache: TtlCache<String> = TtlCache::new(Duration::seconds(1), 100, true);
        cache.set("k", "v".to_string());

        // Backdate the entry past its TTL.
        cache.entries.insert(
            "k".to_string(),
            CacheEntry {
                value: "v".to_string(),
                created_at: Utc::now() - Duration::seconds(2),
                ttl: Duration::seconds(1),
            },
        );

        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::minutes(5), 100, false);
        cache.set("k", 1);
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_eviction_keeps_len_bounded() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::minutes(5), 8, true);
        for i in 0..20 {
            cache.set(format!("k{}", i), i);
        }
        assert!(cache.len() <= 8);
    }

    #[test]
    fn test_evict_expired_only_removes_stale() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::minutes(5), 100, true);
        cache.set("live", 1);
        cache.entries.insert(
            "stale".to_string(),
            CacheEntry {
                value: 2,
                created_at: Utc::now() - Duration::minutes(10),
                ttl: Duration::minutes(5),
            },
        );

        cache.evict_expired();
        assert_eq!(cache.get("live"), Some(1));
        assert_eq!(cache.len(), 1);
    }
}
