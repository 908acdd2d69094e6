//! Bounded TTL cache shared by search and extraction.
//!
//! Keys are namespaced (`search:` / `content:`) so a query string can never
//! collide with a URL. Capacity is bounded by an LRU; expiry is checked on
//! read and an expired entry is dropped rather than served.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::scraping::config::CacheConfig;
use crate::scraping::types::{ExtractedContent, SearchResult};

/// Cached payload.
#[derive(Clone, Debug)]
enum CachedValue {
    Search(Vec<SearchResult>),
    Content(ExtractedContent),
}

/// Cache entry with its insertion time.
#[derive(Clone, Debug)]
struct CacheEntry {
    value: CachedValue,
    stored_at: Instant,
}

impl CacheEntry {
    fn new(value: CachedValue) -> Self {
        Self {
            value,
            stored_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() > ttl
    }
}

/// Thread-safe LRU + TTL cache for search results and page content.
pub struct ResearchCache {
    enabled: bool,
    ttl: Duration,
    capacity: usize,
    entries: Mutex<LruCache<String, CacheEntry>>,
}

impl ResearchCache {
    /// Create a new cache with the given configuration.
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        let mut cache = Self::with_ttl(
            config.max_entries,
            Duration::from_secs(config.ttl_seconds),
        );
        cache.enabled = config.enabled;
        cache
    }

    /// Create an enabled cache with an explicit TTL.
    #[must_use]
    pub fn with_ttl(max_entries: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            enabled: true,
            ttl,
            capacity: capacity.get(),
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Cache key for a search query and result count.
    #[must_use]
    pub fn search_key(query: &str, max_results: usize) -> String {
        format!("search:{max_results}:{}", query.trim().to_lowercase())
    }

    /// Cache key for the content of a URL.
    #[must_use]
    pub fn content_key(url: &str) -> String {
        format!("content:{}", url.trim())
    }

    /// Get cached search results.
    #[must_use]
    pub fn get_search(&self, query: &str, max_results: usize) -> Option<Vec<SearchResult>> {
        match self.get(&Self::search_key(query, max_results))? {
            CachedValue::Search(results) => Some(results),
            CachedValue::Content(_) => None,
        }
    }

    /// Cache search results.
    pub fn set_search(&self, query: &str, max_results: usize, results: &[SearchResult]) {
        self.put(
            Self::search_key(query, max_results),
            CachedValue::Search(results.to_vec()),
        );
    }

    /// Get cached page content.
    #[must_use]
    pub fn get_content(&self, url: &str) -> Option<ExtractedContent> {
        match self.get(&Self::content_key(url))? {
            CachedValue::Content(content) => Some(content),
            CachedValue::Search(_) => None,
        }
    }

    /// Cache page content.
    pub fn set_content(&self, url: &str, content: &ExtractedContent) {
        self.put(Self::content_key(url), CachedValue::Content(content.clone()));
    }

    fn get(&self, key: &str) -> Option<CachedValue> {
        if !self.enabled {
            return None;
        }
        let Ok(mut entries) = self.entries.lock() else {
            return None;
        };

        let expired = entries.peek(key)?.is_expired(self.ttl);
        if expired {
            entries.pop(key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    fn put(&self, key: String, value: CachedValue) {
        if !self.enabled {
            return;
        }
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(key, CacheEntry::new(value));
        }
    }

    /// Remove every expired entry.
    pub fn purge_expired(&self) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(self.ttl))
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            entries.pop(&key);
        }
    }

    /// Clear all entries.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    /// Get cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let Ok(entries) = self.entries.lock() else {
            return CacheStats {
                capacity: self.capacity,
                ..CacheStats::default()
            };
        };

        let mut stats = CacheStats {
            capacity: self.capacity,
            ..CacheStats::default()
        };
        for (_, entry) in entries.iter() {
            match entry.value {
                CachedValue::Search(_) => stats.search_entries += 1,
                CachedValue::Content(_) => stats.content_entries += 1,
            }
            if entry.is_expired(self.ttl) {
                stats.expired_entries += 1;
            }
        }
        stats
    }
}

/// Cache statistics.
#[derive(Clone, Debug, Default)]
pub struct CacheStats {
    /// Number of search result entries.
    pub search_entries: usize,
    /// Number of content entries.
    pub content_entries: usize,
    /// Entries past their TTL that have not been read or purged yet.
    pub expired_entries: usize,
    /// Maximum number of entries.
    pub capacity: usize,
}

impl CacheStats {
    /// Total number of entries.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.search_entries + self.content_entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraping::types::SearchSource;

    fn sample_results() -> Vec<SearchResult> {
        vec![SearchResult::new(
            "Test",
            "https://test.com",
            "Test description",
            SearchSource::Google,
        )]
    }

    #[test]
    fn test_cache_search_results() {
        let cache = ResearchCache::new(&CacheConfig::default());
        cache.set_search("Electric Bikes", 10, &sample_results());

        let cached = cache.get_search("electric bikes", 10);
        assert_eq!(cached.unwrap_or_default().len(), 1);
        assert!(cache.get_search("electric bikes", 5).is_none());
    }

    #[test]
    fn test_namespaces_do_not_collide() {
        let cache = ResearchCache::new(&CacheConfig::default());
        let url = "https://test.com";
        cache.set_content(url, &ExtractedContent::text_only(url, "page"));

        assert!(cache.get_search(url, 10).is_none());
        assert!(cache.get_content(url).is_some());
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = ResearchCache::with_ttl(10, Duration::from_millis(20));
        cache.set_search("query", 3, &sample_results());
        assert!(cache.get_search("query", 3).is_some());

        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get_search("query", 3).is_none());
        assert_eq!(cache.stats().total(), 0);
    }

    #[test]
    fn test_capacity_is_bounded() {
        let cache = ResearchCache::with_ttl(2, Duration::from_secs(60));
        cache.set_search("q1", 1, &[]);
        cache.set_search("q2", 1, &[]);
        cache.set_search("q3", 1, &[]);

        let stats = cache.stats();
        assert_eq!(stats.total(), 2);
        assert_eq!(stats.capacity, 2);
        assert!(cache.get_search("q1", 1).is_none());
        assert!(cache.get_search("q3", 1).is_some());
    }

    #[test]
    fn test_purge_expired() {
        let cache = ResearchCache::with_ttl(10, Duration::from_millis(10));
        cache.set_search("q1", 1, &[]);
        cache.set_content("https://a.com", &ExtractedContent::default());
        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(cache.stats().expired_entries, 2);
        cache.purge_expired();
        assert_eq!(cache.stats().total(), 0);
    }

    #[test]
    fn test_cache_disabled() {
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        let cache = ResearchCache::new(&config);
        cache.set_search("test_key", 10, &sample_results());
        assert!(cache.get_search("test_key", 10).is_none());
    }

    #[test]
    fn test_clear() {
        let cache = ResearchCache::new(&CacheConfig::default());
        cache.set_search("q", 1, &[]);
        cache.clear();
        assert_eq!(cache.stats().total(), 0);
    }
}
