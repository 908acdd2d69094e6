//! Search provider: query enhancement and the backend fallback chain.

use std::sync::Arc;
use std::time::Duration;

use chrono::Datelike;

use crate::research::types::ContextBag;
use crate::scraping::cache::ResearchCache;
use crate::scraping::config::MarketLocale;
use crate::scraping::engines::SearchBackend;
use crate::scraping::error::ScrapingError;
use crate::scraping::types::{SearchResult, SearchSource};

/// Generic market phrases appended to short queries, after the demonym
/// phrase.
const SHORT_QUERY_TERMS: &[&str] = &["market analysis"];

/// Searches through an ordered list of backends.
///
/// The first backend returning a non-empty list wins. Failures, timeouts
/// and empty lists move on to the next backend; when none succeeds a fixed
/// set of placeholder results is returned instead of an error.
pub struct SearchProvider {
    backends: Vec<Arc<dyn SearchBackend>>,
    cache: Arc<ResearchCache>,
    locale: MarketLocale,
    timeout: Duration,
}

impl SearchProvider {
    /// Create a provider over `backends`, tried in order.
    #[must_use]
    pub fn new(
        backends: Vec<Arc<dyn SearchBackend>>,
        cache: Arc<ResearchCache>,
        locale: MarketLocale,
        timeout: Duration,
    ) -> Self {
        Self {
            backends,
            cache,
            locale,
            timeout,
        }
    }

    /// Market locale used for query enhancement.
    #[must_use]
    pub const fn locale(&self) -> &MarketLocale {
        &self.locale
    }

    /// Names of the configured backends, in fallback order.
    #[must_use]
    pub fn backend_names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Search for `query`, never failing.
    ///
    /// The context is part of the contract for future biasing; enhancement
    /// currently depends on the query and locale only.
    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
        _context: &ContextBag,
    ) -> Vec<SearchResult> {
        if max_results == 0 {
            return Vec::new();
        }

        if let Some(cached) = self.cache.get_search(query, max_results) {
            tracing::debug!(query, "Cache hit for search");
            return cached;
        }

        let enhanced = enhance_query(query, &self.locale, chrono::Local::now().year());
        tracing::debug!(query, enhanced = %enhanced, "Enhanced search query");

        for backend in &self.backends {
            match self.query_backend(backend.as_ref(), &enhanced, max_results).await {
                Ok(results) if !results.is_empty() => {
                    tracing::info!(
                        query,
                        provider = backend.name(),
                        count = results.len(),
                        "Search succeeded"
                    );
                    self.cache.set_search(query, max_results, &results);
                    return results;
                }
                Ok(_) => {
                    tracing::info!(query, provider = backend.name(), "Search returned no results");
                }
                Err(e) => {
                    tracing::warn!(query, provider = backend.name(), error = %e, "Search failed");
                }
            }
        }

        tracing::warn!(query, "All search backends failed, using placeholder results");
        placeholder_results(query, max_results, chrono::Local::now().year())
    }

    /// One bounded backend call with the result count capped to what the
    /// backend accepts.
    async fn query_backend(
        &self,
        backend: &dyn SearchBackend,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, ScrapingError> {
        let capped = max_results.min(backend.max_results_per_request());
        let mut results = tokio::time::timeout(self.timeout, backend.query(query, capped)).await??;
        results.truncate(capped);
        Ok(results)
    }
}

/// Add market qualifiers to a raw query.
///
/// Appends "market" when absent, the locale's country when neither the
/// country nor its demonym appears, `year` when neither it nor the next
/// year appears, and for queries under three words the phrases
/// "{demonym} market" and "market analysis".
#[must_use]
pub fn enhance_query(query: &str, locale: &MarketLocale, year: i32) -> String {
    let lower = query.to_lowercase();
    let mut terms: Vec<String> = Vec::new();

    if !lower.contains("market") {
        terms.push("market".to_string());
    }

    let country = locale.country_name.to_lowercase();
    let demonym = locale.demonym.to_lowercase();
    if !lower.contains(&country) && !lower.contains(&demonym) {
        terms.push(locale.country_name.clone());
    }

    if !lower.contains(&year.to_string()) && !lower.contains(&(year + 1).to_string()) {
        terms.push(year.to_string());
    }

    if query.split_whitespace().count() < 3 {
        terms.push(format!("{} market", locale.demonym));
        terms.extend(SHORT_QUERY_TERMS.iter().map(ToString::to_string));
    }

    let mut enhanced = query.trim().to_string();
    for term in terms {
        if !enhanced.is_empty() {
            enhanced.push(' ');
        }
        enhanced.push_str(&term);
    }
    enhanced
}

/// Generic results used when every backend failed.
#[must_use]
pub fn placeholder_results(query: &str, max_results: usize, year: i32) -> Vec<SearchResult> {
    [
        (
            format!("Market analysis: {query}"),
            "https://example.com/market-analysis",
            format!("Relevant information about {query} in the market."),
        ),
        (
            format!("{query} trends {year}"),
            "https://example.com/trends",
            format!("Main trends and opportunities in {query}."),
        ),
        (
            format!("Marketing strategies for {query}"),
            "https://example.com/marketing-strategies",
            format!("How to build effective strategies for {query}."),
        ),
    ]
    .into_iter()
    .take(max_results)
    .map(|(title, url, snippet)| SearchResult::new(title, url, snippet, SearchSource::Placeholder))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockBackend {
        name: &'static str,
        max: usize,
        fail: bool,
        results: Vec<SearchResult>,
        calls: AtomicUsize,
        last_max: AtomicUsize,
    }

    impl MockBackend {
        fn new(name: &'static str, fail: bool, urls: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                name,
                max: 10,
                fail,
                results: urls
                    .iter()
                    .map(|u| SearchResult::new(*u, *u, "", SearchSource::Google))
                    .collect(),
                calls: AtomicUsize::new(0),
                last_max: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SearchBackend for MockBackend {
        async fn query(
            &self,
            _query: &str,
            max_results: usize,
        ) -> Result<Vec<SearchResult>, ScrapingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.last_max.store(max_results, Ordering::SeqCst);
            if self.fail {
                return Err(ScrapingError::Status {
                    service: "mock",
                    status: 500,
                });
            }
            Ok(self.results.clone())
        }

        fn name(&self) -> &'static str {
            self.name
        }

        fn max_results_per_request(&self) -> usize {
            self.max
        }
    }

    fn provider(backends: Vec<Arc<MockBackend>>) -> SearchProvider {
        SearchProvider::new(
            backends
                .into_iter()
                .map(|b| b as Arc<dyn SearchBackend>)
                .collect(),
            Arc::new(ResearchCache::with_ttl(100, Duration::from_secs(60))),
            MarketLocale::default(),
            Duration::from_secs(1),
        )
    }

    #[test]
    fn test_enhance_short_query() {
        let enhanced = enhance_query("electric bikes", &MarketLocale::default(), 2026);
        assert_eq!(
            enhanced,
            "electric bikes market Brazil 2026 brazilian market market analysis"
        );
    }

    #[test]
    fn test_enhance_long_query_with_qualifiers() {
        let enhanced = enhance_query(
            "brazilian electric bikes market 2027",
            &MarketLocale::default(),
            2026,
        );
        assert_eq!(enhanced, "brazilian electric bikes market 2027");
    }

    #[test]
    fn test_placeholders_truncated() {
        let results = placeholder_results("bikes", 2, 2026);
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].title, "bikes trends 2026");
        assert!(results.iter().all(|r| r.source == SearchSource::Placeholder));
    }

    #[tokio::test]
    async fn test_falls_back_to_secondary() {
        let primary = MockBackend::new("primary", true, &["https://a.com"]);
        let secondary = MockBackend::new("secondary", false, &["https://b.com"]);
        let provider = provider(vec![primary.clone(), secondary.clone()]);

        let results = provider.search("bikes", 5, &ContextBag::default()).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://b.com");
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_primary_falls_back() {
        let primary = MockBackend::new("primary", false, &[]);
        let secondary = MockBackend::new("secondary", false, &["https://b.com"]);
        let provider = provider(vec![primary, secondary.clone()]);

        let results = provider.search("bikes", 5, &ContextBag::default()).await;
        assert_eq!(results[0].url, "https://b.com");
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_total_failure_returns_placeholders() {
        let provider = provider(vec![MockBackend::new("primary", true, &[])]);
        let results = provider.search("bikes", 10, &ContextBag::default()).await;
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.source == SearchSource::Placeholder));
    }

    #[tokio::test]
    async fn test_max_results_capped_to_backend_limit() {
        let primary = MockBackend::new("primary", false, &["https://a.com"]);
        let provider = provider(vec![primary.clone()]);

        let _ = provider.search("bikes", 50, &ContextBag::default()).await;
        assert_eq!(primary.last_max.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_results_cached_per_query() {
        let primary = MockBackend::new("primary", false, &["https://a.com"]);
        let provider = provider(vec![primary.clone()]);

        let first = provider.search("bikes", 5, &ContextBag::default()).await;
        let second = provider.search("bikes", 5, &ContextBag::default()).await;
        assert_eq!(first, second);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
    }
}
