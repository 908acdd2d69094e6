//! Web search and page extraction for market research.
//!
//! This module provides the network-facing side of the research pipeline:
//! - Search backends (Google Custom Search, Brave, DuckDuckGo) behind a fallback chain
//! - Page content extraction (Jina Reader, plain HTML fetch)
//! - Same-origin link discovery for depth crawling
//! - Caching with TTL and a bounded entry count

pub mod cache;
pub mod config;
pub mod content;
pub mod engines;
pub mod error;
pub mod links;
pub mod search;
pub mod types;

pub use cache::{CacheStats, ResearchCache};
pub use config::{ApiKeys, CacheConfig, MarketLocale, ScrapingConfig};
pub use content::{ContentExtractor, ExtractBackend, HtmlFetchBackend, JinaReaderBackend};
pub use engines::SearchBackend;
pub use error::ScrapingError;
pub use links::{extract_internal_links, normalize_url};
pub use search::SearchProvider;
pub use types::{ExtractedContent, SearchResult, SearchSource};

use std::sync::Arc;

use engines::{BraveSearchBackend, DuckDuckGoBackend, GoogleSearchBackend};

/// Owns the shared HTTP client and cache and wires the search provider
/// and content extractor from a [`ScrapingConfig`].
pub struct ScrapingService {
    config: ScrapingConfig,
    cache: Arc<ResearchCache>,
    search: Arc<SearchProvider>,
    extractor: Arc<ContentExtractor>,
}

impl ScrapingService {
    /// Create a new scraping service with the given configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: ScrapingConfig) -> Result<Self, ScrapingError> {
        let client = Self::build_client(&config)?;
        let cache = Arc::new(ResearchCache::new(&config.cache_config));

        let search = Arc::new(SearchProvider::new(
            Self::search_backends(&client, &config),
            Arc::clone(&cache),
            config.locale.clone(),
            config.search_timeout,
        ));
        let extractor = Arc::new(ContentExtractor::new(
            Self::extract_backends(&client, &config),
            Arc::clone(&cache),
            config.extract_timeout,
        ));

        tracing::info!(
            search_backends = ?search.backend_names(),
            reader = config.api_keys.jina.is_some(),
            "Scraping service ready"
        );

        Ok(Self {
            config,
            cache,
            search,
            extractor,
        })
    }

    /// Create a new scraping service with default configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_defaults() -> Result<Self, ScrapingError> {
        Self::new(ScrapingConfig::default())
    }

    /// Search backends in fallback order. Keyed backends are only added
    /// when their keys are present; DuckDuckGo is always last.
    fn search_backends(
        client: &reqwest::Client,
        config: &ScrapingConfig,
    ) -> Vec<Arc<dyn SearchBackend>> {
        let keys = &config.api_keys;
        let mut backends: Vec<Arc<dyn SearchBackend>> = Vec::new();

        if let (Some(key), Some(cx)) = (&keys.google_api_key, &keys.google_cx) {
            backends.push(Arc::new(GoogleSearchBackend::new(
                client.clone(),
                key.clone(),
                cx.clone(),
                config.locale.clone(),
            )));
        }
        if let Some(key) = &keys.brave {
            backends.push(Arc::new(BraveSearchBackend::new(
                client.clone(),
                key.clone(),
                config.locale.clone(),
            )));
        }
        backends.push(Arc::new(DuckDuckGoBackend::new(
            client.clone(),
            config.locale.clone(),
        )));

        backends
    }

    /// Extraction backends: the reader API when keyed, then plain fetch.
    fn extract_backends(
        client: &reqwest::Client,
        config: &ScrapingConfig,
    ) -> Vec<Arc<dyn ExtractBackend>> {
        let mut backends: Vec<Arc<dyn ExtractBackend>> = Vec::new();

        if let Some(key) = &config.api_keys.jina {
            backends.push(Arc::new(JinaReaderBackend::new(
                client.clone(),
                key.clone(),
                config.reader_content_cap,
            )));
        }
        backends.push(Arc::new(HtmlFetchBackend::new(
            client.clone(),
            config.basic_content_cap,
            config.max_content_length,
        )));

        backends
    }

    /// Build an HTTP client with appropriate headers and settings.
    fn build_client(config: &ScrapingConfig) -> Result<reqwest::Client, ScrapingError> {
        use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};

        let mut headers = HeaderMap::new();

        // Rotate user agents to avoid detection
        let ua = config.random_user_agent();
        if let Ok(ua_value) = HeaderValue::from_str(&ua) {
            headers.insert(USER_AGENT, ua_value);
        }

        if let Ok(accept) = HeaderValue::from_str(
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ) {
            headers.insert(ACCEPT, accept);
        }

        let language = format!(
            "{lang}-{region},{lang};q=0.9,en-US;q=0.8,en;q=0.7",
            lang = config.locale.language,
            region = config.locale.country_code.to_uppercase(),
        );
        if let Ok(lang) = HeaderValue::from_str(&language) {
            headers.insert(ACCEPT_LANGUAGE, lang);
        }

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| ScrapingError::HttpClient(e.to_string()))
    }

    /// Shared search provider.
    #[must_use]
    pub fn search_provider(&self) -> Arc<SearchProvider> {
        Arc::clone(&self.search)
    }

    /// Shared content extractor.
    #[must_use]
    pub fn content_extractor(&self) -> Arc<ContentExtractor> {
        Arc::clone(&self.extractor)
    }

    /// Shared cache.
    #[must_use]
    pub fn cache(&self) -> Arc<ResearchCache> {
        Arc::clone(&self.cache)
    }

    /// Configuration the service was built from.
    #[must_use]
    pub const fn config(&self) -> &ScrapingConfig {
        &self.config
    }

    /// Drop expired cache entries and report what is left.
    pub fn sweep_cache(&self) -> CacheStats {
        self.cache.purge_expired();
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_creation() {
        let service = ScrapingService::with_defaults();
        assert!(service.is_ok());
    }

    #[test]
    fn test_default_chain_is_duckduckgo_only() {
        let Ok(service) = ScrapingService::with_defaults() else {
            return;
        };
        assert_eq!(service.search_provider().backend_names(), vec!["DuckDuckGo"]);
    }

    #[test]
    fn test_keyed_backends_ordered_before_duckduckgo() {
        let config = ScrapingConfig::default()
            .with_google_api("key", "cx")
            .with_brave_api_key("brave");
        let Ok(service) = ScrapingService::new(config) else {
            return;
        };
        assert_eq!(
            service.search_provider().backend_names(),
            vec!["Google", "Brave Search", "DuckDuckGo"]
        );
    }
}
