//! Search engine implementations.

pub mod brave;
pub mod duckduckgo;
pub mod google;

use async_trait::async_trait;

use crate::scraping::error::ScrapingError;
use crate::scraping::types::SearchResult;

pub use brave::BraveSearchBackend;
pub use duckduckgo::DuckDuckGoBackend;
pub use google::GoogleSearchBackend;

/// A raw search backend.
///
/// Backends return errors freely; [`crate::scraping::SearchProvider`]
/// decides how to fall back.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Query the backend for at most `max_results` results.
    async fn query(&self, query: &str, max_results: usize)
    -> Result<Vec<SearchResult>, ScrapingError>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Largest result count a single request may ask for.
    fn max_results_per_request(&self) -> usize {
        10
    }
}

/// Extract the host from a URL.
pub(crate) fn extract_domain(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            extract_domain("https://www.example.com/page"),
            Some("www.example.com".to_string())
        );
        assert_eq!(extract_domain("invalid"), None);
    }
}
