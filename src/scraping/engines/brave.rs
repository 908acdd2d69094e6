//! Brave Search API implementation.
//!
//! Uses the Brave Search API for high-quality results.
//! Requires an API key from https://brave.com/search/api/

use async_trait::async_trait;
use serde::Deserialize;

use crate::scraping::config::MarketLocale;
use crate::scraping::error::ScrapingError;
use crate::scraping::types::{SearchResult, SearchSource};

use super::SearchBackend;

/// Brave Search API base URL.
const BRAVE_API_URL: &str = "https://api.search.brave.com/res/v1/web/search";

/// Brave caps `count` at 20.
const BRAVE_MAX_RESULTS: usize = 20;

/// Brave Search backend.
pub struct BraveSearchBackend {
    client: reqwest::Client,
    api_key: String,
    locale: MarketLocale,
}

impl BraveSearchBackend {
    /// Create a new Brave backend.
    #[must_use]
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, locale: MarketLocale) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            locale,
        }
    }

    /// Build the API URL with query parameters.
    fn build_url(&self, query: &str, max_results: usize) -> Result<String, ScrapingError> {
        let mut url = url::Url::parse(BRAVE_API_URL)?;

        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("count", &max_results.min(BRAVE_MAX_RESULTS).to_string())
            .append_pair("safesearch", "moderate")
            .append_pair("freshness", "py")
            .append_pair("country", &self.locale.country_code)
            .append_pair("search_lang", &self.locale.language);

        Ok(url.to_string())
    }
}

#[async_trait]
impl SearchBackend for BraveSearchBackend {
    async fn query(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, ScrapingError> {
        let url = self.build_url(query, max_results)?;

        let response = self
            .client
            .get(&url)
            .header("X-Subscription-Token", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ScrapingError::RateLimited(60));
        }

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ScrapingError::AccessDenied("Invalid Brave API key".to_string()));
        }

        if !response.status().is_success() {
            return Err(ScrapingError::Status {
                service: "Brave Search",
                status: response.status().as_u16(),
            });
        }

        let body: BraveResponse = response.json().await?;
        Ok(parse_response(body, max_results))
    }

    fn name(&self) -> &'static str {
        SearchSource::Brave.name()
    }

    fn max_results_per_request(&self) -> usize {
        BRAVE_MAX_RESULTS
    }
}

/// Parse the Brave API response.
fn parse_response(response: BraveResponse, max_results: usize) -> Vec<SearchResult> {
    response
        .web
        .map(|web| web.results)
        .unwrap_or_default()
        .into_iter()
        .take(max_results)
        .map(|result| {
            SearchResult::new(
                result.title,
                result.url,
                result.description.unwrap_or_default(),
                SearchSource::Brave,
            )
        })
        .collect()
}

// Brave API response structures

#[derive(Debug, Deserialize)]
struct BraveResponse {
    web: Option<WebResults>,
}

#[derive(Debug, Deserialize)]
struct WebResults {
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    title: String,
    url: String,
    description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url() {
        let backend = BraveSearchBackend::new(
            reqwest::Client::new(),
            "key",
            MarketLocale::default(),
        );
        let url = backend.build_url("rust programming", 50).ok();
        let url = url.as_deref().unwrap_or_default();
        assert!(url.contains("q=rust+programming") || url.contains("q=rust%20programming"));
        assert!(url.contains("count=20"));
        assert!(url.contains("safesearch=moderate"));
        assert!(url.contains("country=br"));
    }

    #[test]
    fn test_parse_response_caps_results() {
        let body: BraveResponse = serde_json::from_str(
            r#"{"web":{"results":[
                {"title":"A","url":"https://a.com","description":"alpha"},
                {"title":"B","url":"https://b.com"},
                {"title":"C","url":"https://c.com"}
            ]}}"#,
        )
        .unwrap_or(BraveResponse { web: None });

        let results = parse_response(body, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].snippet, "alpha");
        assert_eq!(results[1].source, SearchSource::Brave);
    }
}
