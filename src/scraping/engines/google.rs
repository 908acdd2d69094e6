//! Google Custom Search API implementation.
//!
//! Uses the Google Custom Search JSON API.
//! Requires an API key and Custom Search Engine ID from Google Cloud Console.

use async_trait::async_trait;
use serde::Deserialize;

use crate::scraping::config::MarketLocale;
use crate::scraping::error::ScrapingError;
use crate::scraping::types::{SearchResult, SearchSource};

use super::SearchBackend;

/// Google Custom Search API base URL.
const GOOGLE_API_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// Google caps `num` at 10.
const GOOGLE_MAX_RESULTS: usize = 10;

/// Google Custom Search backend restricted to one market locale and the
/// last twelve months.
pub struct GoogleSearchBackend {
    client: reqwest::Client,
    api_key: String,
    cx: String,
    locale: MarketLocale,
}

impl GoogleSearchBackend {
    /// Create a new Google backend.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        api_key: impl Into<String>,
        cx: impl Into<String>,
        locale: MarketLocale,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            cx: cx.into(),
            locale,
        }
    }

    /// Build the API URL with query parameters.
    fn build_url(&self, query: &str, max_results: usize) -> Result<String, ScrapingError> {
        let mut url = url::Url::parse(GOOGLE_API_URL)?;

        url.query_pairs_mut()
            .append_pair("key", &self.api_key)
            .append_pair("cx", &self.cx)
            .append_pair("q", query)
            .append_pair("num", &max_results.min(GOOGLE_MAX_RESULTS).to_string())
            .append_pair("lr", &format!("lang_{}", self.locale.language))
            .append_pair("gl", &self.locale.country_code)
            .append_pair("safe", "medium")
            .append_pair("dateRestrict", "y1");

        Ok(url.to_string())
    }
}

#[async_trait]
impl SearchBackend for GoogleSearchBackend {
    async fn query(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, ScrapingError> {
        let url = self.build_url(query, max_results)?;

        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ScrapingError::RateLimited(60));
        }

        if response.status() == reqwest::StatusCode::FORBIDDEN {
            return Err(ScrapingError::AccessDenied(
                "Google API quota exceeded or invalid key".to_string(),
            ));
        }

        if !response.status().is_success() {
            return Err(ScrapingError::Status {
                service: "Google",
                status: response.status().as_u16(),
            });
        }

        let body: GoogleResponse = response.json().await?;
        let results = parse_response(body, max_results);
        tracing::info!(count = results.len(), "Google Search returned results");
        Ok(results)
    }

    fn name(&self) -> &'static str {
        SearchSource::Google.name()
    }

    fn max_results_per_request(&self) -> usize {
        GOOGLE_MAX_RESULTS
    }
}

/// Parse the Google API response.
fn parse_response(response: GoogleResponse, max_results: usize) -> Vec<SearchResult> {
    response
        .items
        .unwrap_or_default()
        .into_iter()
        .filter(|item| !item.link.is_empty())
        .take(max_results)
        .map(|item| {
            SearchResult::new(
                item.title,
                item.link,
                item.snippet.unwrap_or_default(),
                SearchSource::Google,
            )
        })
        .collect()
}

// Google API response structures

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    items: Option<Vec<GoogleItem>>,
}

#[derive(Debug, Deserialize)]
struct GoogleItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    snippet: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> GoogleSearchBackend {
        GoogleSearchBackend::new(
            reqwest::Client::new(),
            "test-key",
            "test-cx",
            MarketLocale::default(),
        )
    }

    #[test]
    fn test_build_url() {
        let url = backend().build_url("rust programming", 25).ok();
        let url = url.as_deref().unwrap_or_default();
        assert!(url.contains("key=test-key"));
        assert!(url.contains("cx=test-cx"));
        assert!(url.contains("q=rust+programming") || url.contains("q=rust%20programming"));
        assert!(url.contains("num=10"));
        assert!(url.contains("lr=lang_pt"));
        assert!(url.contains("gl=br"));
        assert!(url.contains("dateRestrict=y1"));
    }

    #[test]
    fn test_parse_response() {
        let body: GoogleResponse = serde_json::from_str(
            r#"{"items":[
                {"title":"One","link":"https://one.com","snippet":"first"},
                {"title":"No link","link":""},
                {"title":"Two","link":"https://two.com"}
            ]}"#,
        )
        .unwrap_or(GoogleResponse { items: None });

        let results = parse_response(body, 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].snippet, "first");
        assert_eq!(results[1].snippet, "");
        assert_eq!(results[1].source, SearchSource::Google);
    }

    #[test]
    fn test_parse_response_without_items() {
        let body: GoogleResponse =
            serde_json::from_str("{}").unwrap_or(GoogleResponse { items: None });
        assert!(parse_response(body, 10).is_empty());
    }
}
