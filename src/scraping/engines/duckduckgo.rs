//! DuckDuckGo search engine implementation.
//!
//! Uses DuckDuckGo HTML search (no API key required).

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::scraping::config::MarketLocale;
use crate::scraping::error::ScrapingError;
use crate::scraping::types::{SearchResult, SearchSource};

use super::{SearchBackend, extract_domain};

/// Base URL for DuckDuckGo HTML search.
const DDG_HTML_URL: &str = "https://html.duckduckgo.com/html/";

/// One HTML results page holds about 30 entries.
const DDG_MAX_RESULTS: usize = 30;

/// DuckDuckGo HTML backend.
pub struct DuckDuckGoBackend {
    client: reqwest::Client,
    locale: MarketLocale,
}

impl DuckDuckGoBackend {
    /// Create a new DuckDuckGo backend.
    #[must_use]
    pub fn new(client: reqwest::Client, locale: MarketLocale) -> Self {
        Self { client, locale }
    }

    /// Build form parameters for DuckDuckGo search.
    fn build_params(&self, query: &str) -> Vec<(&'static str, String)> {
        vec![
            ("q", query.to_string()),
            ("b", String::new()),
            ("kp", "-1".to_string()),
            ("df", "y".to_string()),
            (
                "kl",
                format!("{}-{}", self.locale.country_code, self.locale.language),
            ),
        ]
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGoBackend {
    async fn query(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, ScrapingError> {
        let params = self.build_params(query);

        let response = self
            .client
            .post(DDG_HTML_URL)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ScrapingError::Status {
                service: "DuckDuckGo",
                status: response.status().as_u16(),
            });
        }

        let html = response.text().await?;
        parse_results(&html, max_results)
    }

    fn name(&self) -> &'static str {
        SearchSource::DuckDuckGo.name()
    }

    fn max_results_per_request(&self) -> usize {
        DDG_MAX_RESULTS
    }
}

/// Parse DuckDuckGo HTML results.
fn parse_results(html: &str, max_results: usize) -> Result<Vec<SearchResult>, ScrapingError> {
    let document = Html::parse_document(html);

    let result_selector = selector(".result")?;
    let title_selector = selector(".result__a")?;
    let snippet_selector = selector(".result__snippet")?;

    let mut results = Vec::new();

    for element in document.select(&result_selector) {
        if results.len() >= max_results {
            break;
        }

        let Some(anchor) = element.select(&title_selector).next() else {
            continue;
        };

        let url = anchor
            .value()
            .attr("href")
            .map(extract_url_from_ddg_redirect)
            .unwrap_or_default();

        // Ads point back into duckduckgo.com
        if url.is_empty() || extract_domain(&url).is_some_and(|d| d.ends_with("duckduckgo.com")) {
            continue;
        }

        let mut title = anchor.text().collect::<String>().trim().to_string();
        if title.is_empty() {
            title = extract_domain(&url).unwrap_or_default();
        }

        let snippet = element
            .select(&snippet_selector)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        results.push(SearchResult::new(title, url, snippet, SearchSource::DuckDuckGo));
    }

    if results.is_empty() {
        tracing::warn!("No results found in DuckDuckGo HTML response");
    }

    Ok(results)
}

fn selector(css: &str) -> Result<Selector, ScrapingError> {
    Selector::parse(css).map_err(|e| ScrapingError::HtmlParse(format!("Invalid selector: {e:?}")))
}

/// Extract the actual URL from DuckDuckGo's redirect URL.
fn extract_url_from_ddg_redirect(href: &str) -> String {
    // DuckDuckGo uses redirect URLs like:
    // //duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com&rut=...
    if let Some(uddg_start) = href.find("uddg=") {
        let start = uddg_start + 5;
        let end = href[start..].find('&').map_or(href.len(), |i| start + i);
        let encoded = &href[start..end];
        urlencoding::decode(encoded)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| encoded.to_string())
    } else if href.starts_with("http") {
        href.to_string()
    } else if href.starts_with("//") {
        format!("https:{href}")
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_params() {
        let backend = DuckDuckGoBackend::new(reqwest::Client::new(), MarketLocale::default());
        let params = backend.build_params("electric bikes");

        assert!(params.iter().any(|(k, v)| *k == "q" && v == "electric bikes"));
        assert!(params.iter().any(|(k, v)| *k == "kl" && v == "br-pt"));
    }

    #[test]
    fn test_extract_url_from_ddg_redirect() {
        let redirect = "//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fpage&rut=123";
        assert_eq!(extract_url_from_ddg_redirect(redirect), "https://example.com/page");
        assert_eq!(
            extract_url_from_ddg_redirect("https://direct.com/a"),
            "https://direct.com/a"
        );
        assert_eq!(extract_url_from_ddg_redirect("/relative"), "");
    }

    #[test]
    fn test_parse_results() {
        let html = r#"
            <div class="result">
                <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fbikes.com%2Fmarket&rut=1">Bike market</a>
                <a class="result__snippet">Electric bikes market growth</a>
            </div>
            <div class="result">
                <a class="result__a" href="https://duckduckgo.com/y.js?ad=1">Sponsored</a>
            </div>
            <div class="result">
                <a class="result__a" href="https://second.com/">Second</a>
            </div>
        "#;

        let results = parse_results(html, 10).unwrap_or_default();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://bikes.com/market");
        assert_eq!(results[0].snippet, "Electric bikes market growth");
        assert_eq!(results[1].title, "Second");
        assert_eq!(results[1].source, SearchSource::DuckDuckGo);
    }

    #[test]
    fn test_parse_results_respects_max() {
        let html = r#"
            <div class="result"><a class="result__a" href="https://a.com">A</a></div>
            <div class="result"><a class="result__a" href="https://b.com">B</a></div>
        "#;
        assert_eq!(parse_results(html, 1).unwrap_or_default().len(), 1);
    }
}
