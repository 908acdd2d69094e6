//! Page content extraction.
//!
//! Two backends are tried in order: the Jina Reader API when a key is
//! configured, then a plain fetch of the page whose HTML is stripped down
//! to visible text. [`ContentExtractor`] wraps them with URL validation,
//! per-call timeouts and the shared cache.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Node, Selector};
use url::Url;

use crate::scraping::cache::ResearchCache;
use crate::scraping::error::ScrapingError;
use crate::scraping::links::extract_internal_links;
use crate::scraping::types::{ExtractedContent, truncate_with_marker};

/// Marker appended to truncated page text.
pub const TRUNCATION_MARKER: &str = "... [content truncated]";

/// Jina Reader endpoint; the target URL is appended to it.
const JINA_READER_URL: &str = "https://r.jina.ai/";

/// Elements whose text never counts as page content.
const STRIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "form", "aside", "noscript", "head",
];

static MD_IMAGE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").ok());
static MD_LINK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").ok());
static MD_LINE_MARKER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)^\s{0,3}(?:#{1,6}|>|[-*+]|\d+\.)\s+").ok());
static MD_EMPHASIS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[*_`]{1,3}").ok());

/// A content extraction backend.
#[async_trait]
pub trait ExtractBackend: Send + Sync {
    /// Fetch `url` and return its cleaned, capped text.
    async fn fetch(&self, url: &str) -> Result<ExtractedContent, ScrapingError>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

/// High-fidelity extraction through the Jina Reader API.
pub struct JinaReaderBackend {
    client: reqwest::Client,
    api_key: String,
    max_chars: usize,
}

impl JinaReaderBackend {
    /// Create a new reader backend.
    #[must_use]
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, max_chars: usize) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            max_chars,
        }
    }
}

#[async_trait]
impl ExtractBackend for JinaReaderBackend {
    async fn fetch(&self, url: &str) -> Result<ExtractedContent, ScrapingError> {
        let response = self
            .client
            .get(format!("{JINA_READER_URL}{url}"))
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "text/plain")
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ScrapingError::RateLimited(60));
        }
        if !response.status().is_success() {
            return Err(ScrapingError::Status {
                service: "Jina Reader",
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        let content = parse_reader_output(url, &body, self.max_chars)?;
        tracing::info!(url, chars = content.text.chars().count(), "Content extracted with Jina Reader");
        Ok(content)
    }

    fn name(&self) -> &'static str {
        "Jina Reader"
    }
}

/// Basic extraction: download the page and strip it to visible text.
pub struct HtmlFetchBackend {
    client: reqwest::Client,
    max_chars: usize,
    max_content_length: usize,
}

impl HtmlFetchBackend {
    /// Create a new fetch-and-strip backend.
    #[must_use]
    pub fn new(client: reqwest::Client, max_chars: usize, max_content_length: usize) -> Self {
        Self {
            client,
            max_chars,
            max_content_length,
        }
    }
}

#[async_trait]
impl ExtractBackend for HtmlFetchBackend {
    async fn fetch(&self, url: &str) -> Result<ExtractedContent, ScrapingError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(ScrapingError::Status {
                service: "page",
                status: response.status().as_u16(),
            });
        }

        if let Some(len) = response.content_length() {
            if exceeds_length(len, self.max_content_length) {
                return Err(ScrapingError::ExtractionFailed(format!(
                    "Content too large: {len} bytes"
                )));
            }
        }

        // Get final URL after redirects
        let final_url = response.url().to_string();

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_string();

        if !content_type.contains("text/html") && !content_type.contains("text/plain") {
            return Err(ScrapingError::UnsupportedContentType(content_type));
        }

        let html = response.text().await?;
        let content = parse_html_page(url, &final_url, &html, self.max_chars)?;
        tracing::info!(url, chars = content.text.chars().count(), "Content extracted from HTML");
        Ok(content)
    }

    fn name(&self) -> &'static str {
        "HTML fetch"
    }
}

/// Validating, caching facade over the extraction backends.
pub struct ContentExtractor {
    backends: Vec<Arc<dyn ExtractBackend>>,
    cache: Arc<ResearchCache>,
    timeout: Duration,
}

impl ContentExtractor {
    /// Create an extractor trying `backends` in order.
    #[must_use]
    pub fn new(
        backends: Vec<Arc<dyn ExtractBackend>>,
        cache: Arc<ResearchCache>,
        timeout: Duration,
    ) -> Self {
        Self {
            backends,
            cache,
            timeout,
        }
    }

    /// Extract a page, returning `None` on any failure.
    pub async fn extract(&self, url: &str) -> Option<ExtractedContent> {
        match self.try_extract(url).await {
            Ok(content) => Some(content),
            Err(ScrapingError::UnsupportedScheme(scheme)) => {
                tracing::debug!(url, scheme, "Skipping non-HTTP URL");
                None
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "Content extraction failed");
                None
            }
        }
    }

    /// Extract a page, reporting the last backend error on failure.
    ///
    /// Non-HTTP(S) URLs fail before any network call. Backends are tried in
    /// order, each bounded by the configured timeout; the first non-empty
    /// text wins and is cached.
    pub async fn try_extract(&self, url: &str) -> Result<ExtractedContent, ScrapingError> {
        let parsed = Url::parse(url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ScrapingError::UnsupportedScheme(parsed.scheme().to_string()));
        }

        if let Some(cached) = self.cache.get_content(url) {
            tracing::debug!(url, "Cache hit for content");
            return Ok(cached);
        }

        let mut last_error =
            ScrapingError::ExtractionFailed("no extraction backend configured".to_string());

        for backend in &self.backends {
            let outcome = tokio::time::timeout(self.timeout, backend.fetch(url))
                .await
                .map_err(ScrapingError::from)
                .and_then(|r| r);

            match outcome {
                Ok(content) if !content.text.trim().is_empty() => {
                    self.cache.set_content(url, &content);
                    return Ok(content);
                }
                Ok(_) => {
                    tracing::debug!(url, backend = backend.name(), "Backend returned empty text");
                    last_error = ScrapingError::ExtractionFailed("empty page".to_string());
                }
                Err(e) => {
                    tracing::debug!(url, backend = backend.name(), error = %e, "Backend failed");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

/// Declared body size above the limit. Sizes that do not fit `usize`
/// always exceed it.
fn exceeds_length(len: u64, max: usize) -> bool {
    usize::try_from(len).unwrap_or(usize::MAX) > max
}

/// Turn an HTML document into capped plain text plus same-origin links.
fn parse_html_page(
    url: &str,
    final_url: &str,
    html: &str,
    max_chars: usize,
) -> Result<ExtractedContent, ScrapingError> {
    let document = Html::parse_document(html);

    let text = clean_text(&visible_text(&document));
    if text.is_empty() {
        return Err(ScrapingError::ExtractionFailed("no visible text".to_string()));
    }

    let title = extract_title(&document);
    Ok(ExtractedContent {
        url: url.to_string(),
        title: (!title.is_empty()).then_some(title),
        text: truncate_with_marker(&text, max_chars, TRUNCATION_MARKER),
        links: extract_internal_links(final_url, html),
    })
}

/// Turn Jina Reader output (metadata header + markdown) into capped text.
fn parse_reader_output(
    url: &str,
    body: &str,
    max_chars: usize,
) -> Result<ExtractedContent, ScrapingError> {
    let mut title = None;
    let mut markdown = String::with_capacity(body.len());

    for line in body.lines() {
        if let Some(t) = line.strip_prefix("Title:") {
            title = Some(t.trim().to_string()).filter(|t| !t.is_empty());
        } else if line.starts_with("URL Source:")
            || line.starts_with("Published Time:")
            || line.starts_with("Markdown Content:")
        {
            continue;
        } else {
            markdown.push_str(line);
            markdown.push('\n');
        }
    }

    let links = extract_internal_links(url, &markdown);
    let text = clean_text(&strip_markdown(&markdown));
    if text.is_empty() {
        return Err(ScrapingError::ExtractionFailed("reader returned no text".to_string()));
    }

    Ok(ExtractedContent {
        url: url.to_string(),
        title,
        text: truncate_with_marker(&text, max_chars, TRUNCATION_MARKER),
        links,
    })
}

/// Text of every node outside [`STRIPPED_ELEMENTS`].
fn visible_text(document: &Html) -> String {
    let mut text = String::new();

    for node in document.tree.root().descendants() {
        let Node::Text(chunk) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|e| STRIPPED_ELEMENTS.contains(&e.name()))
        });
        if hidden {
            continue;
        }

        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(trimmed);
        }
    }

    text
}

/// Remove markdown syntax, keeping link and heading text.
fn strip_markdown(markdown: &str) -> String {
    let mut text = markdown.to_string();
    for (re, replacement) in [
        (&*MD_IMAGE, ""),
        (&*MD_LINK, "$1"),
        (&*MD_LINE_MARKER, ""),
        (&*MD_EMPHASIS, ""),
    ] {
        if let Some(re) = re {
            text = re.replace_all(&text, replacement).into_owned();
        }
    }
    text
}

/// Extract page title.
fn extract_title(document: &Html) -> String {
    if let Some(og_title) = extract_meta(document, "og:title") {
        return og_title;
    }

    for tag in ["title", "h1"] {
        if let Ok(selector) = Selector::parse(tag) {
            if let Some(element) = document.select(&selector).next() {
                let title = clean_text(&element.text().collect::<String>());
                if !title.is_empty() {
                    return title;
                }
            }
        }
    }

    String::new()
}

/// Extract meta tag content by `name` or `property`.
fn extract_meta(document: &Html, name: &str) -> Option<String> {
    ["name", "property"].iter().find_map(|attr| {
        let selector = Selector::parse(&format!("meta[{attr}='{name}']")).ok()?;
        let element = document.select(&selector).next()?;
        let content = element.value().attr("content")?.trim();
        (!content.is_empty()).then(|| content.to_string())
    })
}

/// Collapse all whitespace runs to single spaces.
fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
