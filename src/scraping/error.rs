//! Error types for the scraping module.

use thiserror::Error;

/// Errors that can occur while searching or extracting page content.
///
/// None of these ever reach the caller of the research pipeline; the
/// facades log them and degrade to placeholder or absent values.
#[derive(Debug, Error)]
pub enum ScrapingError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// HTTP client configuration error.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// Upstream answered with a non-success status.
    #[error("{service} returned status: {status}")]
    Status {
        /// Name of the upstream service.
        service: &'static str,
        /// HTTP status code.
        status: u16,
    },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// URL scheme other than http or https.
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// HTML parsing error.
    #[error("HTML parsing error: {0}")]
    HtmlParse(String),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Content extraction produced nothing usable.
    #[error("Content extraction failed: {0}")]
    ExtractionFailed(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded, retry after {0} seconds")]
    RateLimited(u64),

    /// Access denied or blocked.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// Content type not supported.
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// API key required but not configured.
    #[error("API key required for {0}")]
    ApiKeyRequired(String),
}

impl ScrapingError {
    /// Whether the failure is a transient network condition rather than a
    /// permanent problem with the request or the payload.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::RateLimited(_) | Self::HttpRequest(_) | Self::Status { .. }
        )
    }
}

impl From<tokio::time::error::Elapsed> for ScrapingError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::Timeout
    }
}
