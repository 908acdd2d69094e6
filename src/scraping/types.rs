//! Core types for search results and extracted pages.

use serde::{Deserialize, Serialize};

/// Backend that produced a search result.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchSource {
    /// Google Custom Search.
    Google,
    /// Brave Search API.
    Brave,
    /// DuckDuckGo HTML search.
    DuckDuckGo,
    /// Generic result synthesized when every backend failed.
    Placeholder,
}

impl SearchSource {
    /// Display name of the source.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Google => "Google",
            Self::Brave => "Brave Search",
            Self::DuckDuckGo => "DuckDuckGo",
            Self::Placeholder => "placeholder",
        }
    }
}

/// A single search result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Title of the result.
    pub title: String,
    /// URL of the result.
    pub url: String,
    /// Description or snippet.
    pub snippet: String,
    /// Backend that returned the result.
    pub source: SearchSource,
}

impl SearchResult {
    /// Create a new search result.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        snippet: impl Into<String>,
        source: SearchSource,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
            source,
        }
    }
}

/// Cleaned content of a fetched page.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedContent {
    /// URL the content was fetched from.
    pub url: String,
    /// Page title, when the backend exposes one.
    pub title: Option<String>,
    /// Plain text, whitespace-normalized and length-capped.
    pub text: String,
    /// Absolute same-origin links discovered on the page.
    pub links: Vec<String>,
}

impl ExtractedContent {
    /// Content with no title and no links.
    #[must_use]
    pub fn text_only(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            text: text.into(),
            links: Vec::new(),
        }
    }

    /// Attach discovered links.
    #[must_use]
    pub fn with_links(mut self, links: Vec<String>) -> Self {
        self.links = links;
        self
    }

    /// Attach a title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Truncate `text` to at most `max_chars` characters, appending `marker`
/// when anything was cut.
#[must_use]
pub fn truncate_with_marker(text: &str, max_chars: usize, marker: &str) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((byte_idx, _)) => {
            let mut out = String::with_capacity(byte_idx + marker.len());
            out.push_str(&text[..byte_idx]);
            out.push_str(marker);
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_with_marker_short_text_untouched() {
        assert_eq!(truncate_with_marker("short", 10, "..."), "short");
        assert_eq!(truncate_with_marker("exactly10!", 10, "..."), "exactly10!");
    }

    #[test]
    fn test_truncate_with_marker_cuts_on_char_boundary() {
        let text = "análise de mercado";
        let out = truncate_with_marker(text, 3, "[cut]");
        assert_eq!(out, "aná[cut]");
    }

    #[test]
    fn test_extracted_content_builders() {
        let content = ExtractedContent::text_only("https://a.com", "body")
            .with_title("A")
            .with_links(vec!["https://a.com/x".to_string()]);
        assert_eq!(content.title.as_deref(), Some("A"));
        assert_eq!(content.links.len(), 1);
    }

    #[test]
    fn test_source_names() {
        assert_eq!(SearchSource::Google.name(), "Google");
        assert_eq!(SearchSource::Placeholder.name(), "placeholder");
    }
}
