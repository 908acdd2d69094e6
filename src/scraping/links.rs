//! Same-origin link discovery for depth crawling.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

/// Markdown links: `[text](target)`.
static MARKDOWN_LINK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\]\(\s*([^)\s]+)").ok());

/// Bare absolute URLs in plain text.
static BARE_URL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"'\)\]]+"#).ok());

/// File extensions that never lead to readable text.
const ASSET_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp", ".ico", ".css", ".js", ".pdf", ".zip",
    ".mp4", ".mp3", ".xml",
];

/// Collect the same-origin links of a page.
///
/// `body` may be HTML (anchors are read) or plain/markdown text (markdown
/// links and bare URLs are read). Relative targets resolve against
/// `base_url`. Fragment-only links, self-links, other origins and static
/// assets are dropped; order of first appearance is kept. An unparsable
/// base yields an empty list.
#[must_use]
pub fn extract_internal_links(base_url: &str, body: &str) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        tracing::debug!(base_url, "Cannot expand links of an invalid base URL");
        return Vec::new();
    };
    let base_key = without_fragment(&base);

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for href in candidate_hrefs(body) {
        let Some(url) = resolve(&href, &base) else {
            continue;
        };
        if url.origin() != base.origin() || is_asset(&url) {
            continue;
        }
        let key = without_fragment(&url);
        if key == base_key {
            continue;
        }
        if seen.insert(key.clone()) {
            links.push(key);
        }
    }

    tracing::debug!(base_url, count = links.len(), "Internal links found");
    links
}

/// Raw href values found in `body`. Anchors win when the body is HTML;
/// otherwise markdown links and bare URLs are read.
fn candidate_hrefs(body: &str) -> Vec<String> {
    if body.contains("<a") || body.contains("<A") {
        let document = Html::parse_document(body);
        if let Ok(selector) = Selector::parse("a[href]") {
            let anchors: Vec<String> = document
                .select(&selector)
                .filter_map(|a| a.value().attr("href"))
                .map(|h| h.trim().to_string())
                .collect();
            if !anchors.is_empty() {
                return anchors;
            }
        }
    }

    let mut hrefs = Vec::new();
    if let Some(re) = MARKDOWN_LINK.as_ref() {
        hrefs.extend(re.captures_iter(body).map(|c| c[1].to_string()));
    }
    if let Some(re) = BARE_URL.as_ref() {
        hrefs.extend(
            re.find_iter(body)
                .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':']).to_string()),
        );
    }
    hrefs
}

/// Resolve a potentially relative href against the base URL.
fn resolve(href: &str, base: &Url) -> Option<Url> {
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
    {
        return None;
    }

    let url = base.join(href).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// Canonical form of a URL used to tell pages apart: parsed, fragment
/// dropped and re-serialized, so `https://a.com` and `https://a.com/#top`
/// share one key. Unparsable input is only trimmed.
#[must_use]
pub fn normalize_url(url: &str) -> String {
    Url::parse(url.trim()).map_or_else(|_| url.trim().to_string(), |u| without_fragment(&u))
}

fn without_fragment(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

fn is_asset(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    ASSET_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
