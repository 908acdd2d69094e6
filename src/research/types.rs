//! Core types for research requests and bundles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller-supplied hints used to bias search and scoring.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextBag {
    /// Business segment, e.g. "urban mobility".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    /// Product being researched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    /// Target audience.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
}

impl ContextBag {
    /// Empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the segment.
    #[must_use]
    pub fn with_segment(mut self, segment: impl Into<String>) -> Self {
        self.segment = Some(segment.into());
        self
    }

    /// Set the product.
    #[must_use]
    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }

    /// Set the audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Segment, when present and not blank.
    #[must_use]
    pub fn segment(&self) -> Option<&str> {
        non_blank(self.segment.as_deref())
    }

    /// Product, when present and not blank.
    #[must_use]
    pub fn product(&self) -> Option<&str> {
        non_blank(self.product.as_deref())
    }

    /// Audience, when present and not blank.
    #[must_use]
    pub fn audience(&self) -> Option<&str> {
        non_blank(self.audience.as_deref())
    }

    /// Every non-blank field, in segment, product, audience order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        [self.segment(), self.product(), self.audience()]
            .into_iter()
            .flatten()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// How a page entered the crawl.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// A result of the original query.
    Primary,
    /// A same-origin link followed from a fetched page.
    InternalLink,
    /// A result of a derived related query.
    RelatedQuery,
}

/// A fetched and scored page.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchedPage {
    /// Page URL.
    pub url: String,
    /// Page title.
    pub title: String,
    /// Cleaned, capped plain text.
    pub content: String,
    /// Relevance score, multipliers included.
    pub relevance_score: f64,
    /// How the page was reached.
    pub source_type: SourceType,
    /// Same-origin links found on the page, for depth expansion.
    pub links: Vec<String>,
}

/// Parameters of one research run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchRequest {
    /// The raw query.
    pub query: String,
    /// Context hints.
    #[serde(default)]
    pub context: ContextBag,
    /// Number of primary results wanted (doubled in aggressive mode).
    pub max_pages: usize,
    /// Crawl depth, 1 to 3.
    pub depth: u8,
    /// Widen the crawl with more results and related queries.
    pub aggressive: bool,
}

impl ResearchRequest {
    /// Default number of primary pages.
    pub const DEFAULT_MAX_PAGES: usize = 8;
    /// Deepest supported crawl.
    pub const MAX_DEPTH: u8 = 3;

    /// Request with default parameters: 8 pages, depth 1, normal mode.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            context: ContextBag::default(),
            max_pages: Self::DEFAULT_MAX_PAGES,
            depth: 1,
            aggressive: false,
        }
    }

    /// Set the context.
    #[must_use]
    pub fn with_context(mut self, context: ContextBag) -> Self {
        self.context = context;
        self
    }

    /// Set the number of primary pages.
    #[must_use]
    pub const fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Set the depth, clamped to 1..=3.
    #[must_use]
    pub fn with_depth(mut self, depth: u8) -> Self {
        self.depth = depth.clamp(1, Self::MAX_DEPTH);
        self
    }

    /// Enable or disable aggressive mode.
    #[must_use]
    pub const fn with_aggressive(mut self, aggressive: bool) -> Self {
        self.aggressive = aggressive;
        self
    }

    /// Depth clamped to the supported range.
    #[must_use]
    pub fn effective_depth(&self) -> u8 {
        self.depth.clamp(1, Self::MAX_DEPTH)
    }
}

/// Insight, trend and opportunity lists extracted from combined content.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insights {
    /// Key insights.
    pub insights: Vec<String>,
    /// Market trends.
    pub trends: Vec<String>,
    /// Opportunities.
    pub opportunities: Vec<String>,
}

impl Insights {
    /// Whether all three lists are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.insights.is_empty() && self.trends.is_empty() && self.opportunities.is_empty()
    }

    /// Drop blank and repeated entries and cap each list.
    #[must_use]
    pub fn capped(self, insights: usize, trends: usize, opportunities: usize) -> Self {
        Self {
            insights: dedupe_capped(self.insights, insights),
            trends: dedupe_capped(self.trends, trends),
            opportunities: dedupe_capped(self.opportunities, opportunities),
        }
    }
}

/// Remove blanks and duplicates keeping first occurrences, then cap.
pub(crate) fn dedupe_capped(items: Vec<String>, cap: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(cap.min(items.len()));
    for item in items {
        let item = item.trim().to_string();
        if out.len() >= cap {
            break;
        }
        if !item.is_empty() && !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// One entry of the bundle's source list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    /// Page title.
    pub title: String,
    /// Page URL.
    pub url: String,
    /// Relevance score.
    pub score: f64,
    /// How the page was reached.
    pub source_type: SourceType,
}

/// Provenance of a bundle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchMetadata {
    /// Unique id of the run.
    pub research_id: Uuid,
    /// When the bundle was built.
    pub research_date: DateTime<Utc>,
    /// Agent name.
    pub agent: String,
    /// Agent version.
    pub agent_version: String,
    /// Whether this is the degraded fallback bundle.
    pub fallback_used: bool,
    /// Whether the insight lists came from the LLM summarizer.
    pub ai_assisted_consolidation: bool,
    /// Wall-clock duration of the run.
    pub elapsed_ms: u64,
    /// Free-form note, set on fallback bundles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Consolidated output of one research run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchBundle {
    /// The raw query.
    pub query: String,
    /// Context hints as supplied.
    pub context: ContextBag,
    /// Number of distinct pages analyzed.
    pub pages_analyzed: usize,
    /// Page texts in score order, capped.
    pub combined_content: String,
    /// At most 5 key insights.
    pub key_insights: Vec<String>,
    /// At most 3 market trends.
    pub market_trends: Vec<String>,
    /// At most 3 opportunities.
    pub opportunities: Vec<String>,
    /// Sources, unique by URL, by descending score.
    pub sources: Vec<SourceRef>,
    /// Provenance.
    pub metadata: ResearchMetadata,
}
