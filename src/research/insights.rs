//! Insight extraction from combined research content.
//!
//! An [`InsightSummarizer`] (usually LLM-backed) is tried first by the
//! orchestrator; [`extract_basic_insights`] is the deterministic keyword
//! fallback used when no summarizer is configured or it fails.

use async_trait::async_trait;

use crate::research::error::SummaryError;
use crate::research::types::{ContextBag, Insights, dedupe_capped};

/// Sentences this short carry too little to be an insight.
const MIN_SENTENCE_CHARS: usize = 50;
/// Sentences are cut to this many characters.
const MAX_SENTENCE_CHARS: usize = 200;

const TREND_KEYWORDS: &[&str] = &["trend", "growth"];
const OPPORTUNITY_KEYWORDS: &[&str] = &["opportunit", "new market"];
const INSIGHT_KEYWORDS: &[&str] = &["insight", "key", "important"];
const MARKET_KEYWORDS: &[&str] = &["market", "analysis", "strategy"];

/// Extracts insight, trend and opportunity lists from combined page text.
#[async_trait]
pub trait InsightSummarizer: Send + Sync {
    /// Summarize `text`, gathered for `query` under `context`.
    async fn extract_insights(
        &self,
        text: &str,
        query: &str,
        context: &ContextBag,
    ) -> Result<Insights, SummaryError>;

    /// Summarizer name for logging.
    fn name(&self) -> &'static str;
}

/// Classify sentences longer than 50 characters by keyword.
///
/// Trend keywords win over opportunity keywords, which win over insight
/// and generic market keywords. Each list keeps first occurrences only and
/// is capped to the given sizes.
#[must_use]
pub fn extract_basic_insights(
    text: &str,
    max_insights: usize,
    max_trends: usize,
    max_opportunities: usize,
) -> Insights {
    let mut insights = Vec::new();
    let mut trends = Vec::new();
    let mut opportunities = Vec::new();

    for sentence in sentences(text) {
        if sentence.chars().count() <= MIN_SENTENCE_CHARS {
            continue;
        }

        let lower = sentence.to_lowercase();
        let clipped: String = sentence.chars().take(MAX_SENTENCE_CHARS).collect();

        if contains_any(&lower, TREND_KEYWORDS) {
            trends.push(clipped);
        } else if contains_any(&lower, OPPORTUNITY_KEYWORDS) {
            opportunities.push(clipped);
        } else if contains_any(&lower, INSIGHT_KEYWORDS) || contains_any(&lower, MARKET_KEYWORDS) {
            insights.push(clipped);
        }
    }

    Insights {
        insights: dedupe_capped(insights, max_insights),
        trends: dedupe_capped(trends, max_trends),
        opportunities: dedupe_capped(opportunities, max_opportunities),
    }
}

/// Split on sentence boundaries and line breaks, skipping page headers.
fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n')
        .flat_map(|line| line.split(". "))
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.starts_with("---"))
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}
