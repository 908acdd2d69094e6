//! Multi-phase research crawl.
//!
//! A run goes through these phases in order, each one a join point for
//! the concurrent fetches it dispatches:
//!
//! 1. primary search for `max_pages` results (twice that in aggressive mode)
//! 2. fetch and score every primary result
//! 3. depth expansion: follow same-origin links of the best pages
//! 4. related-query expansion (aggressive mode only)
//! 5. merge: stable sort by score, one page per URL
//! 6. consolidate into a [`ResearchBundle`]
//!
//! Individual fetch failures only shrink the page set. Anything that stops
//! the run as a whole is turned into the fallback bundle by
//! [`ResearchOrchestrator::research`].

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::{Datelike, Utc};
use futures::{FutureExt, StreamExt, stream};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::research::config::ResearchConfig;
use crate::research::error::{ResearchError, ResearchResult, SummaryError};
use crate::research::fallback::fallback_bundle;
use crate::research::insights::{InsightSummarizer, extract_basic_insights};
use crate::research::queries::related_queries;
use crate::research::scoring::RelevanceScorer;
use crate::research::types::{
    ContextBag, FetchedPage, Insights, ResearchBundle, ResearchMetadata, ResearchRequest,
    SourceRef, SourceType,
};
use crate::scraping::content::ContentExtractor;
use crate::scraping::error::ScrapingError;
use crate::scraping::links::normalize_url;
use crate::scraping::search::SearchProvider;
use crate::scraping::types::{SearchResult, SearchSource, truncate_with_marker};
use crate::scraping::ScrapingService;

/// A page scheduled for fetching.
#[derive(Clone, Debug)]
struct PageTarget {
    url: String,
    title: String,
    source_type: SourceType,
    multiplier: f64,
}

impl PageTarget {
    fn from_result(result: SearchResult, source_type: SourceType, multiplier: f64) -> Self {
        Self {
            url: result.url,
            title: result.title,
            source_type,
            multiplier,
        }
    }
}

/// Drives search, extraction, scoring and consolidation for one request
/// at a time. Cheap to share: every collaborator sits behind an `Arc`.
pub struct ResearchOrchestrator {
    search: Arc<SearchProvider>,
    extractor: Arc<ContentExtractor>,
    summarizer: Option<Arc<dyn InsightSummarizer>>,
    scorer: RelevanceScorer,
    config: ResearchConfig,
}

impl ResearchOrchestrator {
    /// Create an orchestrator from its collaborators.
    #[must_use]
    pub fn new(
        search: Arc<SearchProvider>,
        extractor: Arc<ContentExtractor>,
        summarizer: Option<Arc<dyn InsightSummarizer>>,
        config: ResearchConfig,
    ) -> Self {
        Self {
            search,
            extractor,
            summarizer,
            scorer: RelevanceScorer::new(),
            config,
        }
    }

    /// Create an orchestrator over a scraping service's provider and
    /// extractor.
    #[must_use]
    pub fn from_service(
        service: &ScrapingService,
        summarizer: Option<Arc<dyn InsightSummarizer>>,
        config: ResearchConfig,
    ) -> Self {
        Self::new(
            service.search_provider(),
            service.content_extractor(),
            summarizer,
            config,
        )
    }

    /// Replace the relevance scorer.
    #[must_use]
    pub fn with_scorer(mut self, scorer: RelevanceScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Run a research request. Never fails: errors and panics anywhere in
    /// the run produce the fallback bundle.
    pub async fn research(&self, request: &ResearchRequest) -> ResearchBundle {
        let started = Instant::now();
        let outcome = AssertUnwindSafe(self.try_research(request))
            .catch_unwind()
            .await;

        let error = match outcome {
            Ok(Ok(bundle)) => return bundle,
            Ok(Err(e)) => e,
            Err(payload) => {
                let e = ResearchError::Panicked(panic_message(payload.as_ref()));
                error!(query = %request.query, error = %e, "Research run panicked");
                e
            }
        };

        fallback_bundle(
            &request.query,
            &request.context,
            &self.config,
            elapsed_ms(started),
            &error.to_string(),
        )
    }

    /// Run a research request, reporting why it could not complete.
    ///
    /// # Errors
    /// Returns an error for an empty query, an invalid configuration, or
    /// when no page yielded content.
    pub async fn try_research(&self, request: &ResearchRequest) -> ResearchResult<ResearchBundle> {
        let started = Instant::now();
        self.config.validate()?;

        let query = request.query.trim();
        if query.is_empty() {
            return Err(ResearchError::EmptyQuery);
        }
        let context = &request.context;
        let aggressive = request.aggressive;
        let depth = request.effective_depth();

        info!(query, depth, aggressive, max_pages = request.max_pages, "Starting research");

        // Every URL ever scheduled (normalized), so no page is fetched twice
        // in one run.
        let mut visited: HashSet<String> = HashSet::new();

        // 1-2. Primary search, fetch and score
        let primary_count = request
            .max_pages
            .saturating_mul(if aggressive { 2 } else { 1 });
        let results = self.search.search(query, primary_count, context).await;
        let targets = search_targets(results, SourceType::Primary, 1.0, &mut visited);
        let primary = self.fetch_and_score(targets, query, context).await;
        info!(query, pages = primary.len(), "Primary phase done");

        let mut pages = primary.clone();

        // 3. Depth expansion, one level per extra depth
        let mut frontier = primary;
        let mut multiplier = 1.0;
        for level in 1..depth {
            multiplier *= self.config.internal_link_multiplier;
            let targets = self.link_targets(&frontier, aggressive, multiplier, &mut visited);
            if targets.is_empty() {
                debug!(query, level, "No internal links to expand");
                break;
            }
            frontier = self.fetch_and_score(targets, query, context).await;
            info!(query, level, pages = frontier.len(), "Depth expansion done");
            pages.extend(frontier.iter().cloned());
        }

        // 4. Related queries
        if aggressive {
            let related = self.related_pages(query, context, &mut visited).await;
            info!(query, pages = related.len(), "Related-query phase done");
            pages.extend(related);
        }

        // 5. Merge and rank
        let pages = merge_pages(pages);
        if pages.is_empty() {
            return Err(ResearchError::NoContent(query.to_string()));
        }

        // 6. Consolidate
        Ok(self.consolidate(pages, query, context, started).await)
    }

    /// Same-origin links of the best pages of `frontier`.
    fn link_targets(
        &self,
        frontier: &[FetchedPage],
        aggressive: bool,
        multiplier: f64,
        visited: &mut HashSet<String>,
    ) -> Vec<PageTarget> {
        let mut best: Vec<&FetchedPage> = frontier.iter().collect();
        best.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));

        let mut targets = Vec::new();
        for page in best.into_iter().take(self.config.top_pages(aggressive)) {
            let links = page
                .links
                .iter()
                .filter(|link| visited.insert(normalize_url(link)))
                .take(self.config.links_per_page(aggressive));

            targets.extend(links.map(|link| PageTarget {
                url: link.clone(),
                title: format!("Internal link from {}", page.title),
                source_type: SourceType::InternalLink,
                multiplier,
            }));
        }
        targets
    }

    /// Search the first related queries and fetch their results.
    async fn related_pages(
        &self,
        query: &str,
        context: &ContextBag,
        visited: &mut HashSet<String>,
    ) -> Vec<FetchedPage> {
        let queries: Vec<String> =
            related_queries(query, context, self.search.locale(), Utc::now().year())
                .into_iter()
                .take(self.config.related_queries)
                .collect();
        debug!(query, related = ?queries, "Related queries");

        let per_query = self.config.results_per_related_query;
        let result_sets: Vec<Vec<SearchResult>> = stream::iter(queries.iter())
            .map(|q| self.search.search(q, per_query, context))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let targets = search_targets(
            result_sets.into_iter().flatten().collect(),
            SourceType::RelatedQuery,
            self.config.related_query_multiplier,
            visited,
        );
        self.fetch_and_score(targets, query, context).await
    }

    /// Fetch targets with bounded concurrency and score what came back.
    /// Output order follows input order; failed fetches are dropped.
    async fn fetch_and_score(
        &self,
        targets: Vec<PageTarget>,
        query: &str,
        context: &ContextBag,
    ) -> Vec<FetchedPage> {
        stream::iter(targets)
            .map(|target| self.fetch_one(target, query, context))
            .buffered(self.config.concurrency.max(1))
            .filter_map(|page| async move { page })
            .collect()
            .await
    }

    async fn fetch_one(
        &self,
        target: PageTarget,
        query: &str,
        context: &ContextBag,
    ) -> Option<FetchedPage> {
        let content = match self.extractor.try_extract(&target.url).await {
            Ok(content) => content,
            Err(ScrapingError::UnsupportedScheme(scheme)) => {
                debug!(url = %target.url, scheme, "Skipping non-HTTP URL");
                return None;
            }
            Err(e) if e.is_transient() => {
                info!(url = %target.url, error = %e, "Page unavailable");
                return None;
            }
            Err(e) => {
                warn!(url = %target.url, error = %e, "Page could not be extracted");
                return None;
            }
        };

        let score = self.scorer.score(&content.text, query, context) * target.multiplier;
        let title = if target.title.trim().is_empty() {
            content.title.clone().unwrap_or_else(|| target.url.clone())
        } else {
            target.title
        };

        Some(FetchedPage {
            url: target.url,
            title,
            content: content.text,
            relevance_score: score,
            source_type: target.source_type,
            links: content.links,
        })
    }

    /// Build the bundle from merged, ranked pages.
    async fn consolidate(
        &self,
        pages: Vec<FetchedPage>,
        query: &str,
        context: &ContextBag,
        started: Instant,
    ) -> ResearchBundle {
        let combined = combine_content(
            &pages,
            self.config.combined_content_cap,
            &self.config.truncation_marker,
        );

        let (insights, ai_assisted) = self.insights(&combined, query, context).await;

        let sources = pages
            .iter()
            .map(|page| SourceRef {
                title: page.title.clone(),
                url: page.url.clone(),
                score: page.relevance_score,
                source_type: page.source_type,
            })
            .collect();

        let elapsed = elapsed_ms(started);
        info!(query, pages = pages.len(), elapsed_ms = elapsed, "Research complete");

        ResearchBundle {
            query: query.to_string(),
            context: context.clone(),
            pages_analyzed: pages.len(),
            combined_content: combined,
            key_insights: insights.insights,
            market_trends: insights.trends,
            opportunities: insights.opportunities,
            sources,
            metadata: ResearchMetadata {
                research_id: Uuid::new_v4(),
                research_date: Utc::now(),
                agent: self.config.agent_name.clone(),
                agent_version: self.config.agent_version.clone(),
                fallback_used: false,
                ai_assisted_consolidation: ai_assisted,
                elapsed_ms: elapsed,
                note: None,
            },
        }
    }

    /// Insight lists from the summarizer when it answers with something,
    /// otherwise from keyword classification.
    async fn insights(&self, combined: &str, query: &str, context: &ContextBag) -> (Insights, bool) {
        let config = &self.config;

        if let Some(summarizer) = &self.summarizer {
            let outcome = tokio::time::timeout(
                config.summarizer_timeout,
                summarizer.extract_insights(combined, query, context),
            )
            .await
            .map_err(SummaryError::from)
            .and_then(|r| r);

            match outcome {
                Ok(insights) if !insights.is_empty() => {
                    let insights = insights.capped(
                        config.max_insights,
                        config.max_trends,
                        config.max_opportunities,
                    );
                    return (insights, true);
                }
                Ok(_) => {
                    warn!(
                        summarizer = summarizer.name(),
                        "Summarizer returned no insights, using keyword extraction"
                    );
                }
                Err(e) => {
                    warn!(
                        summarizer = summarizer.name(),
                        error = %e,
                        "Summarizer failed, using keyword extraction"
                    );
                }
            }
        }

        let insights = extract_basic_insights(
            combined,
            config.max_insights,
            config.max_trends,
            config.max_opportunities,
        );
        (insights, false)
    }
}

/// Turn search results into fetch targets, skipping placeholders and
/// URLs already scheduled.
fn search_targets(
    results: Vec<SearchResult>,
    source_type: SourceType,
    multiplier: f64,
    visited: &mut HashSet<String>,
) -> Vec<PageTarget> {
    results
        .into_iter()
        .filter(|r| r.source != SearchSource::Placeholder)
        .filter(|r| visited.insert(normalize_url(&r.url)))
        .map(|r| PageTarget::from_result(r, source_type, multiplier))
        .collect()
}

/// Stable sort by descending score, then keep the first (best) page per
/// normalized URL.
fn merge_pages(mut pages: Vec<FetchedPage>) -> Vec<FetchedPage> {
    pages.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));

    let mut seen = HashSet::new();
    pages.retain(|page| seen.insert(normalize_url(&page.url)));
    pages
}

/// Page texts with headers, in the given order, capped at `cap` characters
/// plus `marker`.
fn combine_content(pages: &[FetchedPage], cap: usize, marker: &str) -> String {
    let mut combined = String::new();

    for (i, page) in pages.iter().enumerate() {
        combined.push_str(&format!("\n--- Page content {} ({}) ---\n", i + 1, page.url));
        combined.push_str(&page.content);

        if combined.chars().count() > cap {
            return truncate_with_marker(&combined, cap, marker);
        }
    }

    combined
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str, score: f64, source_type: SourceType) -> FetchedPage {
        FetchedPage {
            url: url.to_string(),
            title: url.to_string(),
            content: format!("content of {url}"),
            relevance_score: score,
            source_type,
            links: Vec::new(),
        }
    }

    #[test]
    fn test_merge_sorts_and_dedupes() {
        let merged = merge_pages(vec![
            page("https://a.com", 1.0, SourceType::Primary),
            page("https://b.com", 3.0, SourceType::Primary),
            page("https://a.com", 2.0, SourceType::RelatedQuery),
            page("https://c.com", 3.0, SourceType::InternalLink),
        ]);

        let urls: Vec<&str> = merged.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["https://b.com", "https://c.com", "https://a.com"]);
        assert!((merged[2].relevance_score - 2.0).abs() < f64::EPSILON);
        assert_eq!(merged[2].source_type, SourceType::RelatedQuery);
    }

    #[test]
    fn test_merge_treats_trailing_slash_as_same_page() {
        let merged = merge_pages(vec![
            page("https://a.com", 2.0, SourceType::Primary),
            page("https://a.com/", 1.0, SourceType::InternalLink),
            page("https://a.com/#pricing", 0.5, SourceType::RelatedQuery),
        ]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source_type, SourceType::Primary);
    }

    #[test]
    fn test_search_targets_skip_scheduled_and_placeholder_urls() {
        let mut visited = HashSet::new();
        visited.insert("https://a.com/".to_string());

        let results = vec![
            SearchResult::new("A", "https://a.com", "", SearchSource::Google),
            SearchResult::new("B", "https://b.com/x#top", "", SearchSource::Google),
            SearchResult::new("B again", "https://b.com/x", "", SearchSource::Brave),
            SearchResult::new("P", "https://c.com", "", SearchSource::Placeholder),
        ];
        let targets = search_targets(results, SourceType::Primary, 1.0, &mut visited);

        let urls: Vec<&str> = targets.iter().map(|t| t.url.as_str()).collect();
        assert_eq!(urls, vec!["https://b.com/x#top"]);
        assert!(visited.contains("https://b.com/x"));
    }

    #[test]
    fn test_combine_content_capped() {
        let mut big = page("https://a.com", 1.0, SourceType::Primary);
        big.content = "x".repeat(20_000);
        let pages = vec![big, page("https://b.com", 0.5, SourceType::Primary)];

        let combined = combine_content(&pages, 15_000, "... [truncated]");
        assert!(combined.ends_with("... [truncated]"));
        assert_eq!(combined.chars().count(), 15_000 + "... [truncated]".len());
        assert!(!combined.contains("https://b.com"));
    }

    #[test]
    fn test_combine_content_headers_in_order() {
        let pages = vec![
            page("https://a.com", 2.0, SourceType::Primary),
            page("https://b.com", 1.0, SourceType::Primary),
        ];
        let combined = combine_content(&pages, 15_000, "...");
        let first = combined.find("Page content 1 (https://a.com)");
        let second = combined.find("Page content 2 (https://b.com)");
        assert!(first.is_some() && second.is_some());
        assert!(first < second);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
