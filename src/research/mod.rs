//! Market research pipeline.
//!
//! Turns a query plus a small context bag into a consolidated
//! [`ResearchBundle`]:
//! - Relevance scoring of fetched pages
//! - Depth expansion through same-origin links
//! - Related-query expansion in aggressive mode
//! - Insight extraction (LLM summarizer or keyword fallback)
//! - A well-formed fallback bundle when a run cannot complete

pub mod config;
pub mod error;
pub mod fallback;
pub mod insights;
pub mod orchestrator;
pub mod queries;
pub mod scoring;
pub mod summarizer;
pub mod types;

pub use config::{LlmConfig, ResearchConfig};
pub use error::{ResearchError, ResearchResult, SummaryError};
pub use fallback::fallback_bundle;
pub use insights::{InsightSummarizer, extract_basic_insights};
pub use orchestrator::ResearchOrchestrator;
pub use queries::related_queries;
pub use scoring::RelevanceScorer;
pub use summarizer::OllamaInsightSummarizer;
pub use types::{
    ContextBag, FetchedPage, Insights, ResearchBundle, ResearchMetadata, ResearchRequest,
    SourceRef, SourceType,
};
