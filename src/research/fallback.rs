//! Degraded bundle returned when a research run cannot complete.

use chrono::Utc;
use uuid::Uuid;

use crate::research::config::ResearchConfig;
use crate::research::types::{ContextBag, ResearchBundle, ResearchMetadata};

/// Build the fallback bundle for `query`.
///
/// The bundle is well-formed: no pages, no sources, and generic but
/// non-empty insight, trend and opportunity lists.
#[must_use]
pub fn fallback_bundle(
    query: &str,
    context: &ContextBag,
    config: &ResearchConfig,
    elapsed_ms: u64,
    reason: &str,
) -> ResearchBundle {
    tracing::warn!(query, reason, "Returning fallback research bundle");

    ResearchBundle {
        query: query.to_string(),
        context: context.clone(),
        pages_analyzed: 0,
        combined_content: String::new(),
        key_insights: vec![
            format!("The market for '{query}' is dynamic and demands constant adaptation."),
            "Personalization and automation are crucial for success.".to_string(),
        ],
        market_trends: vec![
            "Continued growth of digital channels.".to_string(),
            "Rising demand for efficient solutions.".to_string(),
        ],
        opportunities: vec![
            "Identify unexplored niches.".to_string(),
            "Invest in valuable content.".to_string(),
        ],
        sources: Vec::new(),
        metadata: ResearchMetadata {
            research_id: Uuid::new_v4(),
            research_date: Utc::now(),
            agent: format!("{}_Fallback", config.agent_name),
            agent_version: config.agent_version.clone(),
            fallback_used: true,
            ai_assisted_consolidation: false,
            elapsed_ms,
            note: Some(format!("Web research unavailable: {reason}")),
        },
    }
}
