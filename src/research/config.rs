//! Configuration for the research pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::research::error::{ResearchError, ResearchResult};
use crate::scraping::config::{env_non_empty, env_parse};

/// Phase limits, score multipliers and output caps for the orchestrator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Pages expanded per level in normal mode.
    pub top_pages_normal: usize,
    /// Pages expanded per level in aggressive mode.
    pub top_pages_aggressive: usize,
    /// Links followed per expanded page in normal mode.
    pub links_per_page_normal: usize,
    /// Links followed per expanded page in aggressive mode.
    pub links_per_page_aggressive: usize,
    /// Related queries searched in aggressive mode.
    pub related_queries: usize,
    /// Results requested per related query.
    pub results_per_related_query: usize,
    /// Score multiplier per internal-link level.
    pub internal_link_multiplier: f64,
    /// Score multiplier for related-query pages.
    pub related_query_multiplier: f64,
    /// Character cap of the combined content.
    pub combined_content_cap: usize,
    /// Marker appended to truncated combined content.
    pub truncation_marker: String,
    /// Maximum key insights.
    pub max_insights: usize,
    /// Maximum market trends.
    pub max_trends: usize,
    /// Maximum opportunities.
    pub max_opportunities: usize,
    /// Pages fetched concurrently within one phase.
    pub concurrency: usize,
    /// Upper bound for one summarizer call.
    #[serde(with = "duration_secs")]
    pub summarizer_timeout: Duration,
    /// Agent name reported in metadata.
    pub agent_name: String,
    /// Agent version reported in metadata.
    pub agent_version: String,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            top_pages_normal: 3,
            top_pages_aggressive: 5,
            links_per_page_normal: 2,
            links_per_page_aggressive: 4,
            related_queries: 3,
            results_per_related_query: 3,
            internal_link_multiplier: 0.8,
            related_query_multiplier: 0.7,
            combined_content_cap: 15_000,
            truncation_marker: "... [additional content truncated]".to_string(),
            max_insights: 5,
            max_trends: 3,
            max_opportunities: 3,
            concurrency: 6,
            summarizer_timeout: Duration::from_secs(60),
            agent_name: "MarketResearchAgent".to_string(),
            agent_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ResearchConfig {
    /// Default settings with `RESEARCH_CONCURRENCY` applied.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(concurrency) = env_parse::<usize>("RESEARCH_CONCURRENCY") {
            config.concurrency = concurrency;
        }
        config
    }

    /// Set the fetch concurrency.
    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Pages expanded per level for the given mode.
    #[must_use]
    pub const fn top_pages(&self, aggressive: bool) -> usize {
        if aggressive {
            self.top_pages_aggressive
        } else {
            self.top_pages_normal
        }
    }

    /// Links followed per page for the given mode.
    #[must_use]
    pub const fn links_per_page(&self, aggressive: bool) -> usize {
        if aggressive {
            self.links_per_page_aggressive
        } else {
            self.links_per_page_normal
        }
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range.
    pub fn validate(&self) -> ResearchResult<()> {
        if self.concurrency == 0 {
            return Err(ResearchError::InvalidConfig(
                "concurrency must be > 0".to_string(),
            ));
        }

        for (name, value) in [
            ("internal_link_multiplier", self.internal_link_multiplier),
            ("related_query_multiplier", self.related_query_multiplier),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ResearchError::InvalidConfig(format!(
                    "{name} must be in (0, 1]"
                )));
            }
        }

        if self.combined_content_cap == 0 {
            return Err(ResearchError::InvalidConfig(
                "combined_content_cap must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Completion model settings for the optional insight summarizer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Whether the summarizer is used at all.
    pub enabled: bool,
    /// Ollama completion model name.
    pub model: String,
    /// Temperature for generation.
    pub temperature: f64,
    /// Optional custom base URL.
    pub base_url: Option<String>,
    /// Maximum characters of combined content sent to the model.
    pub max_input_chars: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: "ministral-3:8b-instruct-2512-q8_0".to_string(),
            temperature: 0.3,
            base_url: None,
            max_input_chars: 15_000,
        }
    }
}

impl LlmConfig {
    /// Read `RESEARCH_LLM_ENABLED`, `RESEARCH_OLLAMA_MODEL` and
    /// `RESEARCH_OLLAMA_URL` over the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(enabled) = env_parse::<bool>("RESEARCH_LLM_ENABLED") {
            config.enabled = enabled;
        }
        if let Some(model) = env_non_empty("RESEARCH_OLLAMA_MODEL") {
            config.model = model;
        }
        config.base_url = env_non_empty("RESEARCH_OLLAMA_URL");
        config
    }
}

/// Serde module for Duration serialization as whole seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResearchConfig::default();
        assert_eq!(config.top_pages(false), 3);
        assert_eq!(config.top_pages(true), 5);
        assert_eq!(config.links_per_page(false), 2);
        assert_eq!(config.links_per_page(true), 4);
        assert_eq!(config.combined_content_cap, 15_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = ResearchConfig::default().with_concurrency(0);
        assert!(matches!(config.validate(), Err(ResearchError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_bad_multiplier() {
        let mut config = ResearchConfig::default();
        config.related_query_multiplier = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_llm_disabled_by_default() {
        assert!(!LlmConfig::default().enabled);
    }
}
