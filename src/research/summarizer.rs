//! LLM-backed insight summarizer running on Ollama.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client as ReqwestClient;
use rig::client::CompletionClient;
use rig::completion::CompletionModel;
use rig::message::AssistantContent;
use rig::providers::ollama;
use serde::Deserialize;
use tracing::debug;

use crate::research::config::LlmConfig;
use crate::research::error::SummaryError;
use crate::research::insights::InsightSummarizer;
use crate::research::types::{ContextBag, Insights};

/// System prompt for insight extraction.
const INSIGHTS_SYSTEM_PROMPT: &str = r"You are a market research analyst.
You read raw web research and extract what matters for a business decision.

OUTPUT FORMAT:
A single JSON object with exactly these keys:
- key_insights: array of strings
- market_trends: array of strings
- opportunities: array of strings

RULES:
- Be specific and give examples from the content when possible
- Do not invent facts that are not in the content
- No text outside the JSON object";

static FENCED_JSON: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(.*?)```").ok());
static BARE_JSON: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").ok());

/// Raw shape the model is asked to produce.
#[derive(Debug, Default, Deserialize)]
struct RawInsights {
    #[serde(default)]
    key_insights: Vec<String>,
    #[serde(default)]
    market_trends: Vec<String>,
    #[serde(default)]
    opportunities: Vec<String>,
}

/// Insight summarizer backed by an Ollama completion model.
pub struct OllamaInsightSummarizer {
    model: ollama::CompletionModel,
    temperature: f64,
    max_input_chars: usize,
}

impl OllamaInsightSummarizer {
    /// Create a new summarizer.
    ///
    /// # Errors
    /// Returns an error if the Ollama client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, SummaryError> {
        let builder = ollama::Client::<ReqwestClient>::builder().api_key(rig::client::Nothing);
        let builder = if let Some(base_url) = &config.base_url {
            builder.base_url(base_url)
        } else {
            builder
        };
        let client = builder.build().map_err(SummaryError::from)?;
        let model = client.completion_model(config.model.clone());

        Ok(Self {
            model,
            temperature: config.temperature,
            max_input_chars: config.max_input_chars,
        })
    }
}

#[async_trait]
impl InsightSummarizer for OllamaInsightSummarizer {
    async fn extract_insights(
        &self,
        text: &str,
        query: &str,
        context: &ContextBag,
    ) -> Result<Insights, SummaryError> {
        let prompt = build_prompt(text, query, context, self.max_input_chars);

        debug!(query, chars = prompt.chars().count(), "Extracting insights with LLM");

        let request = self
            .model
            .completion_request(prompt)
            .preamble(INSIGHTS_SYSTEM_PROMPT.to_string())
            .temperature(self.temperature)
            .build();

        let response = self.model.completion(request).await?;
        let answer = extract_text(&response.choice);
        parse_insights(&answer)
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}

/// Prompt with the research content, truncated to `max_chars`.
fn build_prompt(text: &str, query: &str, context: &ContextBag, max_chars: usize) -> String {
    let content: String = text.chars().take(max_chars).collect();
    let context_line = [
        ("segment", context.segment()),
        ("product", context.product()),
        ("audience", context.audience()),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.map(|v| format!("{label}: {v}")))
    .collect::<Vec<_>>()
    .join(", ");

    format!(
        "Based on the following web research about '{query}' (context: {context_line}), \
         extract the key insights, market trends and opportunities.\n\n\
         Content:\n```text\n{content}\n```\n\nJSON:"
    )
}

/// Extract text from assistant response.
fn extract_text(choice: &rig::OneOrMany<AssistantContent>) -> String {
    let mut out = String::new();
    for content in choice.iter() {
        if let AssistantContent::Text(text) = content {
            out.push_str(&text.text);
        }
    }
    out
}

/// Decode the JSON object from a fenced block or the first `{...}` span.
fn parse_insights(answer: &str) -> Result<Insights, SummaryError> {
    let fenced = FENCED_JSON
        .as_ref()
        .and_then(|re| re.captures(answer))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str());
    let json = fenced
        .or_else(|| BARE_JSON.as_ref().and_then(|re| re.find(answer)).map(|m| m.as_str()))
        .ok_or(SummaryError::MissingJson)?;

    let raw: RawInsights = serde_json::from_str(json.trim())?;
    Ok(Insights {
        insights: raw.key_insights,
        trends: raw.market_trends,
        opportunities: raw.opportunities,
    })
}
