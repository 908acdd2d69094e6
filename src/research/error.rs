//! Error types for the research pipeline.

use thiserror::Error;

/// Errors raised inside one research run.
///
/// [`crate::research::ResearchOrchestrator::research`] never returns these;
/// they are turned into a fallback bundle at the orchestrator boundary.
#[derive(Debug, Error)]
pub enum ResearchError {
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The query was empty after trimming.
    #[error("research query is empty")]
    EmptyQuery,
    /// No page yielded usable content.
    #[error("no content could be extracted for '{0}'")]
    NoContent(String),
    /// A phase panicked.
    #[error("research phase panicked: {0}")]
    Panicked(String),
}

/// Errors from an insight summarizer.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// HTTP client error from Rig.
    #[error("http client error: {0}")]
    HttpClient(#[from] rig::http_client::Error),
    /// Completion error.
    #[error("completion error: {0}")]
    Completion(#[from] rig::completion::CompletionError),
    /// The model answer held no JSON object.
    #[error("model response contains no JSON object")]
    MissingJson,
    /// The JSON object could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The summarizer gave up within its time budget.
    #[error("summarizer timed out")]
    Timeout,
}

impl From<tokio::time::error::Elapsed> for SummaryError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::Timeout
    }
}

/// Convenience result alias for research operations.
pub type ResearchResult<T> = Result<T, ResearchError>;
