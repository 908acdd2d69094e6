//! Startup helpers for the research agent command line.
//!
//! Reads API keys and tuning knobs from the environment, runs one research
//! request and writes the bundle as JSON on stdout. Logs go to stderr.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use crate::research::{
    ContextBag, InsightSummarizer, LlmConfig, OllamaInsightSummarizer, ResearchBundle,
    ResearchConfig, ResearchOrchestrator, ResearchRequest,
};
use crate::scraping::{ScrapingConfig, ScrapingService};

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "market-research")]
#[command(about = "Web market research: search, crawl, score and consolidate")]
#[command(version)]
pub struct Args {
    /// Research query, e.g. "electric bikes".
    pub query: String,

    /// Business segment.
    #[arg(long)]
    pub segment: Option<String>,

    /// Product being researched.
    #[arg(long)]
    pub product: Option<String>,

    /// Target audience.
    #[arg(long)]
    pub audience: Option<String>,

    /// Number of primary pages (doubled in aggressive mode).
    #[arg(long, default_value_t = ResearchRequest::DEFAULT_MAX_PAGES)]
    pub max_pages: usize,

    /// Crawl depth: 1 = search results only, 2-3 = follow internal links.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=3))]
    pub depth: u8,

    /// Widen the crawl with more results and related queries.
    #[arg(long)]
    pub aggressive: bool,

    /// Never call the LLM summarizer, even when enabled in the environment.
    #[arg(long)]
    pub no_llm: bool,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pub pretty: bool,
}

impl Args {
    /// Research request described by the arguments.
    #[must_use]
    pub fn request(&self) -> ResearchRequest {
        let context = ContextBag {
            segment: self.segment.clone(),
            product: self.product.clone(),
            audience: self.audience.clone(),
        };

        ResearchRequest::new(self.query.clone())
            .with_context(context)
            .with_max_pages(self.max_pages)
            .with_depth(self.depth)
            .with_aggressive(self.aggressive)
    }
}

/// Run the command line (used by the `market-research` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` once a bundle was written, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting market research agent v{}", env!("CARGO_PKG_VERSION"));

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    let outcome = rt
        .block_on(research(&args))
        .and_then(|bundle| write_bundle(&bundle, args.pretty));

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Research failed: {e:#}");
            ExitCode::from(1)
        }
    }
}

/// Build the pipeline from the environment and run one request.
///
/// # Errors
/// Returns an error if the scraping service or the summarizer cannot be
/// built. Research failures themselves yield a fallback bundle.
pub async fn research(args: &Args) -> Result<ResearchBundle> {
    let service = ScrapingService::new(ScrapingConfig::from_env())
        .context("failed to build scraping service")?;

    let mut llm = LlmConfig::from_env();
    if args.no_llm {
        llm.enabled = false;
    }
    let summarizer = build_summarizer(&llm)?;

    let orchestrator =
        ResearchOrchestrator::from_service(&service, summarizer, ResearchConfig::from_env());
    let bundle = orchestrator.research(&args.request()).await;

    let stats = service.sweep_cache();
    tracing::debug!(entries = stats.total(), "Cache after research");

    Ok(bundle)
}

/// LLM summarizer when enabled.
///
/// # Errors
/// Returns an error if the Ollama client cannot be built.
pub fn build_summarizer(config: &LlmConfig) -> Result<Option<Arc<dyn InsightSummarizer>>> {
    if !config.enabled {
        return Ok(None);
    }

    tracing::info!(model = %config.model, "LLM insight summarizer enabled");
    let summarizer =
        OllamaInsightSummarizer::new(config).context("failed to build Ollama client")?;
    Ok(Some(Arc::new(summarizer)))
}

/// Serialize the bundle to stdout.
fn write_bundle(bundle: &ResearchBundle, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(bundle)?
    } else {
        serde_json::to_string(bundle)?
    };

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{json}").context("failed to write bundle")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_to_request() {
        let args = Args::try_parse_from([
            "market-research",
            "electric bikes",
            "--segment",
            "mobility",
            "--depth",
            "2",
            "--aggressive",
        ]);
        assert!(args.is_ok());
        let Ok(args) = args else {
            return;
        };

        let request = args.request();
        assert_eq!(request.query, "electric bikes");
        assert_eq!(request.context.segment.as_deref(), Some("mobility"));
        assert_eq!(request.depth, 2);
        assert!(request.aggressive);
        assert_eq!(request.max_pages, 8);
    }

    #[test]
    fn test_depth_out_of_range_rejected() {
        assert!(Args::try_parse_from(["market-research", "bikes", "--depth", "4"]).is_err());
    }

    #[test]
    fn test_disabled_llm_builds_no_summarizer() {
        let built = build_summarizer(&LlmConfig::default());
        assert!(matches!(built, Ok(None)));
    }
}
