//! Binary entrypoint that launches the market research command line.

use std::process::ExitCode;

use market_research_agent::start_research_agent;

/// Run one research request and print the bundle as JSON.
fn main() -> ExitCode {
    start_research_agent::run()
}
