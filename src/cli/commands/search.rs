//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the search command: retrieval only, no generation.
pub async fn run_search(query: &str, k: Option<usize>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let retriever = orchestrator.retriever()?;
    let k = k.unwrap_or_else(|| retriever.k());

    let spinner = Output::spinner("Searching...");
    let results = retriever.retrieve(query, k).await;
    spinner.finish_and_clear();

    match results {
        Ok(context) => {
            if context.is_empty() {
                Output::warning("No films found matching your query.");
            } else {
                Output::success(&format!("Found {} films", context.len()));
                for (i, entry) in context.entries().iter().enumerate() {
                    Output::search_result(i + 1, entry);
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
