//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use futures::StreamExt;
use std::io::Write;

/// Run the ask command, streaming the answer to stdout.
pub async fn run_ask(
    query: &str,
    k: Option<usize>,
    model: Option<String>,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let search = orchestrator.film_search(model.as_deref())?;
    let k = k.unwrap_or_else(|| search.retriever().k());

    let spinner = Output::spinner("Searching the catalog...");

    let mut answer = match search.ask_with_k(query, k).await {
        Ok(answer) => answer,
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate recommendations: {}", e));
            return Err(e.into());
        }
    };

    let mut stdout = std::io::stdout();
    let mut received = false;

    while let Some(item) = answer.next().await {
        match item {
            Ok(text) => {
                if !received {
                    spinner.finish_and_clear();
                    println!();
                    received = true;
                }
                write!(stdout, "{}", text)?;
                stdout.flush()?;
            }
            Err(e) => {
                spinner.finish_and_clear();
                println!();
                if received {
                    Output::warning("The answer above is incomplete.");
                }
                Output::error(&format!("Generation failed: {}", e));
                return Err(e.into());
            }
        }
    }

    spinner.finish_and_clear();
    println!();
    Ok(())
}
