//! Index command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{load_films, Orchestrator};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Import a JSON film file into the store.
pub async fn run_index(file: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Index, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let path = PathBuf::from(shellexpand::tilde(file).as_ref());
    let films = load_films(&path).with_context(|| format!("Failed to read {}", path.display()))?;

    if films.is_empty() {
        Output::warning("The file contains no films.");
        return Ok(());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let progress = Output::progress_bar(films.len() as u64, "Embedding and indexing");
    let result = orchestrator
        .import_films(films, |done, _| progress.set_position(done as u64))
        .await;
    progress.finish_and_clear();

    let result = result?;
    Output::success(&format!("Indexed {} films", result.imported));
    if result.skipped > 0 {
        Output::warning(&format!(
            "Skipped {} films without a source or title",
            result.skipped
        ));
    }

    let total = orchestrator.store().film_count().await?;
    Output::kv("Films in catalog", &total.to_string());

    Ok(())
}
