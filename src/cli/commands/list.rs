//! List command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    preflight::check(Operation::List, &settings)?;
    let orchestrator = Orchestrator::new(settings)?;

    match orchestrator.store().list_films().await {
        Ok(films) => {
            if films.is_empty() {
                Output::info("No films indexed yet. Use 'filmsearch index <file.json>' to add some.");
            } else {
                Output::header(&format!("Indexed Films ({})", films.len()));
                println!();

                for film in &films {
                    Output::film_info(film);
                }

                let total_minutes: u64 = films.iter().map(|f| u64::from(f.runtime)).sum();
                println!();
                Output::kv("Total films", &films.len().to_string());
                Output::kv("Total runtime", &format!("{} hours", total_minutes / 60));
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list films: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
