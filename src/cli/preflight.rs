//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting
//! operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{FilmSearchError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Asking needs the API key for embedding and generation.
    Ask,
    /// Search needs the API key to embed the query.
    Search,
    /// Importing needs the API key to embed films.
    Index,
    /// Listing only reads the store.
    List,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Ask => {
            check_api_key()?;
            check_retrieval(settings)?;
        }
        Operation::Search => {
            check_api_key()?;
            check_retrieval(settings)?;
        }
        Operation::Index => {
            check_api_key()?;
        }
        Operation::List => {}
    }
    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(FilmSearchError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(FilmSearchError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

/// Check that the retrieval section resolves.
fn check_retrieval(settings: &Settings) -> Result<()> {
    settings.retrieval.fusion_policy()?;
    if settings.retrieval.k == 0 {
        return Err(FilmSearchError::Config(
            "retrieval.k must be at least 1".to_string(),
        ));
    }
    Ok(())
}
