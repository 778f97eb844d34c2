//! OpenAI client configuration with sensible defaults.

use crate::config::OpenAISettings;
use crate::error::{FilmSearchError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for OpenAI API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create an OpenAI client with the default timeout.
pub fn create_client() -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS), None)
}

/// Create an OpenAI client from the `[openai]` settings section.
pub fn create_client_from_settings(settings: &OpenAISettings) -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(
        Duration::from_secs(settings.request_timeout_secs),
        settings.api_base.as_deref(),
    )
}

/// Create an OpenAI client with a custom timeout and optional API base URL.
///
/// The timeout bounds the whole HTTP exchange, including a streamed body.
pub fn create_client_with_timeout(
    timeout: Duration,
    api_base: Option<&str>,
) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| FilmSearchError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let mut config = OpenAIConfig::default();
    if let Some(base) = api_base {
        config = config.with_api_base(base);
    }

    Ok(Client::with_config(config).with_http_client(http_client))
}
