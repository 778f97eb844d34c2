//! Error types for filmsearch.

use thiserror::Error;

/// Library-level error type for filmsearch operations.
#[derive(Error, Debug)]
pub enum FilmSearchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Film store unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Answer generation failed: {0}")]
    Generation(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for filmsearch operations.
pub type Result<T> = std::result::Result<T, FilmSearchError>;
