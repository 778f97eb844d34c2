//! filmsearch - Film recommendations grounded in your own catalog
//!
//! A retrieval-augmented pipeline that answers natural-language film
//! requests ("something like Paddington for a rainy Sunday") with
//! recommendations drawn only from an indexed catalog.
//!
//! # Overview
//!
//! For every request filmsearch:
//! - Retrieves the best-matching films with a hybrid dense + lexical search
//! - Formats them into a context block and assembles a fixed-policy prompt
//! - Streams the model's answer back fragment by fragment
//! - Forwards only answer text to the caller
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `film` - Film records and their text rendering
//! - `embedding` - Embedding generation
//! - `store` - Film store abstraction and hybrid ranking
//! - `rag` - Retrieval, prompt assembly, streaming generation and routing
//! - `orchestrator` - Component wiring and catalog import
//! - `cli` - Command-line interface and HTTP server
//!
//! # Example
//!
//! ```rust,no_run
//! use filmsearch::config::Settings;
//! use filmsearch::orchestrator::Orchestrator;
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!     let search = orchestrator.film_search(None)?;
//!
//!     let mut answer = search.ask("Recommend films about pets").await?;
//!     while let Some(text) = answer.next().await {
//!         print!("{}", text?);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod film;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{FilmSearchError, Result};
