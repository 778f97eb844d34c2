//! RAG (Retrieval-Augmented Generation) pipeline for film recommendations.
//!
//! retrieve -> format -> assemble prompt -> generate -> route answer stream.

pub mod completion;
pub mod context;
mod pipeline;
pub mod prompt;
mod retriever;
pub mod router;

pub use completion::{
    Channel, CompletionEngine, CompletionModel, Fragment, FragmentStream, OpenAICompletionModel,
};
pub use context::{format_context, split_context};
pub use pipeline::FilmSearch;
pub use prompt::{Prompt, PromptAssembler};
pub use retriever::Retriever;
pub use router::{route, AnswerStream};

use crate::store::ScoredFilm;
use serde::Serialize;

/// Citation data carried alongside a retrieved film's text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitationMetadata {
    /// Source reference to cite.
    pub source: String,
    pub title: String,
    pub release_date: String,
    pub runtime: u32,
}

/// One retrieved film, rendered for the prompt.
#[derive(Debug, Clone, Serialize)]
pub struct ContextEntry {
    /// Denormalized text rendering of the film.
    pub text: String,
    /// Fused relevance score.
    pub score: f32,
    pub metadata: CitationMetadata,
}

impl From<ScoredFilm> for ContextEntry {
    fn from(result: ScoredFilm) -> Self {
        Self {
            text: result.film.render_text(),
            score: result.score,
            metadata: CitationMetadata {
                source: result.film.source,
                title: result.film.title,
                release_date: result.film.release_date,
                runtime: result.film.runtime,
            },
        }
    }
}

/// Retrieved films for one request, ordered by descending score.
///
/// An empty context is a normal outcome: generation still runs and is told
/// that nothing matched.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct RetrievedContext {
    entries: Vec<ContextEntry>,
}

impl RetrievedContext {
    /// Wrap entries, restoring descending score order if needed.
    pub fn new(mut entries: Vec<ContextEntry>) -> Self {
        // Stable sort keeps the store's tie-break order.
        entries.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Self { entries }
    }

    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<ContextEntry> {
        self.entries
    }
}
