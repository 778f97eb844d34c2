//! Film store abstraction.
//!
//! Provides a trait-based interface over hybrid (vector + full-text) film
//! indexes. Both backends share the ranking in [`hybrid`].

pub mod hybrid;
mod memory;
mod sqlite;

pub use memory::MemoryFilmStore;
pub use sqlite::SqliteFilmStore;

use crate::error::Result;
use crate::film::FilmRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How dense and lexical rankings are combined into one score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum FusionPolicy {
    /// Sum of `1 / (k + rank)` over both rankings.
    ReciprocalRank { k: f32 },
    /// Min-max normalized blend; `vector_weight` goes to cosine similarity,
    /// the remainder to the lexical score.
    Weighted { vector_weight: f32 },
}

impl Default for FusionPolicy {
    fn default() -> Self {
        FusionPolicy::ReciprocalRank { k: 60.0 }
    }
}

/// A hybrid search request against the film index.
#[derive(Debug, Clone)]
pub struct HybridQuery<'a> {
    /// Raw query text for lexical matching.
    pub text: &'a str,
    /// Query embedding for dense matching.
    pub embedding: &'a [f32],
    /// Maximum number of results.
    pub limit: usize,
    /// Films below this cosine similarity qualify only through a lexical match.
    pub min_vector_score: f32,
    pub fusion: FusionPolicy,
}

/// A film with its fused relevance score.
#[derive(Debug, Clone)]
pub struct ScoredFilm {
    pub film: FilmRecord,
    /// Fused score (higher is better).
    pub score: f32,
    /// Cosine similarity to the query embedding.
    pub vector_score: f32,
    /// BM25 score against the film's content fields.
    pub lexical_score: f32,
}

/// Summary information about an indexed film.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilmSummary {
    pub source: String,
    pub title: String,
    pub release_date: String,
    pub runtime: u32,
    pub indexed_at: DateTime<Utc>,
}

impl From<&FilmRecord> for FilmSummary {
    fn from(film: &FilmRecord) -> Self {
        Self {
            source: film.source.clone(),
            title: film.title.clone(),
            release_date: film.release_date.clone(),
            runtime: film.runtime,
            indexed_at: film.indexed_at,
        }
    }
}

/// Trait for film store implementations.
///
/// Implementations are shared across concurrent requests and must be
/// safe to query through `&self`.
#[async_trait]
pub trait FilmStore: Send + Sync {
    /// Insert or replace a film, keyed by `source`. A replaced film keeps
    /// its original insertion position.
    async fn upsert(&self, film: &FilmRecord) -> Result<()>;

    /// Bulk upsert films.
    async fn upsert_batch(&self, films: &[FilmRecord]) -> Result<usize>;

    /// Hybrid search; results are ordered by descending fused score, ties
    /// broken by insertion order.
    async fn hybrid_search(&self, query: &HybridQuery<'_>) -> Result<Vec<ScoredFilm>>;

    /// List all indexed films in insertion order.
    async fn list_films(&self) -> Result<Vec<FilmSummary>>;

    /// Get a film by its source reference.
    async fn get_film(&self, source: &str) -> Result<Option<FilmRecord>>;

    /// Get total film count.
    async fn film_count(&self) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
