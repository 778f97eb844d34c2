//! Film retrieval: embeds the query and runs a hybrid search.

use super::{ContextEntry, RetrievedContext};
use crate::embedding::Embedder;
use crate::error::{FilmSearchError, Result};
use crate::store::{FilmStore, FusionPolicy, HybridQuery};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Retrieves ranked films for a query from the shared film store.
pub struct Retriever {
    store: Arc<dyn FilmStore>,
    embedder: Arc<dyn Embedder>,
    k: usize,
    min_vector_score: f32,
    fusion: FusionPolicy,
    timeout: Option<Duration>,
}

impl Retriever {
    /// Create a new retriever.
    pub fn new(store: Arc<dyn FilmStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            k: 10,
            min_vector_score: 0.2,
            fusion: FusionPolicy::default(),
            timeout: None,
        }
    }

    /// Set the default number of films to retrieve.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Set the cosine threshold below which films need a lexical match.
    pub fn with_min_vector_score(mut self, min_vector_score: f32) -> Self {
        self.min_vector_score = min_vector_score;
        self
    }

    /// Set the score fusion policy.
    pub fn with_fusion(mut self, fusion: FusionPolicy) -> Self {
        self.fusion = fusion;
        self
    }

    /// Bound embedding plus search by a timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Default number of films per query.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Retrieve at most `k` films, ordered by descending score.
    ///
    /// Fails with `Embedding` when the query cannot be embedded and with
    /// `RetrievalUnavailable` when the store cannot be searched or the
    /// timeout expires. An empty result is `Ok`.
    #[instrument(skip(self))]
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievedContext> {
        if query.trim().is_empty() {
            return Err(FilmSearchError::InvalidInput(
                "Query must not be empty".to_string(),
            ));
        }
        if k == 0 {
            return Err(FilmSearchError::InvalidInput(
                "k must be a positive integer".to_string(),
            ));
        }

        let context = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.retrieve_inner(query, k))
                .await
                .map_err(|_| {
                    FilmSearchError::RetrievalUnavailable(format!(
                        "Retrieval timed out after {:?}",
                        limit
                    ))
                })??,
            None => self.retrieve_inner(query, k).await?,
        };

        info!("Retrieved {} films", context.len());
        Ok(context)
    }

    async fn retrieve_inner(&self, query: &str, k: usize) -> Result<RetrievedContext> {
        let embedding = self.embedder.embed(query).await.map_err(|e| match e {
            FilmSearchError::Embedding(_) => e,
            other => FilmSearchError::Embedding(other.to_string()),
        })?;

        let results = self
            .store
            .hybrid_search(&HybridQuery {
                text: query,
                embedding: &embedding,
                limit: k,
                min_vector_score: self.min_vector_score,
                fusion: self.fusion,
            })
            .await
            .map_err(|e| match e {
                FilmSearchError::RetrievalUnavailable(_) => e,
                other => FilmSearchError::RetrievalUnavailable(other.to_string()),
            })?;

        debug!("Hybrid search returned {} results", results.len());
        for result in &results {
            debug!(
                title = %result.film.title,
                score = result.score,
                vector = result.vector_score,
                lexical = result.lexical_score,
                "Ranked film"
            );
        }

        let mut entries: Vec<ContextEntry> = results.into_iter().map(ContextEntry::from).collect();
        entries.truncate(k);
        Ok(RetrievedContext::new(entries))
    }
}
