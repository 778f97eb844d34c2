//! Component wiring for filmsearch.
//!
//! Builds the shared OpenAI client, embedder and film store once from the
//! settings, and hands out pipelines and the catalog importer on top.

use crate::config::Settings;
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{FilmSearchError, Result};
use crate::film::{FilmInput, FilmRecord};
use crate::openai::create_client_from_settings;
use crate::rag::{
    CompletionEngine, FilmSearch, OpenAICompletionModel, PromptAssembler, Retriever,
};
use crate::store::{FilmStore, MemoryFilmStore, SqliteFilmStore};
use async_openai::config::OpenAIConfig;
use async_openai::Client;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Films embedded and stored per import round.
const IMPORT_BATCH_SIZE: usize = 100;

/// Owns the long-lived components shared by every request.
pub struct Orchestrator {
    settings: Settings,
    client: Client<OpenAIConfig>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn FilmStore>,
}

impl Orchestrator {
    /// Create an orchestrator from settings.
    pub fn new(settings: Settings) -> Result<Self> {
        let client = create_client_from_settings(&settings.openai)?;

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::new(
            client.clone(),
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        ));

        let store: Arc<dyn FilmStore> = match settings.store.provider.to_lowercase().as_str() {
            "sqlite" => Arc::new(SqliteFilmStore::new(&settings.sqlite_path())?),
            "memory" => {
                warn!("Using in-memory film store; the catalog is lost on exit");
                Arc::new(MemoryFilmStore::new())
            }
            other => {
                return Err(FilmSearchError::Config(format!(
                    "Unknown store provider: {} (expected sqlite or memory)",
                    other
                )))
            }
        };

        Ok(Self {
            settings,
            client,
            embedder,
            store,
        })
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn FilmStore>,
    ) -> Result<Self> {
        let client = create_client_from_settings(&settings.openai)?;
        Ok(Self {
            settings,
            client,
            embedder,
            store,
        })
    }

    pub fn store(&self) -> Arc<dyn FilmStore> {
        self.store.clone()
    }

    /// Build a retriever configured from `[retrieval]`.
    pub fn retriever(&self) -> Result<Retriever> {
        let retrieval = &self.settings.retrieval;
        Ok(Retriever::new(self.store.clone(), self.embedder.clone())
            .with_k(retrieval.k)
            .with_min_vector_score(retrieval.min_vector_score)
            .with_fusion(retrieval.fusion_policy()?)
            .with_timeout(retrieval.timeout()))
    }

    /// Build the full recommendation pipeline, optionally overriding the
    /// generation model.
    pub fn film_search(&self, model: Option<&str>) -> Result<FilmSearch> {
        let generation = &self.settings.generation;
        let model_name = model.unwrap_or(&generation.model);

        let completion = OpenAICompletionModel::new(self.client.clone(), model_name)
            .with_temperature(generation.temperature);
        let engine = CompletionEngine::new(Arc::new(completion))
            .with_fragment_timeout(generation.timeout());

        Ok(FilmSearch::new(self.retriever()?, engine)
            .with_assembler(PromptAssembler::new(generation.max_context_tokens)))
    }

    /// Import films, reporting `(done, total)` after each batch.
    ///
    /// Films without a source or title are skipped. Re-imported films keep
    /// their original position in the catalog.
    #[instrument(skip(self, films, on_batch), fields(films = films.len()))]
    pub async fn import_films<F>(&self, films: Vec<FilmInput>, on_batch: F) -> Result<ImportResult>
    where
        F: Fn(usize, usize),
    {
        let total = films.len();
        let (valid, skipped): (Vec<FilmInput>, Vec<FilmInput>) = films
            .into_iter()
            .partition(|f| !f.source.trim().is_empty() && !f.title.trim().is_empty());

        for film in &skipped {
            warn!(title = %film.title, source = %film.source, "Skipping film without source or title");
        }

        let mut imported = 0;
        let mut valid = valid.into_iter().peekable();
        while valid.peek().is_some() {
            let mut records: Vec<FilmRecord> = valid
                .by_ref()
                .take(IMPORT_BATCH_SIZE)
                .map(|film| film.into_record(Vec::new()))
                .collect();

            // Embed the normalized rendering, the same text retrieval shows.
            let texts: Vec<String> = records.iter().map(FilmRecord::render_text).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;
            if embeddings.len() != records.len() {
                return Err(FilmSearchError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    records.len(),
                    embeddings.len()
                )));
            }
            for (record, embedding) in records.iter_mut().zip(embeddings) {
                record.embedding = embedding;
            }

            imported += self.store.upsert_batch(&records).await?;
            on_batch(imported + skipped.len(), total);
        }

        info!("Imported {} films ({} skipped)", imported, skipped.len());
        Ok(ImportResult {
            imported,
            skipped: skipped.len(),
        })
    }
}

/// Read a JSON array of films.
pub fn load_films(path: &Path) -> Result<Vec<FilmInput>> {
    let content = std::fs::read_to_string(path)?;
    let films: Vec<FilmInput> = serde_json::from_str(&content)?;
    Ok(films)
}

/// Result of a catalog import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportResult {
    /// Films written to the store.
    pub imported: usize,
    /// Films rejected for a missing source or title.
    pub skipped: usize,
}
