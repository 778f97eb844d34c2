//! Offline doubles for the embedding service, film store and language model.

use crate::embedding::Embedder;
use crate::error::{FilmSearchError, Result};
use crate::film::{FilmInput, FilmRecord};
use crate::rag::{split_context, CompletionModel, Fragment, FragmentStream, Prompt};
use crate::store::{hybrid, FilmStore, FilmSummary, HybridQuery, MemoryFilmStore, ScoredFilm};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const VOCABULARY: &[&str] = &[
    "drama", "comedy", "horror", "family", "crime", "action", "dog", "pets", "zombie", "mafia",
    "bear", "loyalty",
];

/// Bag-of-words embedder over a tiny fixed vocabulary.
#[derive(Default)]
pub struct KeywordEmbedder {
    delay: Option<Duration>,
}

impl KeywordEmbedder {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn vector(text: &str) -> Vec<f32> {
        let tokens = hybrid::tokenize(text);
        VOCABULARY
            .iter()
            .map(|word| tokens.iter().filter(|t| t == word).count() as f32)
            .collect()
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(Self::vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        VOCABULARY.len()
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(FilmSearchError::Embedding("service unreachable".to_string()))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(FilmSearchError::Embedding("service unreachable".to_string()))
    }

    fn dimensions(&self) -> usize {
        VOCABULARY.len()
    }
}

pub struct FailingStore;

fn store_down() -> FilmSearchError {
    FilmSearchError::VectorStore("connection refused".to_string())
}

#[async_trait]
impl FilmStore for FailingStore {
    async fn upsert(&self, _film: &FilmRecord) -> Result<()> {
        Err(store_down())
    }

    async fn upsert_batch(&self, _films: &[FilmRecord]) -> Result<usize> {
        Err(store_down())
    }

    async fn hybrid_search(&self, _query: &HybridQuery<'_>) -> Result<Vec<ScoredFilm>> {
        Err(store_down())
    }

    async fn list_films(&self) -> Result<Vec<FilmSummary>> {
        Err(store_down())
    }

    async fn get_film(&self, _source: &str) -> Result<Option<FilmRecord>> {
        Err(store_down())
    }

    async fn film_count(&self) -> Result<usize> {
        Err(store_down())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// A small catalog. No film's content mentions "zzzqqq", "nonexistent" or
/// "xyz".
pub fn catalog_films() -> Vec<FilmInput> {
    vec![
        FilmInput {
            source: "https://www.themoviedb.org/movie/28178".to_string(),
            title: "Hachi: A Dog's Tale".to_string(),
            overview: "A college professor takes in an abandoned dog, and the bond between them outlasts everything.".to_string(),
            release_date: "2009-06-13".to_string(),
            runtime: 93,
            original_language: "en".to_string(),
            keywords: strings(&["dog", "pets", "loyalty"]),
            genres: strings(&["Drama", "Family"]),
            actors: strings(&["Richard Gere", "Joan Allen"]),
            directors: strings(&["Lasse Hallström"]),
            production_companies: strings(&["Stage 6"]),
        },
        FilmInput {
            source: "https://www.themoviedb.org/movie/747".to_string(),
            title: "Shaun of the Dead".to_string(),
            overview: "Shaun is a slacker whose mundane life is turned upside down when a zombie outbreak hits London, so he takes shelter at his local pub.".to_string(),
            release_date: "2004-04-09".to_string(),
            runtime: 99,
            original_language: "en".to_string(),
            keywords: strings(&["zombie", "pub"]),
            genres: strings(&["Comedy", "Horror"]),
            actors: strings(&["Simon Pegg", "Nick Frost"]),
            directors: strings(&["Edgar Wright"]),
            production_companies: strings(&["Working Title"]),
        },
        FilmInput {
            source: "https://www.themoviedb.org/movie/398978".to_string(),
            title: "The Irishman".to_string(),
            overview: "A hitman looks back on decades of service to a mafia family boss.".to_string(),
            release_date: "2019-11-01".to_string(),
            runtime: 209,
            original_language: "en".to_string(),
            keywords: strings(&["mafia"]),
            genres: strings(&["Crime", "Drama"]),
            actors: strings(&["Robert De Niro", "Al Pacino"]),
            directors: strings(&["Martin Scorsese"]),
            production_companies: strings(&["Tribeca Productions"]),
        },
        FilmInput {
            source: "https://www.themoviedb.org/movie/19908".to_string(),
            title: "Zombieland".to_string(),
            overview: "Columbus has made a habit of running from what scares him. Teaming up with trigger-happy Tallahassee and two sisters, he crosses a country overrun by the undead on a long road trip toward an amusement park rumored to be safe.".to_string(),
            release_date: "2009-10-02".to_string(),
            runtime: 88,
            original_language: "en".to_string(),
            keywords: strings(&["zombie", "road trip"]),
            genres: strings(&["Action", "Comedy", "Horror"]),
            actors: strings(&["Jesse Eisenberg", "Woody Harrelson"]),
            directors: strings(&["Ruben Fleischer"]),
            production_companies: strings(&["Columbia Pictures"]),
        },
        FilmInput {
            source: "https://www.themoviedb.org/movie/346648".to_string(),
            title: "Paddington 2".to_string(),
            overview: "Paddington picks up odd jobs to buy a birthday present for his aunt, until the present is stolen.".to_string(),
            release_date: "2017-11-09".to_string(),
            runtime: 103,
            original_language: "en".to_string(),
            keywords: strings(&["bear"]),
            genres: strings(&["Comedy", "Family"]),
            actors: strings(&["Ben Whishaw", "Hugh Grant"]),
            directors: strings(&["Paul King"]),
            production_companies: strings(&["StudioCanal"]),
        },
    ]
}

/// In-memory store loaded with [`catalog_films`].
pub async fn catalog_store(embedder: &dyn Embedder) -> Arc<dyn FilmStore> {
    let mut records: Vec<FilmRecord> = catalog_films()
        .into_iter()
        .map(|film| film.into_record(Vec::new()))
        .collect();
    let texts: Vec<String> = records.iter().map(FilmRecord::render_text).collect();
    let embeddings = embedder.embed_batch(&texts).await.expect("embed catalog");
    for (record, embedding) in records.iter_mut().zip(embeddings) {
        record.embedding = embedding;
    }

    let store = MemoryFilmStore::new();
    store.upsert_batch(&records).await.expect("load catalog");
    Arc::new(store)
}

/// Model that replays a fixed list of fragments.
pub struct ScriptedModel {
    fragments: Vec<Fragment>,
    fail_after: Option<usize>,
    fail_on_start: bool,
    delay_after: Option<(usize, Duration)>,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedModel {
    pub fn new(answers: &[&str]) -> Self {
        Self::from_fragments(answers.iter().map(|a| Fragment::answer(*a)).collect())
    }

    pub fn from_fragments(fragments: Vec<Fragment>) -> Self {
        Self {
            fragments,
            fail_after: None,
            fail_on_start: false,
            delay_after: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Emit `count` fragments, then fail.
    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    pub fn failing_on_start(mut self) -> Self {
        self.fail_on_start = true;
        self
    }

    /// Sleep before emitting fragment `index`.
    pub fn with_delay_after(mut self, index: usize, delay: Duration) -> Self {
        self.delay_after = Some((index, delay));
        self
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().expect("prompts lock").clone()
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn stream(&self, prompt: &Prompt) -> Result<FragmentStream> {
        self.prompts.lock().expect("prompts lock").push(prompt.clone());
        if self.fail_on_start {
            return Err(FilmSearchError::Generation("model overloaded".to_string()));
        }

        let fragments = self.fragments.clone();
        let fail_after = self.fail_after;
        let delay_after = self.delay_after;

        let stream = async_stream::stream! {
            for (index, fragment) in fragments.into_iter().enumerate() {
                if fail_after == Some(index) {
                    yield Err(FilmSearchError::Generation("connection reset".to_string()));
                    break;
                }
                if let Some((at, delay)) = delay_after {
                    if at == index {
                        tokio::time::sleep(delay).await;
                    }
                }
                yield Ok(fragment);
            }
        };

        Ok(Box::pin(stream))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Model that recommends every film in its context using the output
/// template, or reports that nothing matched.
pub struct CatalogModel;

pub const NO_MATCH_ANSWER: &str = "I could not find anything in the catalog that matches your request.";

#[async_trait]
impl CompletionModel for CatalogModel {
    async fn stream(&self, prompt: &Prompt) -> Result<FragmentStream> {
        let mut fragments = Vec::new();

        if prompt.has_no_matches() {
            fragments.push(Ok(Fragment::answer(NO_MATCH_ANSWER)));
        } else {
            for entry in split_context(&prompt.context).into_iter().take(5) {
                let field = |label: &str| {
                    entry
                        .lines()
                        .find_map(|line| line.strip_prefix(label))
                        .unwrap_or_default()
                        .to_string()
                };
                fragments.push(Ok(Fragment::answer(format!("- {}:\n", field("Title: ")))));
                fragments.push(Ok(Fragment::answer(format!(
                    "    - Runtime: {}\n",
                    field("Runtime: ")
                ))));
                fragments.push(Ok(Fragment::answer(format!(
                    "    - Release Date: {}\n",
                    field("Release Date: ")
                ))));
                fragments.push(Ok(Fragment::answer(
                    "    - Recommendation: It fits what you asked for.\n".to_string(),
                )));
                fragments.push(Ok(Fragment::answer(format!(
                    "    - Source: {}\n",
                    field("Source: ")
                ))));
            }
        }

        Ok(Box::pin(futures::stream::iter(fragments)))
    }

    fn model_name(&self) -> &str {
        "catalog"
    }
}
