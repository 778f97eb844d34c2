//! The recommendation pipeline: retrieve, assemble, generate, route.

use super::completion::{CompletionEngine, Fragment, FragmentStream};
use super::context::split_context;
use super::prompt::PromptAssembler;
use super::retriever::Retriever;
use super::router::{route, AnswerStream};
use crate::error::Result;
use futures::StreamExt;
use tracing::{info, instrument};

/// Answers film recommendation questions from the catalog.
///
/// Stages run strictly in order for each request; the only state shared
/// between requests is the read-only store behind the retriever.
pub struct FilmSearch {
    retriever: Retriever,
    assembler: PromptAssembler,
    engine: CompletionEngine,
}

impl FilmSearch {
    pub fn new(retriever: Retriever, engine: CompletionEngine) -> Self {
        Self {
            retriever,
            assembler: PromptAssembler::default(),
            engine,
        }
    }

    pub fn with_assembler(mut self, assembler: PromptAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn model_name(&self) -> &str {
        self.engine.model_name()
    }

    /// Answer a question with the retriever's default `k`.
    pub async fn ask(&self, query: &str) -> Result<AnswerStream> {
        self.ask_with_k(query, self.retriever.k()).await
    }

    /// Answer a question, yielding answer text as it is generated.
    ///
    /// Retrieval and embedding errors are returned before anything is
    /// generated. A generation error may arrive after some text.
    pub async fn ask_with_k(&self, query: &str, k: usize) -> Result<AnswerStream> {
        Ok(route(self.ask_raw(query, k).await?))
    }

    /// Like [`ask_with_k`](Self::ask_with_k), but yields every channel:
    /// the context block and one reference per film precede the answer.
    #[instrument(skip(self), fields(model = %self.engine.model_name()))]
    pub async fn ask_raw(&self, query: &str, k: usize) -> Result<FragmentStream> {
        let context = self.retriever.retrieve(query, k).await?;
        if context.is_empty() {
            info!("No films matched, generating with an empty context");
        }

        let prompt = self.assembler.build(&context, query);
        let answer = self.engine.generate(&prompt).await?;

        let mut preamble: Vec<Result<Fragment>> = Vec::new();
        if !prompt.has_no_matches() {
            let kept = split_context(&prompt.context).len();
            preamble.push(Ok(Fragment::context(prompt.context.clone())));
            preamble.extend(
                context
                    .entries()
                    .iter()
                    .take(kept)
                    .map(|entry| Ok(Fragment::reference(entry.metadata.source.clone()))),
            );
        }

        Ok(Box::pin(futures::stream::iter(preamble).chain(answer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilmSearchError;
    use crate::rag::{Channel, CompletionModel};
    use crate::store::MemoryFilmStore;
    use crate::testing::{
        catalog_films, catalog_store, CatalogModel, FailingStore, KeywordEmbedder, ScriptedModel,
        NO_MATCH_ANSWER,
    };
    use std::sync::Arc;

    async fn film_search(model: Arc<dyn CompletionModel>) -> FilmSearch {
        let embedder = Arc::new(KeywordEmbedder::default());
        let store = catalog_store(embedder.as_ref()).await;
        FilmSearch::new(Retriever::new(store, embedder), CompletionEngine::new(model))
    }

    async fn answer(search: &FilmSearch, query: &str) -> String {
        search
            .ask(query)
            .await
            .unwrap()
            .map(|r| r.unwrap())
            .collect::<Vec<_>>()
            .await
            .concat()
    }

    #[tokio::test]
    async fn test_pets_query_recommends_catalog_film_with_runtime() {
        let search = film_search(Arc::new(CatalogModel)).await;
        let text = answer(
            &search,
            "Find me drama movies in English that are less than 2 hours long and feature pets",
        )
        .await;

        assert!(text.contains("Hachi: A Dog's Tale"));
        assert!(text.contains("Runtime: 93 minutes"));
        assert!(text.contains("Source: https://www.themoviedb.org/movie/28178"));
    }

    #[tokio::test]
    async fn test_unmatched_query_still_generates_without_titles() {
        let model = Arc::new(CatalogModel);
        let search = film_search(model).await;
        let text = answer(&search, "zzzqqq nonexistent film xyz").await;

        assert_eq!(text, NO_MATCH_ANSWER);
        for film in catalog_films() {
            assert!(!text.contains(&film.title));
        }
    }

    #[tokio::test]
    async fn test_empty_context_reaches_model_as_no_matches() {
        let model = Arc::new(ScriptedModel::new(&["Nothing matched."]));
        let search = film_search(model.clone()).await;
        let _ = answer(&search, "zzzqqq nonexistent film xyz").await;

        let prompts = model.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].has_no_matches());
        assert_eq!(prompts[0].question, "zzzqqq nonexistent film xyz");
    }

    #[tokio::test]
    async fn test_generation_error_after_partial_answer() {
        let model = ScriptedModel::new(&["Try ", "Hachi", " tonight", ".", "!"]).failing_after(2);
        let search = film_search(Arc::new(model)).await;

        let items: Vec<Result<String>> = search.ask("dog drama").await.unwrap().collect().await;
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap(), "Try ");
        assert_eq!(items[1].as_ref().unwrap(), "Hachi");
        assert!(matches!(items[2], Err(FilmSearchError::Generation(_))));
    }

    #[tokio::test]
    async fn test_retrieval_failure_skips_generation() {
        let model = Arc::new(ScriptedModel::new(&["unused"]));
        let search = FilmSearch::new(
            Retriever::new(Arc::new(FailingStore), Arc::new(KeywordEmbedder::default())),
            CompletionEngine::new(model.clone()),
        );

        let result = search.ask("dog drama").await;
        assert!(matches!(result, Err(FilmSearchError::RetrievalUnavailable(_))));
        assert!(model.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_raw_stream_carries_context_and_references_first() {
        let model = ScriptedModel::from_fragments(vec![
            Fragment::context("model echo"),
            Fragment::answer("Hachi."),
        ]);
        let search = film_search(Arc::new(model)).await;

        let raw: Vec<Fragment> = search
            .ask_raw("pets", 3)
            .await
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
            .await;

        assert_eq!(raw[0].channel, Channel::Context);
        assert!(raw[0].text.starts_with("Title: Hachi: A Dog's Tale"));
        assert_eq!(raw[1], Fragment::reference("https://www.themoviedb.org/movie/28178"));
        assert_eq!(raw.last().unwrap(), &Fragment::answer("Hachi."));

        let routed: Vec<String> = search
            .ask_with_k("pets", 3)
            .await
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(routed, vec!["Hachi."]);
    }

    #[tokio::test]
    async fn test_empty_store_is_a_no_match_answer() {
        let embedder = Arc::new(KeywordEmbedder::default());
        let search = FilmSearch::new(
            Retriever::new(Arc::new(MemoryFilmStore::new()), embedder),
            CompletionEngine::new(Arc::new(CatalogModel)),
        );
        assert_eq!(answer(&search, "dog drama").await, NO_MATCH_ANSWER);
    }
}
