//! Streaming answer generation.
//!
//! A [`CompletionModel`] turns a prompt into a lazy stream of fragments.
//! [`CompletionEngine`] wraps any model with the per-fragment timeout and
//! makes the stream end at the first error. Fragments already delivered
//! before an error are never retracted; callers must treat an error after
//! partial output as an incomplete answer.

use super::prompt::Prompt;
use crate::error::{FilmSearchError, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Output channel a fragment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Final answer text for the user.
    Answer,
    /// Echo of the context given to the model.
    Context,
    /// Reference to a retrieved source.
    Reference,
}

/// One incremental piece of output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fragment {
    pub channel: Channel,
    pub text: String,
}

impl Fragment {
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            channel: Channel::Answer,
            text: text.into(),
        }
    }

    pub fn context(text: impl Into<String>) -> Self {
        Self {
            channel: Channel::Context,
            text: text.into(),
        }
    }

    pub fn reference(text: impl Into<String>) -> Self {
        Self {
            channel: Channel::Reference,
            text: text.into(),
        }
    }
}

/// Lazy, finite, ordered stream of fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment>> + Send>>;

/// A language model that streams its completion.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Start generating for a prompt. Errors before the first fragment are
    /// returned here; later errors arrive through the stream.
    async fn stream(&self, prompt: &Prompt) -> Result<FragmentStream>;

    /// Model identifier for logs.
    fn model_name(&self) -> &str;
}

/// OpenAI chat-completions model with streaming enabled.
pub struct OpenAICompletionModel {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAICompletionModel {
    /// Create a model on a shared client. Temperature defaults to 0.
    pub fn new(client: Client<OpenAIConfig>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature: 0.0,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn messages(prompt: &Prompt) -> Result<Vec<ChatCompletionRequestMessage>> {
        let build_err = |e: async_openai::error::OpenAIError| FilmSearchError::Generation(e.to_string());

        Ok(vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(prompt.system.clone())
                .build()
                .map_err(build_err)?
                .into(),
            ChatCompletionRequestSystemMessageArgs::default()
                .content(prompt.context_message())
                .build()
                .map_err(build_err)?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.question.clone())
                .build()
                .map_err(build_err)?
                .into(),
        ])
    }
}

#[async_trait]
impl CompletionModel for OpenAICompletionModel {
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn stream(&self, prompt: &Prompt) -> Result<FragmentStream> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(Self::messages(prompt)?)
            .temperature(self.temperature)
            .stream(true)
            .build()
            .map_err(|e| FilmSearchError::Generation(e.to_string()))?;

        let mut response = self.client.chat().create_stream(request).await.map_err(|e| {
            FilmSearchError::Generation(format!("Failed to start completion: {}", e))
        })?;

        let stream = async_stream::stream! {
            while let Some(item) = response.next().await {
                match item {
                    Ok(chunk) => {
                        for choice in chunk.choices {
                            if let Some(text) = choice.delta.content {
                                if !text.is_empty() {
                                    yield Ok(Fragment::answer(text));
                                }
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(FilmSearchError::Generation(format!("Completion stream failed: {}", e)));
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Runs a completion model for one prompt at a time.
#[derive(Clone)]
pub struct CompletionEngine {
    model: Arc<dyn CompletionModel>,
    fragment_timeout: Option<Duration>,
}

impl CompletionEngine {
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self {
            model,
            fragment_timeout: None,
        }
    }

    /// Fail the stream when starting it, or waiting for any one fragment,
    /// takes longer than `timeout`.
    pub fn with_fragment_timeout(mut self, timeout: Duration) -> Self {
        self.fragment_timeout = Some(timeout);
        self
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Generate for a prompt. Single attempt; no retry.
    ///
    /// The returned stream yields fragments in generation order and ends
    /// after the model finishes or after the first `Generation` error.
    pub async fn generate(&self, prompt: &Prompt) -> Result<FragmentStream> {
        let started = self.model.stream(prompt);
        let mut inner = match self.fragment_timeout {
            Some(limit) => tokio::time::timeout(limit, started)
                .await
                .map_err(|_| {
                    FilmSearchError::Generation(format!(
                        "Model did not respond within {:?}",
                        limit
                    ))
                })?
                .map_err(as_generation)?,
            None => started.await.map_err(as_generation)?,
        };

        let timeout = self.fragment_timeout;
        let model = self.model.model_name().to_string();

        let stream = async_stream::stream! {
            let mut delivered = 0usize;
            loop {
                let next = match timeout {
                    Some(limit) => match tokio::time::timeout(limit, inner.next()).await {
                        Ok(next) => next,
                        Err(_) => {
                            warn!(model = %model, delivered, "Completion stalled for {:?}", limit);
                            yield Err(FilmSearchError::Generation(format!(
                                "No output from model within {:?}",
                                limit
                            )));
                            break;
                        }
                    },
                    None => inner.next().await,
                };

                match next {
                    Some(Ok(fragment)) => {
                        if delivered == 0 {
                            debug!(model = %model, "First fragment received");
                        }
                        delivered += 1;
                        yield Ok(fragment);
                    }
                    Some(Err(e)) => {
                        warn!(model = %model, delivered, "Completion failed: {}", e);
                        yield Err(as_generation(e));
                        break;
                    }
                    None => {
                        info!(model = %model, fragments = delivered, "Completion finished");
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

fn as_generation(e: FilmSearchError) -> FilmSearchError {
    match e {
        FilmSearchError::Generation(_) => e,
        other => FilmSearchError::Generation(other.to_string()),
    }
}
