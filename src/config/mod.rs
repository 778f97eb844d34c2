//! Configuration module for filmsearch.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    EmbeddingSettings, GeneralSettings, GenerationSettings, OpenAISettings, RetrievalSettings,
    ServerSettings, Settings, StoreSettings,
};
