//! Film records as stored in the catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A film in the catalog, with its precomputed embedding.
///
/// Records are written by the importer and never modified by the query
/// pipeline. `source` is the citation reference and the upsert key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilmRecord {
    pub source: String,
    pub title: String,
    pub overview: String,
    /// ISO-like release date (e.g. "2023-07-21").
    pub release_date: String,
    /// Runtime in minutes.
    pub runtime: u32,
    /// Original language code (e.g. "en").
    pub language: String,
    pub keywords: Vec<String>,
    pub genres: Vec<String>,
    pub actors: Vec<String>,
    pub directors: Vec<String>,
    pub companies: Vec<String>,
    pub embedding: Vec<f32>,
    pub indexed_at: DateTime<Utc>,
}

/// A normalized film as accepted by the importer, before embedding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilmInput {
    pub source: String,
    pub title: String,
    pub overview: String,
    pub release_date: String,
    pub runtime: u32,
    #[serde(alias = "language")]
    pub original_language: String,
    pub keywords: Vec<String>,
    pub genres: Vec<String>,
    pub actors: Vec<String>,
    pub directors: Vec<String>,
    #[serde(alias = "companies")]
    pub production_companies: Vec<String>,
}

impl FilmInput {
    /// Normalize into a storable record. List fields lose duplicates.
    pub fn into_record(self, embedding: Vec<f32>) -> FilmRecord {
        FilmRecord {
            source: self.source,
            title: self.title,
            overview: self.overview,
            release_date: self.release_date,
            runtime: self.runtime,
            language: self.original_language,
            keywords: dedup(self.keywords),
            genres: dedup(self.genres),
            actors: dedup(self.actors),
            directors: dedup(self.directors),
            companies: dedup(self.production_companies),
            embedding,
            indexed_at: Utc::now(),
        }
    }
}

impl FilmRecord {
    /// Denormalized text rendering: the film's entry in the prompt context
    /// and the text its embedding is computed from.
    ///
    /// The rendering never contains a blank line, so entries joined with a
    /// blank line can be split apart again.
    pub fn render_text(&self) -> String {
        [
            format!("Title: {}", single_line(&self.title)),
            format!("Overview: {}", single_line(&self.overview)),
            format!("Release Date: {}", single_line(&self.release_date)),
            format!("Runtime: {} minutes", self.runtime),
            format!("Language: {}", single_line(&self.language)),
            format!("Keywords: {}", join_list(&self.keywords)),
            format!("Genres: {}", join_list(&self.genres)),
            format!("Actors: {}", join_list(&self.actors)),
            format!("Directors: {}", join_list(&self.directors)),
            format!("Production Companies: {}", join_list(&self.companies)),
            format!("Source: {}", single_line(&self.source)),
        ]
        .join("\n")
    }

    /// Content fields only, for lexical matching. No field labels and no
    /// source URL.
    pub fn search_text(&self) -> String {
        let mut parts = vec![
            single_line(&self.title),
            single_line(&self.overview),
            join_list(&self.keywords),
            join_list(&self.genres),
            join_list(&self.actors),
            join_list(&self.directors),
            join_list(&self.companies),
            single_line(&self.language),
            single_line(&self.release_date),
        ];
        if self.runtime > 0 {
            parts.push(self.runtime.to_string());
        }
        parts.retain(|p| !p.is_empty());
        parts.join("\n")
    }
}

/// Join list values with ", ", skipping blanks.
pub fn join_list(items: &[String]) -> String {
    items
        .iter()
        .map(|s| single_line(s))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Collapse all whitespace runs (including newlines) to single spaces.
fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn dedup(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
