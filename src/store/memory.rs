//! In-memory film store implementation.
//!
//! Useful for testing and small catalogs.

use super::{hybrid, FilmStore, FilmSummary, HybridQuery, ScoredFilm};
use crate::error::{FilmSearchError, Result};
use crate::film::FilmRecord;
use async_trait::async_trait;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory film store. Films are kept in insertion order.
pub struct MemoryFilmStore {
    films: RwLock<Vec<FilmRecord>>,
}

impl MemoryFilmStore {
    /// Create a new in-memory film store.
    pub fn new() -> Self {
        Self {
            films: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<FilmRecord>>> {
        self.films
            .read()
            .map_err(|e| FilmSearchError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<FilmRecord>>> {
        self.films
            .write()
            .map_err(|e| FilmSearchError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn insert(films: &mut Vec<FilmRecord>, film: &FilmRecord) {
        match films.iter_mut().find(|f| f.source == film.source) {
            Some(existing) => *existing = film.clone(),
            None => films.push(film.clone()),
        }
    }
}

impl Default for MemoryFilmStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FilmStore for MemoryFilmStore {
    async fn upsert(&self, film: &FilmRecord) -> Result<()> {
        let mut films = self.write()?;
        Self::insert(&mut films, film);
        Ok(())
    }

    async fn upsert_batch(&self, batch: &[FilmRecord]) -> Result<usize> {
        let mut films = self.write()?;
        for film in batch {
            Self::insert(&mut films, film);
        }
        Ok(batch.len())
    }

    async fn hybrid_search(&self, query: &HybridQuery<'_>) -> Result<Vec<ScoredFilm>> {
        let films = self.read()?.clone();
        Ok(hybrid::rank(films, query))
    }

    async fn list_films(&self) -> Result<Vec<FilmSummary>> {
        Ok(self.read()?.iter().map(FilmSummary::from).collect())
    }

    async fn get_film(&self, source: &str) -> Result<Option<FilmRecord>> {
        Ok(self.read()?.iter().find(|f| f.source == source).cloned())
    }

    async fn film_count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }
}
