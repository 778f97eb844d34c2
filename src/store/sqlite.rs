//! SQLite-based film store implementation.
//!
//! Films live in one table; the hybrid ranking (cosine + BM25) is computed
//! in Rust over the stored rows. That is fine for catalogs of a few
//! thousand films; larger catalogs want sqlite-vec or a dedicated index.

use super::{hybrid, FilmStore, FilmSummary, HybridQuery, ScoredFilm};
use crate::error::{FilmSearchError, Result};
use crate::film::FilmRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS films (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        source TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        overview TEXT NOT NULL,
        release_date TEXT NOT NULL,
        runtime INTEGER NOT NULL,
        language TEXT NOT NULL,
        keywords TEXT NOT NULL,
        genres TEXT NOT NULL,
        actors TEXT NOT NULL,
        directors TEXT NOT NULL,
        companies TEXT NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL
    );
"#;

const SELECT_FILMS: &str = r#"
    SELECT source, title, overview, release_date, runtime, language,
           keywords, genres, actors, directors, companies, embedding, indexed_at
    FROM films
"#;

/// `seq` is kept on conflict, so a re-imported film keeps its tie-break position.
const UPSERT_FILM: &str = r#"
    INSERT INTO films
    (source, title, overview, release_date, runtime, language,
     keywords, genres, actors, directors, companies, embedding, indexed_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
    ON CONFLICT(source) DO UPDATE SET
        title = excluded.title,
        overview = excluded.overview,
        release_date = excluded.release_date,
        runtime = excluded.runtime,
        language = excluded.language,
        keywords = excluded.keywords,
        genres = excluded.genres,
        actors = excluded.actors,
        directors = excluded.directors,
        companies = excluded.companies,
        embedding = excluded.embedding,
        indexed_at = excluded.indexed_at
"#;

/// SQLite-based film store.
pub struct SqliteFilmStore {
    conn: Mutex<Connection>,
}

impl SqliteFilmStore {
    /// Open (or create) a film store at the given path.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).map_err(|e| {
            FilmSearchError::RetrievalUnavailable(format!("Cannot open {:?}: {}", path, e))
        })?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite film store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite film store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| FilmSearchError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn list_to_json(items: &[String]) -> Result<String> {
        Ok(serde_json::to_string(items)?)
    }

    fn json_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
        let raw: String = row.get(idx)?;
        serde_json::from_str(&raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    fn film_from_row(row: &Row<'_>) -> rusqlite::Result<FilmRecord> {
        let embedding_bytes: Vec<u8> = row.get(11)?;
        let indexed_at_str: String = row.get(12)?;

        Ok(FilmRecord {
            source: row.get(0)?,
            title: row.get(1)?,
            overview: row.get(2)?,
            release_date: row.get(3)?,
            runtime: row.get(4)?,
            language: row.get(5)?,
            keywords: Self::json_column(row, 6)?,
            genres: Self::json_column(row, 7)?,
            actors: Self::json_column(row, 8)?,
            directors: Self::json_column(row, 9)?,
            companies: Self::json_column(row, 10)?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }

    fn write_film(conn: &Connection, film: &FilmRecord) -> Result<()> {
        conn.execute(
            UPSERT_FILM,
            params![
                film.source,
                film.title,
                film.overview,
                film.release_date,
                film.runtime,
                film.language,
                Self::list_to_json(&film.keywords)?,
                Self::list_to_json(&film.genres)?,
                Self::list_to_json(&film.actors)?,
                Self::list_to_json(&film.directors)?,
                Self::list_to_json(&film.companies)?,
                Self::embedding_to_bytes(&film.embedding),
                film.indexed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn all_films(conn: &Connection) -> Result<Vec<FilmRecord>> {
        let mut stmt = conn.prepare(&format!("{} ORDER BY seq", SELECT_FILMS))?;
        let films = stmt
            .query_map([], Self::film_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(films)
    }
}

#[async_trait]
impl FilmStore for SqliteFilmStore {
    #[instrument(skip(self, film), fields(source = %film.source))]
    async fn upsert(&self, film: &FilmRecord) -> Result<()> {
        let conn = self.lock()?;
        Self::write_film(&conn, film)?;
        debug!("Upserted film {}", film.source);
        Ok(())
    }

    #[instrument(skip(self, films), fields(count = films.len()))]
    async fn upsert_batch(&self, films: &[FilmRecord]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for film in films {
            Self::write_film(&tx, film)?;
        }

        tx.commit()?;
        info!("Batch upserted {} films", films.len());
        Ok(films.len())
    }

    #[instrument(skip(self, query), fields(limit = query.limit))]
    async fn hybrid_search(&self, query: &HybridQuery<'_>) -> Result<Vec<ScoredFilm>> {
        let films = {
            let conn = self.lock()?;
            Self::all_films(&conn)?
        };

        let results = hybrid::rank(films, query);
        debug!("Found {} matching films", results.len());
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn list_films(&self) -> Result<Vec<FilmSummary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT source, title, release_date, runtime, indexed_at FROM films ORDER BY seq",
        )?;

        let films = stmt
            .query_map([], |row| {
                let indexed_at_str: String = row.get(4)?;
                Ok(FilmSummary {
                    source: row.get(0)?,
                    title: row.get(1)?,
                    release_date: row.get(2)?,
                    runtime: row.get(3)?,
                    indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now()),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(films)
    }

    #[instrument(skip(self))]
    async fn get_film(&self, source: &str) -> Result<Option<FilmRecord>> {
        let conn = self.lock()?;
        let result = conn.query_row(
            &format!("{} WHERE source = ?1", SELECT_FILMS),
            params![source],
            Self::film_from_row,
        );

        match result {
            Ok(film) => Ok(Some(film)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn film_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM films", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
