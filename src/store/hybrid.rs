//! Hybrid ranking: dense cosine similarity fused with BM25 lexical scores.
//!
//! Stores hand over their films in insertion order; that order is the
//! tie-break for equal fused scores.

use super::{cosine_similarity, FusionPolicy, HybridQuery, ScoredFilm};
use crate::film::FilmRecord;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

const BM25_K1: f32 = 1.2;
const BM25_B: f32 = 0.75;

const STOP_WORDS: &[&str] = &[
    "a", "about", "an", "and", "any", "are", "as", "at", "be", "by", "for", "from", "give",
    "has", "have", "i", "in", "is", "it", "like", "me", "my", "of", "on", "or", "some", "that",
    "the", "their", "them", "this", "to", "want", "was", "were", "what", "which", "with",
];

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Constant literal; compiling it cannot fail at runtime.
    PATTERN.get_or_init(|| Regex::new(r"[\p{L}\p{N}]+").expect("static token pattern"))
}

/// Lowercased word tokens, minus stop words and single characters.
pub fn tokenize(text: &str) -> Vec<String> {
    token_pattern()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|t| t.chars().count() > 1 && !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// BM25 score of every document against the query terms.
pub fn bm25_scores(query: &str, documents: &[String]) -> Vec<f32> {
    let terms: Vec<String> = {
        let mut seen = HashSet::new();
        tokenize(query)
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .collect()
    };

    if terms.is_empty() || documents.is_empty() {
        return vec![0.0; documents.len()];
    }

    let doc_terms: Vec<HashMap<String, usize>> = documents
        .iter()
        .map(|doc| {
            let mut counts = HashMap::new();
            for token in tokenize(doc) {
                *counts.entry(token).or_insert(0) += 1;
            }
            counts
        })
        .collect();

    let lengths: Vec<f32> = doc_terms
        .iter()
        .map(|counts| counts.values().sum::<usize>() as f32)
        .collect();
    let n = documents.len() as f32;
    let avg_len = (lengths.iter().sum::<f32>() / n).max(1.0);

    let idf: Vec<f32> = terms
        .iter()
        .map(|term| {
            let df = doc_terms.iter().filter(|c| c.contains_key(term)).count() as f32;
            ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
        })
        .collect();

    doc_terms
        .iter()
        .zip(lengths.iter())
        .map(|(counts, &len)| {
            terms
                .iter()
                .zip(idf.iter())
                .map(|(term, idf)| {
                    let tf = *counts.get(term).unwrap_or(&0) as f32;
                    if tf == 0.0 {
                        return 0.0;
                    }
                    let norm = BM25_K1 * (1.0 - BM25_B + BM25_B * len / avg_len);
                    idf * tf * (BM25_K1 + 1.0) / (tf + norm)
                })
                .sum()
        })
        .collect()
}

/// Rank films (given in insertion order) against a hybrid query.
pub fn rank(films: Vec<FilmRecord>, query: &HybridQuery<'_>) -> Vec<ScoredFilm> {
    if query.limit == 0 || films.is_empty() {
        return Vec::new();
    }

    let texts: Vec<String> = films.iter().map(FilmRecord::search_text).collect();
    let lexical = bm25_scores(query.text, &texts);
    let vector: Vec<f32> = films
        .iter()
        .map(|f| cosine_similarity(query.embedding, &f.embedding))
        .collect();

    // Candidate positions, still in insertion order.
    let candidates: Vec<usize> = (0..films.len())
        .filter(|&i| vector[i] >= query.min_vector_score || lexical[i] > 0.0)
        .collect();

    let fused = match query.fusion {
        FusionPolicy::ReciprocalRank { k } => reciprocal_rank(&candidates, &vector, &lexical, k),
        FusionPolicy::Weighted { vector_weight } => {
            weighted_blend(&candidates, &vector, &lexical, vector_weight)
        }
    };

    let mut order: Vec<(usize, f32)> = candidates.into_iter().zip(fused).collect();
    order.sort_by(|a, b| descending(a.1, b.1).then_with(|| a.0.cmp(&b.0)));
    order.truncate(query.limit);

    let mut films: Vec<Option<FilmRecord>> = films.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|(i, score)| {
            films[i].take().map(|film| ScoredFilm {
                film,
                score,
                vector_score: vector[i],
                lexical_score: lexical[i],
            })
        })
        .collect()
}

fn descending(a: f32, b: f32) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// 1-based ranks of `positions` by descending score, ties by position.
fn ranks(positions: &[usize], scores: &[f32]) -> HashMap<usize, usize> {
    let mut sorted = positions.to_vec();
    sorted.sort_by(|&a, &b| descending(scores[a], scores[b]).then_with(|| a.cmp(&b)));
    sorted
        .into_iter()
        .enumerate()
        .map(|(rank, pos)| (pos, rank + 1))
        .collect()
}

fn reciprocal_rank(candidates: &[usize], vector: &[f32], lexical: &[f32], k: f32) -> Vec<f32> {
    let vector_ranks = ranks(candidates, vector);
    let lexical_hits: Vec<usize> = candidates
        .iter()
        .copied()
        .filter(|&i| lexical[i] > 0.0)
        .collect();
    let lexical_ranks = ranks(&lexical_hits, lexical);

    candidates
        .iter()
        .map(|i| {
            let mut score = 0.0;
            if let Some(r) = vector_ranks.get(i) {
                score += 1.0 / (k + *r as f32);
            }
            if let Some(r) = lexical_ranks.get(i) {
                score += 1.0 / (k + *r as f32);
            }
            score
        })
        .collect()
}

fn weighted_blend(
    candidates: &[usize],
    vector: &[f32],
    lexical: &[f32],
    vector_weight: f32,
) -> Vec<f32> {
    let vector_norm = min_max(candidates.iter().map(|&i| vector[i]).collect());
    let lexical_norm = min_max(candidates.iter().map(|&i| lexical[i]).collect());

    vector_norm
        .into_iter()
        .zip(lexical_norm)
        .map(|(v, l)| vector_weight * v + (1.0 - vector_weight) * l)
        .collect()
}

/// Scale into [0, 1]. A constant non-zero column maps to 1, all zeros stay 0.
fn min_max(values: Vec<f32>) -> Vec<f32> {
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let span = max - min;

    values
        .into_iter()
        .map(|v| {
            if span > f32::EPSILON {
                (v - min) / span
            } else if max > 0.0 {
                1.0
            } else {
                0.0
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::film::FilmInput;

    fn film(source: &str, title: &str, genres: &[&str], embedding: Vec<f32>) -> FilmRecord {
        FilmInput {
            source: source.to_string(),
            title: title.to_string(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            runtime: 100,
            ..Default::default()
        }
        .into_record(embedding)
    }

    fn query<'a>(text: &'a str, embedding: &'a [f32], limit: usize) -> HybridQuery<'a> {
        HybridQuery {
            text,
            embedding,
            limit,
            min_vector_score: 0.0,
            fusion: FusionPolicy::default(),
        }
    }

    #[test]
    fn test_tokenize_drops_stop_words() {
        assert_eq!(
            tokenize("Find me the DRAMA movies, with pets!"),
            vec!["find", "drama", "movies", "pets"]
        );
        assert!(tokenize("a I of").is_empty());
    }

    #[test]
    fn test_bm25_prefers_matching_documents() {
        let docs = vec![
            "zombie comedy horror".to_string(),
            "quiet drama about a family".to_string(),
            "zombie zombie apocalypse".to_string(),
        ];
        let scores = bm25_scores("zombie", &docs);
        assert!(scores[0] > 0.0);
        assert_eq!(scores[1], 0.0);
        assert!(scores[2] > scores[0]);
    }

    #[test]
    fn test_rank_limits_and_orders_results() {
        let films = vec![
            film("s1", "Alpha", &["Drama"], vec![0.2, 1.0]),
            film("s2", "Beta", &["Horror"], vec![1.0, 0.0]),
            film("s3", "Gamma", &["Drama"], vec![0.9, 0.1]),
        ];
        let embedding = [1.0, 0.0];
        let results = rank(films, &query("drama", &embedding, 2));

        assert_eq!(results.len(), 2);
        assert!(results[0].score >= results[1].score);
        // Both dramas match lexically and outrank the dense-only horror film.
        let sources: Vec<_> = results.iter().map(|r| r.film.source.as_str()).collect();
        assert!(sources.contains(&"s1"));
        assert!(sources.contains(&"s3"));
    }

    #[test]
    fn test_rank_breaks_ties_by_insertion_order() {
        let films = vec![
            film("first", "Same", &[], vec![1.0, 0.0]),
            film("second", "Same", &[], vec![1.0, 0.0]),
        ];
        let embedding = [1.0, 0.0];
        let mut q = query("", &embedding, 10);
        q.fusion = FusionPolicy::Weighted { vector_weight: 0.5 };

        let results = rank(films, &q);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].score, results[1].score);
        assert_eq!(results[0].film.source, "first");
        assert_eq!(results[1].film.source, "second");
    }

    #[test]
    fn test_rank_excludes_films_without_any_signal() {
        let films = vec![
            film("s1", "Alpha", &["Drama"], vec![0.0, 1.0]),
            film("s2", "Beta", &["Horror"], vec![1.0, 0.0]),
        ];
        let embedding = [1.0, 0.0];
        let mut q = query("drama", &embedding, 10);
        q.min_vector_score = 0.5;

        let sources: Vec<_> = rank(films.clone(), &q)
            .into_iter()
            .map(|r| r.film.source)
            .collect();
        assert_eq!(sources, vec!["s1", "s2"]);

        let nothing = [0.0, 0.0];
        let mut q = query("xyzzy", &nothing, 10);
        q.min_vector_score = 0.5;
        assert!(rank(films, &q).is_empty());
    }

    #[test]
    fn test_weighted_blend_uses_vector_weight() {
        let films = vec![
            film("lexical", "Zombie Night", &[], vec![0.0, 1.0]),
            film("dense", "Quiet Place", &[], vec![1.0, 0.0]),
        ];
        let embedding = [1.0, 0.0];

        let mut q = query("zombie", &embedding, 10);
        q.fusion = FusionPolicy::Weighted { vector_weight: 1.0 };
        assert_eq!(rank(films.clone(), &q)[0].film.source, "dense");

        q.fusion = FusionPolicy::Weighted { vector_weight: 0.0 };
        assert_eq!(rank(films, &q)[0].film.source, "lexical");
    }

    #[test]
    fn test_rendering_labels_do_not_match_lexically() {
        let films = vec![
            film("https://www.themoviedb.org/movie/1", "Alpha", &["Drama"], vec![0.0, 1.0]),
            film("https://www.themoviedb.org/movie/2", "Beta", &["Horror"], vec![0.0, 1.0]),
        ];
        let embedding = [1.0, 0.0];
        for text in ["movie runtime", "under 90 minutes", "title language source"] {
            let mut q = query(text, &embedding, 10);
            q.min_vector_score = 0.5;
            assert!(rank(films.clone(), &q).is_empty(), "{:?} matched", text);
        }

        let mut q = query("100 minutes", &embedding, 10);
        q.min_vector_score = 0.5;
        let results = rank(films, &q);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.lexical_score > 0.0));
    }

    #[test]
    fn test_zero_limit_returns_nothing() {
        let films = vec![film("s1", "Alpha", &[], vec![1.0])];
        assert!(rank(films, &query("alpha", &[1.0], 0)).is_empty());
    }
}
