//! Free-text search over documents.
//!
//! No index is built; each query scans the collection once. Every document
//! is scored on two channels and keeps the better of the two.
//!
//! # Scoring
//!
//! 1. Build a case-folded haystack: id, title, tags, repos, agents, body.
//! 2. Token channel: split the query on whitespace.
//!    - every token is a substring of the haystack → `2.0 + 0.1 × tokens`
//!    - at least one token is → `1.0`
//!    - otherwise → `0.0`
//! 3. Fuzzy channel: best normalized Levenshtein similarity between the id
//!    and each token or the whole query.
//! 4. `score = max(token, fuzzy)`. A document is kept when the token channel
//!    hit or the fuzzy channel reached the threshold.
//! 5. Sort by score (desc), id (asc).
//!
//! [`exact_search`] skips scoring and keeps documents whose haystack
//! contains the whole query, in input order.

use serde::Serialize;
use std::cmp::Ordering;

use crate::error::SearchError;
use crate::models::Document;

/// Minimum fuzzy similarity for an id-only match.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.72;

/// Ranking parameters.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Fuzzy similarity a document needs when no query token appears in it.
    pub threshold: f64,
    /// Truncate the ranked list to this many hits.
    pub limit: Option<usize>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_FUZZY_THRESHOLD,
            limit: None,
        }
    }
}

/// A ranked document with its scoring breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit<'a> {
    pub document: &'a Document,
    /// `max(token_score, fuzzy_score)`.
    pub score: f64,
    pub token_score: f64,
    pub fuzzy_score: f64,
}

/// Rank `docs` against `query`.
///
/// Fails with [`SearchError::EmptyQuery`] when the query is blank.
pub fn rank<'a>(
    docs: &'a [Document],
    query: &str,
    options: &SearchOptions,
) -> Result<Vec<SearchHit<'a>>, SearchError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(SearchError::EmptyQuery);
    }
    let folded = query.to_lowercase();
    let tokens: Vec<&str> = folded.split_whitespace().collect();

    let mut hits: Vec<SearchHit<'a>> = docs
        .iter()
        .filter_map(|doc| {
            let token = token_score(&haystack(doc), &tokens);
            let fuzzy = fuzzy_score(doc.id(), &folded, &tokens);
            if token > 0.0 || fuzzy >= options.threshold {
                Some(SearchHit {
                    document: doc,
                    score: token.max(fuzzy),
                    token_score: token,
                    fuzzy_score: fuzzy,
                })
            } else {
                None
            }
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.document.id().cmp(b.document.id()))
    });

    if let Some(limit) = options.limit {
        hits.truncate(limit);
    }
    Ok(hits)
}

/// Ranked search with default options, returning documents only.
pub fn search_prompts<'a>(docs: &'a [Document], query: &str) -> Result<Vec<&'a Document>, SearchError> {
    Ok(rank(docs, query, &SearchOptions::default())?
        .into_iter()
        .map(|hit| hit.document)
        .collect())
}

/// Case-insensitive substring match of the whole query, in input order.
pub fn exact_search<'a>(docs: &'a [Document], query: &str) -> Result<Vec<&'a Document>, SearchError> {
    if query.trim().is_empty() {
        return Err(SearchError::EmptyQuery);
    }
    let needle = query.to_lowercase();
    Ok(docs
        .iter()
        .filter(|doc| haystack(doc).contains(&needle))
        .collect())
}

/// Find a document by id, ignoring case and surrounding whitespace.
pub fn find_by_id<'a>(docs: &'a [Document], id: &str) -> Option<&'a Document> {
    let wanted = id.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    docs.iter().find(|doc| doc.id().to_lowercase() == wanted)
}

/// The case-folded text a query is matched against.
pub fn haystack(doc: &Document) -> String {
    let meta = doc.metadata();
    let parts = [
        meta.id(),
        meta.title().unwrap_or(""),
        &meta.tags().join(" "),
        &meta.repos().join(" "),
        &meta.agents().join(" "),
        doc.body(),
    ];
    parts.join(" ").to_lowercase()
}

fn token_score(haystack: &str, tokens: &[&str]) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let matched = tokens.iter().filter(|t| haystack.contains(**t)).count();
    if matched == tokens.len() {
        2.0 + 0.1 * tokens.len() as f64
    } else if matched > 0 {
        1.0
    } else {
        0.0
    }
}

fn fuzzy_score(id: &str, query: &str, tokens: &[&str]) -> f64 {
    let id = id.to_lowercase();
    tokens
        .iter()
        .copied()
        .chain(std::iter::once(query))
        .map(|candidate| strsim::normalized_levenshtein(&id, candidate))
        .fold(0.0, f64::max)
}
