//! Facet filters over document collections.
//!
//! Each filter consumes a `Vec<Document>` and returns the survivors in their
//! original relative order, so filters chain without re-sorting.
//!
//! Empty facet lists on a document mean different things per facet:
//!
//! | Facet | Document list empty | Query empty |
//! |-------|---------------------|-------------|
//! | repo | always passes | no-op |
//! | agent | always passes | no-op |
//! | tag | never passes | no-op |
//!
//! Repo/agent-less documents are global; tag-less documents are only reachable
//! without a tag query.

use std::collections::HashSet;

use crate::metadata::normalize_list;
use crate::models::Document;

/// Keep documents that apply to `repo`.
///
/// A `None` or blank `repo` returns `docs` unchanged, which is not the same
/// as a repo that matches nothing.
pub fn filter_by_repo(mut docs: Vec<Document>, repo: Option<&str>) -> Vec<Document> {
    let Some(repo) = repo.map(str::trim).filter(|r| !r.is_empty()) else {
        return docs;
    };
    let wanted = repo.to_lowercase();
    docs.retain(|doc| {
        let repos = doc.metadata().repos();
        repos.is_empty() || repos.iter().any(|r| r.to_lowercase() == wanted)
    });
    docs
}

/// Keep documents carrying the requested tags.
///
/// With `match_all` the document must carry every tag; otherwise any one
/// suffices. Documents without tags never match a non-empty query.
pub fn filter_by_tags<S: AsRef<str>>(
    mut docs: Vec<Document>,
    tags: &[S],
    match_all: bool,
) -> Vec<Document> {
    let wanted = folded_set(tags);
    if wanted.is_empty() {
        return docs;
    }
    docs.retain(|doc| {
        let have: HashSet<String> = doc
            .metadata()
            .tags()
            .iter()
            .map(|t| t.to_lowercase())
            .collect();
        if have.is_empty() {
            return false;
        }
        if match_all {
            wanted.is_subset(&have)
        } else {
            !wanted.is_disjoint(&have)
        }
    });
    docs
}

/// Keep documents usable by any of `agents`.
///
/// Agent-less documents always pass; an empty query is a no-op.
pub fn filter_by_agent<S: AsRef<str>>(mut docs: Vec<Document>, agents: &[S]) -> Vec<Document> {
    let wanted = folded_set(agents);
    if wanted.is_empty() {
        return docs;
    }
    docs.retain(|doc| {
        let have = doc.metadata().agents();
        have.is_empty() || have.iter().any(|a| wanted.contains(&a.to_lowercase()))
    });
    docs
}

/// A combined repo/tag/agent selection.
#[derive(Debug, Clone, Default)]
pub struct FacetQuery {
    pub repo: Option<String>,
    pub tags: Vec<String>,
    pub match_all_tags: bool,
    pub agents: Vec<String>,
}

impl FacetQuery {
    /// Apply repo, then tag, then agent filtering.
    pub fn apply(&self, docs: Vec<Document>) -> Vec<Document> {
        let docs = filter_by_repo(docs, self.repo.as_deref());
        let docs = filter_by_tags(docs, &self.tags, self.match_all_tags);
        filter_by_agent(docs, &self.agents)
    }
}

fn folded_set<S: AsRef<str>>(values: &[S]) -> HashSet<String> {
    normalize_list(values)
        .into_iter()
        .map(|v| v.to_lowercase())
        .collect()
}
