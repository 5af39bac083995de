//! Resolve configured rule and prompt set selectors to documents.
//!
//! A selector is tried against the kind's root directory in order:
//!
//! 1. a directory → every document beneath it
//! 2. an existing file
//! 3. the selector with `.md` or `.markdown` appended
//! 4. for single-component selectors, any document whose file stem matches
//!
//! Paths that resolve outside the root are ignored. A selector matching
//! nothing is an error.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

use promptlib_core::{Document, DocumentKind};

use crate::scan::{collect_files, load_document, scan_directory, ScanError};

const SUFFIXES: &[&str] = &["md", "markdown"];

/// Prompts for the configured sets; all prompts when no sets are configured.
pub fn select_prompts<S: AsRef<str>>(store: &Path, selections: &[S]) -> Result<Vec<Document>, ScanError> {
    let root = store.join(DocumentKind::Prompt.directory());
    if selections.is_empty() {
        return scan_directory(&root, DocumentKind::Prompt);
    }
    select(&root, DocumentKind::Prompt, selections)
}

/// Rules for the configured sets. Selecting nothing is an error.
pub fn select_rules<S: AsRef<str>>(store: &Path, selections: &[S]) -> Result<Vec<Document>, ScanError> {
    let root = store.join(DocumentKind::Rule.directory());
    select(&root, DocumentKind::Rule, selections)
}

fn select<S: AsRef<str>>(
    root: &Path,
    kind: DocumentKind,
    selections: &[S],
) -> Result<Vec<Document>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::MissingDirectory(root.to_path_buf()));
    }
    let root = root.canonicalize().map_err(|source| ScanError::Read {
        path: root.to_path_buf(),
        source,
    })?;

    let mut seen = HashSet::new();
    let mut documents = Vec::new();
    for selection in selections {
        let selection = selection.as_ref().trim();
        if selection.is_empty() {
            continue;
        }
        let paths = resolve_selection(&root, selection)?;
        if paths.is_empty() {
            return Err(ScanError::SelectionNotMatched {
                kind,
                selection: selection.to_string(),
            });
        }
        debug!(%kind, selection, count = paths.len(), "resolved selection");
        for path in paths {
            if seen.insert(path.clone()) {
                documents.push(load_document(&path, kind)?);
            }
        }
    }

    if documents.is_empty() {
        return Err(ScanError::NothingSelected(kind));
    }
    Ok(documents)
}

/// Files a single selector names under `root` (already canonical).
fn resolve_selection(root: &Path, selection: &str) -> Result<Vec<PathBuf>, ScanError> {
    if let Some(candidate) = within_root(root, &root.join(selection)) {
        if candidate.is_dir() {
            return collect_files(&candidate);
        }
        if candidate.is_file() {
            return Ok(vec![candidate]);
        }
    }

    let selector = Path::new(selection);
    if selector.extension().is_none() {
        for suffix in SUFFIXES {
            let path = root.join(format!("{selection}.{suffix}"));
            if let Some(candidate) = within_root(root, &path) {
                if candidate.is_file() {
                    return Ok(vec![candidate]);
                }
            }
        }
    }

    if selector.components().count() == 1 {
        let matches = collect_files(root)?
            .into_iter()
            .filter(|path| path.file_stem().is_some_and(|stem| stem == selection))
            .collect();
        return Ok(matches);
    }

    Ok(Vec::new())
}

fn within_root(root: &Path, path: &Path) -> Option<PathBuf> {
    let resolved = path.canonicalize().ok()?;
    resolved.starts_with(root).then_some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn doc(id: &str) -> String {
        format!("---\nid: {id}\n---\n{id} body\n")
    }

    fn store() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let files = [
            ("rules/python/style.md", doc("python-style")),
            ("rules/python/testing.md", doc("python-testing")),
            ("rules/security.md", doc("security")),
            ("rules/nested/go/format.markdown", doc("go-format")),
            ("prompts/reviews/review-pr.md", doc("review-pr")),
            ("prompts/incidents/triage.md", doc("triage")),
            ("prompts/zeta.md", doc("alpha")),
            ("secret.md", doc("outside")),
        ];
        for (rel, content) in files {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    fn ids(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(Document::id).collect()
    }

    #[test]
    fn test_directory_file_suffix_and_stem() {
        let dir = store();
        let rules = select_rules(dir.path(), &["python", "security", "format"]).unwrap();
        assert_eq!(ids(&rules), ["python-style", "python-testing", "security", "go-format"]);

        let rules = select_rules(dir.path(), &["python/style.md"]).unwrap();
        assert_eq!(ids(&rules), ["python-style"]);
    }

    #[test]
    fn test_duplicates_loaded_once() {
        let dir = store();
        let prompts = select_prompts(dir.path(), &["reviews", "reviews/review-pr", "review-pr"]).unwrap();
        assert_eq!(ids(&prompts), ["review-pr"]);
    }

    #[test]
    fn test_empty_prompt_selection_loads_all() {
        let dir = store();
        let prompts = select_prompts::<&str>(dir.path(), &[]).unwrap();
        assert_eq!(ids(&prompts), ["alpha", "review-pr", "triage"]);
    }

    #[test]
    fn test_empty_rule_selection_is_an_error() {
        let dir = store();
        let err = select_rules::<&str>(dir.path(), &[]).unwrap_err();
        assert!(matches!(err, ScanError::NothingSelected(DocumentKind::Rule)));
    }

    #[test]
    fn test_unmatched_selector() {
        let dir = store();
        let err = select_rules(dir.path(), &["python", "kotlin"]).unwrap_err();
        match err {
            ScanError::SelectionNotMatched { kind, selection } => {
                assert_eq!(kind, DocumentKind::Rule);
                assert_eq!(selection, "kotlin");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_selection_cannot_escape_root() {
        let dir = store();
        let err = select_rules(dir.path(), &["../secret"]).unwrap_err();
        assert!(matches!(err, ScanError::SelectionNotMatched { .. }));
    }

    #[test]
    fn test_missing_rules_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = select_rules(dir.path(), &["python"]).unwrap_err();
        assert!(matches!(err, ScanError::MissingDirectory(_)));
    }
}
