//! Directory scanner: turns a `prompts/` or `rules/` tree into documents.
//!
//! Scanning runs in two passes so ordering stays deterministic:
//!
//! 1. [`collect_files`] walks the tree and sorts matching paths.
//! 2. [`scan_directory`] parses each path, then re-sorts by document id.
//!
//! One bad file fails the whole scan with that file's error.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use promptlib_core::{
    parse_frontmatter, Document, DocumentKind, FrontmatterError, Metadata, MetadataError,
};

/// File patterns recognized as documents (matched case-insensitively).
pub const DOCUMENT_GLOBS: &[&str] = &["**/*.md", "**/*.markdown"];

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("missing directory: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("{} must be a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to walk {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid frontmatter in {}: {source}", .path.display())]
    Frontmatter {
        path: PathBuf,
        source: FrontmatterError,
    },

    #[error("invalid metadata in {}: {source}", .path.display())]
    Metadata {
        path: PathBuf,
        source: MetadataError,
    },

    #[error("no {kind} documents matched '{selection}'")]
    SelectionNotMatched {
        kind: DocumentKind,
        selection: String,
    },

    #[error("no {0} documents were loaded for the configured sets")]
    NothingSelected(DocumentKind),

    #[error("invalid document pattern: {0}")]
    Pattern(#[from] globset::Error),
}

/// Scan `<store>/prompts`.
pub fn scan_prompts(store: &Path) -> Result<Vec<Document>, ScanError> {
    scan_directory(&store.join(DocumentKind::Prompt.directory()), DocumentKind::Prompt)
}

/// Scan `<store>/rules`.
pub fn scan_rules(store: &Path) -> Result<Vec<Document>, ScanError> {
    scan_directory(&store.join(DocumentKind::Rule.directory()), DocumentKind::Rule)
}

/// Parse every document under `dir` as `kind`, sorted by id.
pub fn scan_directory(dir: &Path, kind: DocumentKind) -> Result<Vec<Document>, ScanError> {
    let files = collect_files(dir)?;

    let mut documents = files
        .iter()
        .map(|path| load_document(path, kind))
        .collect::<Result<Vec<_>, _>>()?;

    // Stable: equal ids keep path order.
    documents.sort_by(|a, b| a.id().cmp(b.id()));

    debug!(dir = %dir.display(), %kind, count = documents.len(), "scanned documents");
    Ok(documents)
}

/// Every document file under `dir`, recursively, sorted by path.
pub fn collect_files(dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    if !dir.exists() {
        return Err(ScanError::MissingDirectory(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(ScanError::NotADirectory(dir.to_path_buf()));
    }

    let patterns = document_globset()?;
    let mut files = Vec::new();

    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|source| ScanError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(dir).unwrap_or(path);
        if patterns.is_match(relative) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Read and parse a single document file.
pub fn load_document(path: &Path, kind: DocumentKind) -> Result<Document, ScanError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ScanError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let (header, body) = parse_frontmatter(&raw).map_err(|source| ScanError::Frontmatter {
        path: path.to_path_buf(),
        source,
    })?;

    let metadata = Metadata::from_mapping(kind, &header).map_err(|source| ScanError::Metadata {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Document::new(metadata, body, path))
}

fn document_globset() -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in DOCUMENT_GLOBS {
        builder.add(GlobBuilder::new(pattern).case_insensitive(true).build()?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn prompt_file(id: &str) -> String {
        format!("---\nid: {id}\ntags: [demo]\n---\nBody of {id}\n")
    }

    #[test]
    fn test_collect_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.md", "");
        write(dir.path(), "a/nested.markdown", "");
        write(dir.path(), "UPPER.MD", "");
        write(dir.path(), "notes.txt", "");
        write(dir.path(), "a/readme", "");

        let files = collect_files(dir.path()).unwrap();
        let rel: Vec<String> = files
            .iter()
            .map(|p| {
                p.strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        assert_eq!(rel, ["UPPER.MD", "a/nested.markdown", "b.md"]);
    }

    #[test]
    fn test_scan_sorts_by_id_not_path() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a-file.md", &prompt_file("zulu"));
        write(dir.path(), "z/deep/file.md", &prompt_file("alpha"));
        write(dir.path(), "m.markdown", &prompt_file("mike"));

        let docs = scan_directory(dir.path(), DocumentKind::Prompt).unwrap();
        let ids: Vec<&str> = docs.iter().map(Document::id).collect();
        assert_eq!(ids, ["alpha", "mike", "zulu"]);
        assert_eq!(docs[0].body(), "Body of alpha");
        assert!(docs[0].path().ends_with("z/deep/file.md"));
        assert_eq!(docs[0].kind(), DocumentKind::Prompt);
    }

    #[test]
    fn test_one_bad_document_aborts_scan() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "good.md", &prompt_file("good"));
        write(dir.path(), "bad.md", "---\ntags: [missing-id]\n---\nbody\n");

        let err = scan_directory(dir.path(), DocumentKind::Prompt).unwrap_err();
        match err {
            ScanError::Metadata { path, source } => {
                assert!(path.ends_with("bad.md"));
                assert_eq!(source, MetadataError::MissingField("id"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unterminated_frontmatter_aborts_scan() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.md", &prompt_file("a"));
        write(dir.path(), "b.md", "---\nid: b\nno closing delimiter\n");

        let err = scan_directory(dir.path(), DocumentKind::Rule).unwrap_err();
        assert!(matches!(
            err,
            ScanError::Frontmatter {
                source: FrontmatterError::Unterminated,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_and_non_directory_roots() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan_rules(dir.path()).unwrap_err();
        assert!(matches!(err, ScanError::MissingDirectory(_)));

        write(dir.path(), "prompts", "not a directory");
        let err = scan_prompts(dir.path()).unwrap_err();
        assert!(matches!(err, ScanError::NotADirectory(_)));
    }

    #[test]
    fn test_empty_directory_is_empty_scan() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("rules")).unwrap();
        assert!(scan_rules(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_load_rule_document() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "rule.md",
            "---\nid: python-style\ntags: [python]\nagents: [cursor]\nversion: 1.0.0\n---\nFollow PEP 8.\n",
        );
        let doc = load_document(&dir.path().join("rule.md"), DocumentKind::Rule).unwrap();
        assert_eq!(doc.id(), "python-style");
        assert_eq!(doc.kind(), DocumentKind::Rule);
        assert_eq!(doc.metadata().version(), "1.0.0");
        assert_eq!(doc.body(), "Follow PEP 8.");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_document(&dir.path().join("nope.md"), DocumentKind::Prompt).unwrap_err();
        assert!(matches!(err, ScanError::Read { .. }));
    }
}
