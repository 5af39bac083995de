//! Core data models shared by the scanner, filters and ranker.
//!
//! A [`Document`] is built once per scan and never mutated afterwards.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::MetadataError;
use crate::metadata::{normalize_list, validate_version, Metadata};

/// Which of the two document collections a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Prompt,
    Rule,
}

impl DocumentKind {
    /// Top-level directory holding documents of this kind in a store.
    pub fn directory(self) -> &'static str {
        match self {
            DocumentKind::Prompt => "prompts",
            DocumentKind::Rule => "rules",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Prompt => write!(f, "prompt"),
            DocumentKind::Rule => write!(f, "rule"),
        }
    }
}

/// A parsed prompt or rule: validated metadata, body text, and where it
/// came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    metadata: Metadata,
    body: String,
    path: PathBuf,
}

impl Document {
    pub fn new(metadata: Metadata, body: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            metadata,
            body: body.into(),
            path: path.into(),
        }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Shorthand for `self.metadata().id()`.
    pub fn id(&self) -> &str {
        self.metadata.id()
    }

    pub fn kind(&self) -> DocumentKind {
        self.metadata.kind()
    }

    /// Body text with outer blank lines removed.
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Per-repository configuration naming the central store and which rule
/// and prompt sets to pull from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoConfig {
    central_repo: String,
    rules: Vec<String>,
    prompt_sets: Vec<String>,
    version_lock: Option<String>,
}

impl RepoConfig {
    /// Validate and normalize a repository configuration.
    ///
    /// `central_repo` is trimmed and must not be blank; selector lists are
    /// deduplicated like metadata facets; `version_lock`, when present, must
    /// be a `MAJOR.MINOR.PATCH` version.
    pub fn new<S: AsRef<str>>(
        central_repo: &str,
        rules: &[S],
        prompt_sets: &[S],
        version_lock: Option<&str>,
    ) -> Result<Self, MetadataError> {
        let central_repo = central_repo.trim();
        if central_repo.is_empty() {
            return Err(MetadataError::BlankField("central_repo"));
        }
        let version_lock = version_lock
            .map(|v| validate_version("version_lock", v))
            .transpose()?;

        Ok(Self {
            central_repo: central_repo.to_string(),
            rules: normalize_list(rules),
            prompt_sets: normalize_list(prompt_sets),
            version_lock,
        })
    }

    /// Remote URL or local path of the central store.
    pub fn central_repo(&self) -> &str {
        &self.central_repo
    }

    /// Rule-set selectors, in configured order.
    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    /// Prompt-set selectors, in configured order.
    pub fn prompt_sets(&self) -> &[String] {
        &self.prompt_sets
    }

    pub fn version_lock(&self) -> Option<&str> {
        self.version_lock.as_deref()
    }
}
