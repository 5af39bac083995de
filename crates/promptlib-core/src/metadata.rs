//! Document metadata: the validated form of a frontmatter header.
//!
//! Prompts and rules share the facet lists and version; prompts add an
//! optional title. [`Metadata`] is the sum of both, and every consumer that
//! needs "the identifier" goes through [`Metadata::id`].
//!
//! # Normalization
//!
//! | Field | Rule |
//! |-------|------|
//! | `id` | mandatory, trimmed, must match `^[a-z0-9][a-z0-9\-_]*$` |
//! | `tags`, `repos`, `agents` | list, entries trimmed, blanks dropped, case-insensitive dedup keeping first casing |
//! | `version` | defaults to `0.1.0`, must match `MAJOR.MINOR.PATCH` |
//! | `title` | prompts only, trimmed, blank becomes absent |
//!
//! Normalizing an already-normalized value returns it unchanged.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::error::MetadataError;
use crate::models::DocumentKind;

/// Version assigned when the header omits `version`.
pub const DEFAULT_VERSION: &str = "0.1.0";

static ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9\-_]*$").unwrap());

static SEMVER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:0|[1-9][0-9]*)\.(?:0|[1-9][0-9]*)\.(?:0|[1-9][0-9]*)$").unwrap()
});

/// Trim, drop blanks, and deduplicate case-insensitively.
///
/// The first occurrence of each case-folded value wins, keeping its casing
/// and its position relative to the other survivors.
pub fn normalize_list<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut normalized = Vec::new();
    for value in values {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_lowercase()) {
            normalized.push(trimmed.to_string());
        }
    }
    normalized
}

/// Validate a slug identifier, returning its trimmed form.
pub fn validate_id(value: &str) -> Result<String, MetadataError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(MetadataError::BlankField("id"));
    }
    if !ID_PATTERN.is_match(trimmed) {
        return Err(MetadataError::InvalidId(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Validate a `MAJOR.MINOR.PATCH` version, returning its trimmed form.
///
/// `field` names the offending key in the error (`version`, `version_lock`).
pub fn validate_version(field: &'static str, value: &str) -> Result<String, MetadataError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(MetadataError::BlankField(field));
    }
    if !SEMVER_PATTERN.is_match(trimmed) {
        return Err(MetadataError::InvalidVersion {
            field,
            value: trimmed.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Fields shared by prompts and rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommonMetadata {
    tags: Vec<String>,
    repos: Vec<String>,
    agents: Vec<String>,
    version: String,
}

impl CommonMetadata {
    /// Build validated common fields. Lists are normalized, the version
    /// checked.
    pub fn new<S: AsRef<str>>(
        tags: &[S],
        repos: &[S],
        agents: &[S],
        version: &str,
    ) -> Result<Self, MetadataError> {
        Ok(Self {
            tags: normalize_list(tags),
            repos: normalize_list(repos),
            agents: normalize_list(agents),
            version: validate_version("version", version)?,
        })
    }

    fn from_mapping(mapping: &Mapping) -> Result<Self, MetadataError> {
        let tags = list_field(mapping, "tags")?;
        let repos = list_field(mapping, "repos")?;
        let agents = list_field(mapping, "agents")?;
        let version = match mapping.get("version") {
            None => DEFAULT_VERSION.to_string(),
            Some(Value::String(raw)) => validate_version("version", raw)?,
            Some(_) => {
                return Err(MetadataError::TypeMismatch {
                    field: "version",
                    expected: "a string",
                })
            }
        };
        Ok(Self {
            tags,
            repos,
            agents,
            version,
        })
    }
}

impl Default for CommonMetadata {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            repos: Vec::new(),
            agents: Vec::new(),
            version: DEFAULT_VERSION.to_string(),
        }
    }
}

/// Metadata parsed from a prompt file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMetadata {
    id: String,
    title: Option<String>,
    #[serde(flatten)]
    common: CommonMetadata,
}

impl PromptMetadata {
    pub fn new(id: &str, title: Option<&str>, common: CommonMetadata) -> Result<Self, MetadataError> {
        Ok(Self {
            id: validate_id(id)?,
            title: title.and_then(normalize_title),
            common,
        })
    }
}

/// Metadata parsed from a rule file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleMetadata {
    id: String,
    #[serde(flatten)]
    common: CommonMetadata,
}

impl RuleMetadata {
    pub fn new(id: &str, common: CommonMetadata) -> Result<Self, MetadataError> {
        Ok(Self {
            id: validate_id(id)?,
            common,
        })
    }
}

/// Validated metadata of either document kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Metadata {
    Prompt(PromptMetadata),
    Rule(RuleMetadata),
}

impl Metadata {
    /// Validate an untyped header mapping as metadata of `kind`.
    ///
    /// Unknown keys are ignored. `title` is only read for prompts.
    pub fn from_mapping(kind: DocumentKind, mapping: &Mapping) -> Result<Self, MetadataError> {
        let id = match mapping.get("id") {
            None => return Err(MetadataError::MissingField("id")),
            Some(Value::String(raw)) => validate_id(raw)?,
            Some(_) => {
                return Err(MetadataError::TypeMismatch {
                    field: "id",
                    expected: "a string",
                })
            }
        };
        let common = CommonMetadata::from_mapping(mapping)?;

        match kind {
            DocumentKind::Prompt => {
                let title = match mapping.get("title") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(raw)) => normalize_title(raw),
                    Some(_) => {
                        return Err(MetadataError::TypeMismatch {
                            field: "title",
                            expected: "a string",
                        })
                    }
                };
                Ok(Metadata::Prompt(PromptMetadata { id, title, common }))
            }
            DocumentKind::Rule => Ok(Metadata::Rule(RuleMetadata { id, common })),
        }
    }

    pub fn kind(&self) -> DocumentKind {
        match self {
            Metadata::Prompt(_) => DocumentKind::Prompt,
            Metadata::Rule(_) => DocumentKind::Rule,
        }
    }

    /// The document's slug identifier, whichever the variant.
    pub fn id(&self) -> &str {
        match self {
            Metadata::Prompt(m) => &m.id,
            Metadata::Rule(m) => &m.id,
        }
    }

    /// Prompt title; rules never have one.
    pub fn title(&self) -> Option<&str> {
        match self {
            Metadata::Prompt(m) => m.title.as_deref(),
            Metadata::Rule(_) => None,
        }
    }

    pub fn tags(&self) -> &[String] {
        &self.common().tags
    }

    pub fn repos(&self) -> &[String] {
        &self.common().repos
    }

    pub fn agents(&self) -> &[String] {
        &self.common().agents
    }

    pub fn version(&self) -> &str {
        &self.common().version
    }

    fn common(&self) -> &CommonMetadata {
        match self {
            Metadata::Prompt(m) => &m.common,
            Metadata::Rule(m) => &m.common,
        }
    }
}

fn normalize_title(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn list_field(mapping: &Mapping, field: &'static str) -> Result<Vec<String>, MetadataError> {
    let items = match mapping.get(field) {
        None => return Ok(Vec::new()),
        Some(Value::Sequence(items)) => items,
        Some(_) => {
            return Err(MetadataError::TypeMismatch {
                field,
                expected: "a list of strings",
            })
        }
    };

    let mut raw = Vec::with_capacity(items.len());
    for item in items {
        let text = match item {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => {
                return Err(MetadataError::TypeMismatch {
                    field,
                    expected: "a list of strings",
                })
            }
        };
        raw.push(text);
    }
    Ok(normalize_list(raw))
}
