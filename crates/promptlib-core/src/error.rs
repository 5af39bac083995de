//! Error types for the pure document pipeline.

use thiserror::Error;

/// A metadata field failed validation.
///
/// Carries the first violated constraint only; validation stops there.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' must be {expected}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field '{0}' cannot be blank")]
    BlankField(&'static str),

    #[error("invalid id '{0}': must contain lowercase letters, numbers, dashes, or underscores")]
    InvalidId(String),

    #[error("invalid {field} '{value}': must follow MAJOR.MINOR.PATCH format")]
    InvalidVersion { field: &'static str, value: String },
}

/// The document does not have a well-formed frontmatter block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrontmatterError {
    #[error("document must begin with YAML frontmatter delimited by ---")]
    MissingOpening,

    #[error("frontmatter block is not properly terminated")]
    Unterminated,

    #[error("unable to parse YAML frontmatter: {0}")]
    InvalidYaml(String),

    #[error("YAML frontmatter must deserialize to a mapping")]
    NotAMapping,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("search query cannot be empty")]
    EmptyQuery,
}

/// A `KEY=VALUE` variable assignment could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VariableError {
    #[error("invalid variable assignment '{0}': expected KEY=VALUE")]
    MissingSeparator(String),

    #[error("variable names cannot be blank")]
    BlankName,
}
