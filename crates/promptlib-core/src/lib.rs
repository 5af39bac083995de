//! # promptlib core
//!
//! Pure logic for promptlib: the document model, frontmatter parsing, facet
//! filters, search ranking and prompt variable substitution.
//!
//! This crate performs no filesystem or process I/O. Callers read files,
//! hand the raw text to [`frontmatter::parse_frontmatter`], and build
//! [`models::Document`]s from the result.
//!
//! ```text
//! raw text ──▶ frontmatter ──▶ metadata ──▶ Document
//!                                             │
//!                         ┌───────────────────┤
//!                         ▼                   ▼
//!                      filter              search
//! ```

pub mod error;
pub mod filter;
pub mod frontmatter;
pub mod metadata;
pub mod models;
pub mod search;
pub mod variables;

pub use error::{FrontmatterError, MetadataError, SearchError, VariableError};
pub use filter::{filter_by_agent, filter_by_repo, filter_by_tags, FacetQuery};
pub use frontmatter::{parse_frontmatter, render_document};
pub use metadata::{Metadata, PromptMetadata, RuleMetadata};
pub use models::{Document, DocumentKind, RepoConfig};
pub use search::{exact_search, find_by_id, rank, search_prompts, SearchHit, SearchOptions};
pub use variables::{apply_variables, parse_assignment, Rendered};
