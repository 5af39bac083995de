//! # promptlib
//!
//! A locally cached, searchable mirror of a shared prompt and rule library.
//!
//! A team keeps prompts and coding rules as Markdown files with YAML
//! frontmatter in one git repository. promptlib mirrors that repository into
//! a local cache, parses every document, and answers filter and search
//! queries against it. When the remote is unreachable the last good cache is
//! served with a warning.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐
//! │    store    │──▶│    scan     │──▶│  Documents   │
//! │ git / local │   │  selection  │   │ (core model) │
//! └─────────────┘   └─────────────┘   └──────┬───────┘
//!                                            │
//!                        ┌───────────────────┤
//!                        ▼                   ▼
//!                   ┌──────────┐       ┌──────────┐
//!                   │  filter  │       │  search  │
//!                   └──────────┘       └──────────┘
//! ```
//!
//! Parsing, validation, filtering and ranking live in `promptlib-core`, which
//! performs no I/O. This crate adds the filesystem, git and CLI layers.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Tool and repository configuration |
//! | [`scan`] | Directory walking and document loading |
//! | [`selection`] | Resolving configured rule and prompt sets |
//! | [`store`] | Git cache synchronization with stale fallback |
//! | [`commands`] | CLI command implementations |
//! | [`logging`] | `tracing` subscriber setup |

pub mod commands;
pub mod config;
pub mod logging;
pub mod scan;
pub mod selection;
pub mod store;

pub use promptlib_core::{
    Document, DocumentKind, FacetQuery, Metadata, RepoConfig, SearchHit, SearchOptions,
};
