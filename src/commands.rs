//! CLI command implementations.
//!
//! Each `run_*` function takes an already-resolved store directory and
//! prints to stdout. Warnings go to stderr.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use promptlib_core::{
    apply_variables, exact_search, filter_by_repo, find_by_id, rank, Document, FacetQuery,
    RepoConfig, SearchOptions,
};

use crate::config::StoreConfig;
use crate::scan::scan_prompts;
use crate::selection::{select_prompts, select_rules};
use crate::store::{StoreSynchronizer, SyncOptions, SyncOutcome};

/// How to obtain the store directory before a command runs.
#[derive(Debug, Clone, Copy)]
pub enum SyncMode {
    /// Refresh remote caches first.
    Sync(SyncOptions),
    /// Use whatever is on disk.
    Offline,
}

/// Resolve `reference` to a directory, synchronizing unless offline.
pub fn open_store(config: &StoreConfig, reference: &str, mode: SyncMode) -> Result<PathBuf> {
    let synchronizer = StoreSynchronizer::new(config.clone());
    match mode {
        SyncMode::Sync(options) => {
            let outcome = synchronizer
                .sync(reference, options)
                .with_context(|| format!("Failed to open prompt store '{}'", reference.trim()))?;
            Ok(outcome.into_path())
        }
        SyncMode::Offline => {
            let path = synchronizer.resolve_path(reference)?;
            if !path.is_dir() {
                bail!(
                    "No cached prompt store at {} (run `promptlib sync` first)",
                    path.display()
                );
            }
            Ok(path)
        }
    }
}

/// `promptlib sync`: refresh the store and report where it lives.
pub fn run_sync(config: &StoreConfig, reference: &str, options: SyncOptions) -> Result<()> {
    let synchronizer = StoreSynchronizer::new(config.clone());
    let outcome = synchronizer
        .sync(reference, options)
        .with_context(|| format!("Failed to synchronize '{}'", reference.trim()))?;

    match &outcome {
        SyncOutcome::Local(path) => println!("Using local prompt store at {}", path.display()),
        SyncOutcome::Fresh(path) => println!("Prompt store synchronized at {}", path.display()),
        SyncOutcome::Stale { path, .. } => {
            println!("Using cached prompt store at {}", path.display());
        }
    }
    Ok(())
}

/// Prompts in scope: the configured prompt sets, or everything.
fn load_prompts(store: &Path, repo: Option<&RepoConfig>, all: bool) -> Result<Vec<Document>> {
    let prompts = match repo {
        Some(repo) if !all => select_prompts(store, repo.prompt_sets())?,
        _ => scan_prompts(store)?,
    };
    Ok(prompts)
}

/// Facets for `list` and `search`. Inside a repository, prompts are scoped
/// to its slug unless `--repo` names another or `--all` is given.
fn scoped_facets(facets: &FacetQuery, all: bool, repo_slug: Option<&str>) -> FacetQuery {
    let mut facets = facets.clone();
    if !all && facets.repo.is_none() {
        facets.repo = repo_slug.map(str::to_string);
    }
    facets
}

pub struct ListArgs {
    pub all: bool,
    pub facets: FacetQuery,
    pub repo_slug: Option<String>,
    pub json: bool,
}

/// `promptlib list`: prompts matching the facet filters.
pub fn run_list(store: &Path, repo: Option<&RepoConfig>, args: &ListArgs) -> Result<()> {
    let facets = scoped_facets(&args.facets, args.all, args.repo_slug.as_deref());
    let prompts = facets.apply(load_prompts(store, repo, args.all)?);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&prompts)?);
        return Ok(());
    }

    if prompts.is_empty() {
        println!("No prompts.");
        return Ok(());
    }

    for doc in &prompts {
        print_summary(doc);
    }
    println!();
    println!("{} prompt(s)", prompts.len());
    Ok(())
}

pub struct SearchArgs {
    pub query: String,
    pub exact: bool,
    pub all: bool,
    pub facets: FacetQuery,
    pub repo_slug: Option<String>,
    pub options: SearchOptions,
    pub json: bool,
}

/// `promptlib search`: ranked (or exact) matches for a query.
pub fn run_search(store: &Path, repo: Option<&RepoConfig>, args: &SearchArgs) -> Result<()> {
    let facets = scoped_facets(&args.facets, args.all, args.repo_slug.as_deref());
    let prompts = facets.apply(load_prompts(store, repo, args.all)?);

    if args.exact {
        let mut hits = exact_search(&prompts, &args.query)?;
        if let Some(limit) = args.options.limit {
            hits.truncate(limit);
        }
        if args.json {
            println!("{}", serde_json::to_string_pretty(&hits)?);
            return Ok(());
        }
        if hits.is_empty() {
            println!("No results.");
        }
        for doc in hits {
            print_summary(doc);
        }
        return Ok(());
    }

    let hits = rank(&prompts, &args.query, &args.options)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }
    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }
    for (i, hit) in hits.iter().enumerate() {
        println!(
            "{}. [{:.2}] {}",
            i + 1,
            hit.score,
            describe(hit.document)
        );
    }
    Ok(())
}

/// `promptlib show`: print one prompt body with variables substituted.
///
/// With `repo_slug`, prompts scoped to other repositories are not found.
pub fn run_show(
    store: &Path,
    id: &str,
    vars: &[(String, String)],
    metadata: bool,
    repo_slug: Option<&str>,
) -> Result<()> {
    let prompts = filter_by_repo(scan_prompts(store)?, repo_slug);
    let Some(doc) = find_by_id(&prompts, id) else {
        match repo_slug {
            Some(slug) => bail!("Prompt not found in repo '{}': {} (use --all)", slug, id.trim()),
            None => bail!("Prompt not found: {}", id.trim()),
        }
    };

    let assignments: HashMap<String, String> = vars.iter().cloned().collect();
    let rendered = apply_variables(doc.body(), &assignments);

    if metadata {
        let meta = doc.metadata();
        println!("--- Prompt ---");
        println!("id:      {}", meta.id());
        if let Some(title) = meta.title() {
            println!("title:   {}", title);
        }
        println!("version: {}", meta.version());
        println!("tags:    {}", meta.tags().join(", "));
        println!("repos:   {}", meta.repos().join(", "));
        println!("agents:  {}", meta.agents().join(", "));
        println!("path:    {}", doc.path().display());
        println!();
        println!("--- Body ---");
    }
    println!("{}", rendered.text);

    if !rendered.missing.is_empty() {
        let names: Vec<&str> = rendered.missing.iter().map(String::as_str).collect();
        eprintln!("Warning: unassigned variables: {}", names.join(", "));
    }
    Ok(())
}

/// One rule in `promptlib rules --json` output.
#[derive(Serialize)]
struct RuleEntry<'a> {
    id: &'a str,
    tags: &'a [String],
    repos: &'a [String],
    agents: &'a [String],
    version: &'a str,
    body: &'a str,
    /// Path relative to the store root.
    source: String,
}

impl<'a> RuleEntry<'a> {
    fn new(doc: &'a Document, store: &Path) -> Self {
        let meta = doc.metadata();
        let path = doc.path();
        let source = path.strip_prefix(store).unwrap_or(path);
        RuleEntry {
            id: meta.id(),
            tags: meta.tags(),
            repos: meta.repos(),
            agents: meta.agents(),
            version: meta.version(),
            body: doc.body(),
            source: source.to_string_lossy().into_owned(),
        }
    }
}

/// `promptlib rules`: concatenate the configured rule sets.
pub fn run_rules(
    store: &Path,
    repo: Option<&RepoConfig>,
    facets: &FacetQuery,
    json: bool,
) -> Result<()> {
    let Some(repo) = repo else {
        bail!("No repository configuration found; rule sets come from .promptlib.toml");
    };

    let rules = facets.apply(select_rules(store, repo.rules())?);
    if json {
        let root = store.canonicalize().unwrap_or_else(|_| store.to_path_buf());
        let entries: Vec<RuleEntry<'_>> = rules.iter().map(|r| RuleEntry::new(r, &root)).collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if rules.is_empty() {
        println!("No rules.");
        return Ok(());
    }

    for (i, rule) in rules.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("# {}", rule.id());
        println!();
        println!("{}", rule.body());
    }
    Ok(())
}

fn print_summary(doc: &Document) {
    println!("{}", describe(doc));
}

fn describe(doc: &Document) -> String {
    let meta = doc.metadata();
    let mut line = format!("{} (v{})", meta.id(), meta.version());
    if let Some(title) = meta.title() {
        line.push_str(&format!(" {}", title));
    }
    if !meta.tags().is_empty() {
        line.push_str(&format!(" [{}]", meta.tags().join(", ")));
    }
    line
}
