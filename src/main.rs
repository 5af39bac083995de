//! # promptlib CLI
//!
//! The `promptlib` binary mirrors a shared prompt and rule library into a
//! local cache and lets you list, search and render its documents.
//!
//! ## Usage
//!
//! ```bash
//! promptlib [--config promptlib.toml] [--store <ref>] <command>
//! ```
//!
//! The store reference comes from `--store` or from `central_repo` in the
//! repository's `.promptlib.toml`.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `promptlib sync` | Clone or update the cached store |
//! | `promptlib list` | List prompts, optionally filtered by repo, tag or agent |
//! | `promptlib search <query>` | Ranked (or `--exact`) prompt search |
//! | `promptlib show <id>` | Print a prompt with `--var KEY=VALUE` substitutions |
//! | `promptlib rules` | Print the configured rule sets |
//!
//! ## Examples
//!
//! ```bash
//! # Refresh the cache from scratch
//! promptlib sync --refresh
//!
//! # Prompts tagged both `reviews` and `python`
//! promptlib list --tag reviews --tag python --all-tags
//!
//! # Fuzzy search against a local checkout, as JSON
//! promptlib --store ./prompt-library search reviewpr --json
//!
//! # Render a prompt
//! promptlib show review-pr --var repo=promptlib
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use promptlib::commands::{self, ListArgs, SearchArgs, SyncMode};
use promptlib::config::{self, StoreConfig};
use promptlib::logging;
use promptlib::store::SyncOptions;
use promptlib_core::search::DEFAULT_FUZZY_THRESHOLD;
use promptlib_core::{FacetQuery, RepoConfig, SearchOptions};

/// promptlib: a locally cached, searchable mirror of a shared prompt and
/// rule library.
#[derive(Parser)]
#[command(
    name = "promptlib",
    about = "A locally cached, searchable mirror of a shared prompt and rule library",
    version
)]
struct Cli {
    /// Path to the tool configuration file (TOML).
    ///
    /// Optional. Controls the cache root, git timeout, environment
    /// prefix and maximum stale-cache age.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store reference (git URL or local directory).
    ///
    /// Overrides `central_repo` from `.promptlib.toml`.
    #[arg(long, global = true)]
    store: Option<String>,

    /// Use the cached store without contacting the remote.
    #[arg(long, global = true)]
    offline: bool,

    /// Delete the cached store and clone it again.
    #[arg(long, global = true, conflicts_with = "offline")]
    refresh: bool,

    /// Enable debug logging on stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Clone or update the cached prompt store.
    ///
    /// Local store references are used in place. If a remote cannot be
    /// reached, an existing cache is used and a warning is printed.
    Sync,

    /// List prompts.
    ///
    /// By default only the configured prompt sets are listed, scoped to the
    /// current repository; `--all` lists every prompt in the store.
    List {
        #[command(flatten)]
        facets: FacetArgs,

        /// Ignore configured prompt sets and repository scoping.
        #[arg(long)]
        all: bool,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Search prompts.
    ///
    /// Ranks prompts by how many query terms they contain, falling back to
    /// fuzzy matching against prompt ids.
    Search {
        /// The search query.
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Match the whole query as one case-insensitive substring.
        #[arg(long)]
        exact: bool,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,

        /// Minimum fuzzy similarity (0.0 to 1.0) for id-only matches.
        #[arg(long, default_value_t = DEFAULT_FUZZY_THRESHOLD)]
        threshold: f64,

        #[command(flatten)]
        facets: FacetArgs,

        /// Search every prompt, ignoring prompt sets and repository scoping.
        #[arg(long)]
        all: bool,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Print a prompt by id.
    Show {
        /// Prompt id (case-insensitive).
        id: String,

        /// Variable assignments as `KEY=VALUE` pairs.
        #[arg(long = "var", value_parser = parse_key_val)]
        vars: Vec<(String, String)>,

        /// Print metadata before the body.
        #[arg(long)]
        metadata: bool,

        /// Look up prompts scoped to any repository.
        #[arg(long)]
        all: bool,
    },

    /// Print the rule sets configured in `.promptlib.toml`.
    Rules {
        #[command(flatten)]
        facets: FacetArgs,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

/// Repo/tag/agent filters shared by several commands.
#[derive(Args)]
struct FacetArgs {
    /// Only documents scoped to this repository (or unscoped). Defaults to
    /// the current repository's directory name for `list` and `search`.
    #[arg(long)]
    repo: Option<String>,

    /// Tag filter; repeat or comma-separate for several.
    #[arg(long = "tag", value_delimiter = ',')]
    tags: Vec<String>,

    /// Require every tag instead of any.
    #[arg(long)]
    all_tags: bool,

    /// Agent filter; repeat or comma-separate for several.
    #[arg(long = "agent", value_delimiter = ',')]
    agents: Vec<String>,
}

impl From<FacetArgs> for FacetQuery {
    fn from(args: FacetArgs) -> Self {
        FacetQuery {
            repo: args.repo,
            tags: args.tags,
            match_all_tags: args.all_tags,
            agents: args.agents,
        }
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    promptlib_core::parse_assignment(s).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, std::env::var("RUST_LOG").ok().as_deref());

    let home = std::env::var_os("HOME").map(PathBuf::from);
    let env: HashMap<String, String> = std::env::vars().collect();
    let cwd = std::env::current_dir().context("Failed to determine working directory")?;

    let store_config = config::load_store_config(cli.config.as_deref(), home.as_deref())?;
    let repo = resolve_repo_config(&cli, &cwd, &env, &store_config, home.as_deref())?;
    let repo_slug = config::repo_slug(&cwd);
    let reference = match (&repo, &cli.store) {
        (Some(repo), _) => repo.central_repo().to_string(),
        (None, Some(store)) => config::expand_tilde(Path::new(store.trim()), home.as_deref())
            .to_string_lossy()
            .into_owned(),
        (None, None) => anyhow::bail!("No store configured; pass --store or add .promptlib.toml"),
    };

    let options = SyncOptions {
        force_refresh: cli.refresh,
    };
    if let Commands::Sync = cli.command {
        return commands::run_sync(&store_config, &reference, options);
    }

    let mode = if cli.offline {
        SyncMode::Offline
    } else {
        SyncMode::Sync(options)
    };
    let store = commands::open_store(&store_config, &reference, mode)?;

    match cli.command {
        Commands::Sync => {}
        Commands::List { facets, all, json } => {
            let args = ListArgs {
                all,
                facets: facets.into(),
                repo_slug,
                json,
            };
            commands::run_list(&store, repo.as_ref(), &args)?;
        }
        Commands::Search {
            query,
            exact,
            limit,
            threshold,
            facets,
            all,
            json,
        } => {
            if !(0.0..=1.0).contains(&threshold) {
                anyhow::bail!("--threshold must be in [0.0, 1.0]");
            }
            let args = SearchArgs {
                query: query.join(" "),
                exact,
                all,
                facets: facets.into(),
                repo_slug,
                options: SearchOptions { threshold, limit },
                json,
            };
            commands::run_search(&store, repo.as_ref(), &args)?;
        }
        Commands::Show {
            id,
            vars,
            metadata,
            all,
        } => {
            let scope = if all { None } else { repo_slug.as_deref() };
            commands::run_show(&store, &id, &vars, metadata, scope)?;
        }
        Commands::Rules { facets, json } => {
            commands::run_rules(&store, repo.as_ref(), &facets.into(), json)?;
        }
    }

    Ok(())
}

/// Repository config for the working directory.
///
/// Outside a git repository this is `None` when `--store` is given and an
/// error otherwise. `--store` takes precedence over `central_repo`.
fn resolve_repo_config(
    cli: &Cli,
    cwd: &Path,
    env: &HashMap<String, String>,
    store_config: &StoreConfig,
    home: Option<&Path>,
) -> Result<Option<RepoConfig>> {
    if let Err(e) = config::find_repo_root(cwd) {
        return match cli.store {
            Some(_) => Ok(None),
            None => Err(e),
        };
    }

    let mut env = env.clone();
    if let Some(store) = &cli.store {
        env.insert(
            format!("{}CENTRAL_REPO", store_config.env_prefix),
            store.clone(),
        );
    }
    config::load_repo_config(cwd, &env, store_config, home).map(Some)
}
