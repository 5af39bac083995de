//! Configuration loading.
//!
//! Two layers:
//!
//! - **Tool config** ([`StoreConfig`]): an optional TOML file controlling
//!   where caches live and how long git may take.
//! - **Repository config** (`.promptlib.toml` at the repository root): which
//!   central store to use and which rule and prompt sets to pull from it.
//!   Environment variables named `<PREFIX>CENTRAL_REPO`, `<PREFIX>RULES`,
//!   `<PREFIX>PROMPT_SETS` and `<PREFIX>VERSION_LOCK` override the file.
//!
//! Environment and home directory are passed in explicitly so nothing below
//! the binary reads process state.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use promptlib_core::RepoConfig;

/// Repository configuration file name.
pub const REPO_CONFIG_FILE: &str = ".promptlib.toml";

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_root")]
    pub store_root: PathBuf,
    #[serde(default = "default_sync_timeout_secs")]
    pub sync_timeout_secs: u64,
    #[serde(default = "default_env_prefix")]
    pub env_prefix: String,
    /// Refuse stale caches older than this. Unset means any age is served.
    #[serde(default)]
    pub max_cache_age_secs: Option<u64>,
}

fn default_store_root() -> PathBuf {
    PathBuf::from("~/.promptlib/store")
}
fn default_sync_timeout_secs() -> u64 {
    5
}
fn default_env_prefix() -> String {
    "PROMPTLIB_".to_string()
}

impl StoreConfig {
    /// Defaults with an explicit store root.
    pub fn new(store_root: impl Into<PathBuf>) -> Self {
        Self {
            store_root: store_root.into(),
            sync_timeout_secs: default_sync_timeout_secs(),
            env_prefix: default_env_prefix(),
            max_cache_age_secs: None,
        }
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.sync_timeout_secs)
    }

    pub fn max_cache_age(&self) -> Option<Duration> {
        self.max_cache_age_secs.map(Duration::from_secs)
    }
}

/// Load the tool config, or defaults when `path` is `None`.
///
/// `~` in `store_root` expands against `home`.
pub fn load_store_config(path: Option<&Path>, home: Option<&Path>) -> Result<StoreConfig> {
    let content = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?,
        None => String::new(),
    };

    let mut config: StoreConfig =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if !(1..=30).contains(&config.sync_timeout_secs) {
        bail!("sync_timeout_secs must be in [1, 30]");
    }

    config.env_prefix = normalize_env_prefix(&config.env_prefix)?;
    config.store_root = expand_tilde(&config.store_root, home);

    Ok(config)
}

/// Uppercase the prefix and make sure it ends with `_`.
fn normalize_env_prefix(raw: &str) -> Result<String> {
    let prefix = raw.trim().to_uppercase();
    if prefix.is_empty() {
        bail!("env_prefix cannot be blank");
    }
    if prefix.ends_with('_') {
        Ok(prefix)
    } else {
        Ok(format!("{prefix}_"))
    }
}

/// Expand `~` at the start of a path to `home`.
pub fn expand_tilde(path: &Path, home: Option<&Path>) -> PathBuf {
    let s = path.to_string_lossy();
    if s.starts_with("~/") || s == "~" {
        if let Some(home) = home {
            return home.join(s.strip_prefix("~/").unwrap_or(""));
        }
    }
    path.to_path_buf()
}

// ═══════════════════════════════════════════════════════════════════════
// Repository Config
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RepoConfigFile {
    central_repo: Option<String>,
    #[serde(default)]
    rules: Vec<String>,
    #[serde(default)]
    prompt_sets: Vec<String>,
    version_lock: Option<String>,
}

/// Walk up from `start` to the nearest directory containing `.git`.
pub fn find_repo_root(start: &Path) -> Result<PathBuf> {
    let start = start
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", start.display()))?;
    let mut dir = if start.is_file() {
        start.parent().map(Path::to_path_buf).unwrap_or(start)
    } else {
        start
    };
    loop {
        if dir.join(".git").exists() {
            return Ok(dir);
        }
        if !dir.pop() {
            bail!("Not inside a git repository (no .git found above the working directory)");
        }
    }
}

/// The repository slug for `start`: the name of its git root directory.
/// `None` outside a git repository.
pub fn repo_slug(start: &Path) -> Option<String> {
    let root = find_repo_root(start).ok()?;
    root.file_name().map(|name| name.to_string_lossy().into_owned())
}

/// Load `.promptlib.toml` from the repository containing `start`, apply
/// environment overrides, and validate.
///
/// A missing file is fine as long as the environment names a central repo.
pub fn load_repo_config(
    start: &Path,
    env: &HashMap<String, String>,
    store: &StoreConfig,
    home: Option<&Path>,
) -> Result<RepoConfig> {
    let root = find_repo_root(start)?;
    let path = root.join(REPO_CONFIG_FILE);

    let mut file: RepoConfigFile = if path.exists() {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?
    } else {
        RepoConfigFile::default()
    };

    apply_env_overrides(&mut file, env, &store.env_prefix);

    let central_repo = file
        .central_repo
        .as_deref()
        .map(|r| expand_tilde(Path::new(r.trim()), home).to_string_lossy().into_owned())
        .unwrap_or_default();

    RepoConfig::new(
        &central_repo,
        &file.rules,
        &file.prompt_sets,
        file.version_lock.as_deref(),
    )
    .with_context(|| format!("Invalid repository configuration ({})", path.display()))
}

fn apply_env_overrides(file: &mut RepoConfigFile, env: &HashMap<String, String>, prefix: &str) {
    let lookup = |name: &str| env.get(&format!("{prefix}{name}"));

    if let Some(value) = lookup("CENTRAL_REPO") {
        file.central_repo = Some(value.clone());
    }
    if let Some(value) = lookup("VERSION_LOCK") {
        file.version_lock = Some(value.clone());
    }
    if let Some(value) = lookup("RULES") {
        file.rules = parse_env_list(value);
    }
    if let Some(value) = lookup("PROMPT_SETS") {
        file.prompt_sets = parse_env_list(value);
    }
}

/// Split a comma-separated environment value, dropping blank entries.
pub fn parse_env_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
