//! Prompt store synchronization.
//!
//! A store reference is either a local directory, used in place, or a remote
//! git URL mirrored into a cache directory under the configured store root.
//!
//! # Cache Layout
//!
//! ```text
//! <store_root>/
//!   team-prompts-3f2a9c1b7d04/     ← slug of the URL tail + short hash
//!     .git/
//!     prompts/
//!     rules/
//! ```
//!
//! # Refresh
//!
//! | Cache state            | Action                                      |
//! |------------------------|---------------------------------------------|
//! | absent                 | shallow, single-branch clone without tags   |
//! | present, not a repo    | delete, then clone                          |
//! | present, check fails   | refresh failed; cache kept                  |
//! | present, valid repo    | fetch, hard reset, clean, pull              |
//!
//! When the refresh fails but a cache with `.git/` already exists, the cache
//! is served as [`SyncOutcome::Stale`] and a warning is logged. Without a
//! usable cache the failure is returned as [`SyncError::Unavailable`].
//!
//! Git runs non-interactively (`GIT_TERMINAL_PROMPT=0`) and every command is
//! bounded by the configured timeout.

use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;

/// Written into `.git/` after every successful refresh; its mtime is the
/// cache age.
const SYNC_STAMP: &str = "promptlib-synced";

const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Error, Debug)]
pub enum GitError {
    #[error("failed to run git {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("git {command} failed: {stderr}")]
    Failed { command: String, stderr: String },

    #[error("git {command} timed out after {}s", .timeout.as_secs())]
    TimedOut { command: String, timeout: Duration },

    #[error("failed to prepare cache directory {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("store reference cannot be blank")]
    BlankReference,

    #[error("local prompt store not found: {}", .0.display())]
    LocalPathMissing(PathBuf),

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unable to synchronize prompt store '{reference}'")]
    Unavailable {
        reference: String,
        #[source]
        source: GitError,
    },

    #[error(
        "cached store at {} is {}s old, beyond the allowed {}s",
        .path.display(),
        .age.as_secs(),
        .max_age.as_secs()
    )]
    CacheTooOld {
        path: PathBuf,
        age: Duration,
        max_age: Duration,
        #[source]
        source: GitError,
    },
}

// ═══════════════════════════════════════════════════════════════════════
// References
// ═══════════════════════════════════════════════════════════════════════

/// A classified store reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreReference {
    Local(PathBuf),
    Remote(String),
}

/// Classify a raw reference. Blank references are rejected.
pub fn classify_reference(raw: &str) -> Result<StoreReference, SyncError> {
    let cleaned = raw.trim();
    if cleaned.is_empty() {
        return Err(SyncError::BlankReference);
    }
    if is_local_reference(cleaned) {
        Ok(StoreReference::Local(PathBuf::from(cleaned)))
    } else {
        Ok(StoreReference::Remote(cleaned.to_string()))
    }
}

/// `true` for URL-shaped references: anything with a scheme, or scp-style
/// `git@host:path`.
pub fn looks_like_remote(reference: &str) -> bool {
    let reference = reference.trim();
    reference.contains("://") || reference.starts_with("git@") || reference.starts_with("ssh://")
}

/// `true` when the reference names a local directory.
///
/// Remote-looking references are never local. Otherwise a reference is local
/// when it exists, is absolute, or is written relative (`./`, `../`).
pub fn is_local_reference(reference: &str) -> bool {
    let cleaned = reference.trim();
    if cleaned.is_empty() || looks_like_remote(cleaned) {
        return false;
    }
    let candidate = Path::new(cleaned);
    if candidate.exists() || candidate.is_absolute() {
        return true;
    }
    cleaned == "."
        || cleaned == ".."
        || cleaned.starts_with("./")
        || cleaned.starts_with("../")
}

/// Cache directory name for a remote reference.
///
/// The last path segment (after `/` or `:`), minus `.git`, lowercased with
/// runs of other characters collapsed to `-`, then `-` and the reference's
/// short hash. Falls back to `store` when nothing usable is left.
pub fn cache_dir_name(reference: &str) -> String {
    let tail = reference.rsplit('/').next().unwrap_or(reference);
    let tail = tail.rsplit(':').next().unwrap_or(tail);
    let tail = tail.strip_suffix(".git").unwrap_or(tail).to_lowercase();

    let mut slug = String::with_capacity(tail.len());
    let mut in_gap = false;
    for ch in tail.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' {
            slug.push(ch);
            in_gap = false;
        } else if !in_gap {
            slug.push('-');
            in_gap = true;
        }
    }

    let slug = slug.trim_matches('-');
    let slug = if slug.is_empty() { "store" } else { slug };
    format!("{}-{}", slug, short_hash(reference))
}

/// First 12 hex characters of the SHA-256 of `s`.
fn short_hash(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    hash[..12].to_string()
}

// ═══════════════════════════════════════════════════════════════════════
// Cache Management
// ═══════════════════════════════════════════════════════════════════════

/// Create the store root if needed and return it.
pub fn ensure_store_root(config: &StoreConfig) -> Result<&Path, SyncError> {
    let root = config.store_root.as_path();
    std::fs::create_dir_all(root).map_err(|source| SyncError::Io {
        path: root.to_path_buf(),
        source,
    })?;
    Ok(root)
}

/// Where a reference lives on disk. Local references resolve to themselves.
pub fn store_path(config: &StoreConfig, reference: &StoreReference) -> PathBuf {
    match reference {
        StoreReference::Local(path) => path.clone(),
        StoreReference::Remote(url) => config.store_root.join(cache_dir_name(url)),
    }
}

/// Remove a cache directory. Missing directories are not an error.
pub fn clear_store_cache(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// A cache is usable as a fallback when it contains `.git/`.
pub fn has_valid_cache(path: &Path) -> bool {
    path.join(".git").exists()
}

/// Time since the cache was last refreshed.
///
/// Uses the sync stamp when present, otherwise the `.git/` directory.
pub fn cache_age(path: &Path) -> Option<Duration> {
    let git_dir = path.join(".git");
    let stamp = git_dir.join(SYNC_STAMP);
    let modified = std::fs::metadata(&stamp)
        .or_else(|_| std::fs::metadata(&git_dir))
        .and_then(|m| m.modified())
        .ok()?;
    Some(
        SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO),
    )
}

fn touch_sync_stamp(path: &Path) {
    let stamp = path.join(".git").join(SYNC_STAMP);
    if let Err(e) = std::fs::write(&stamp, b"") {
        debug!(path = %stamp.display(), error = %e, "could not write sync stamp");
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Git Backend
// ═══════════════════════════════════════════════════════════════════════

/// The git operations the synchronizer needs.
pub trait GitBackend {
    /// Shallow, single-branch clone of `url` into `dest` without tags.
    fn clone_shallow(&self, url: &str, dest: &Path, timeout: Duration) -> Result<(), GitError>;

    /// `Ok(true)` when `dir` is the top of a git working tree, `Ok(false)`
    /// when it definitely is not. `Err` when git could not answer.
    fn is_repository(&self, dir: &Path, timeout: Duration) -> Result<bool, GitError>;

    /// Bring `dir` to the remote's latest state, discarding local changes.
    fn update(&self, dir: &Path, timeout: Duration) -> Result<(), GitError>;
}

/// [`GitBackend`] that shells out to the `git` executable.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemGit;

impl GitBackend for SystemGit {
    fn clone_shallow(&self, url: &str, dest: &Path, timeout: Duration) -> Result<(), GitError> {
        let dest_arg = dest.to_string_lossy();
        run_git(
            &[
                "clone",
                "--depth",
                "1",
                "--single-branch",
                "--no-tags",
                "--quiet",
                url,
                &dest_arg,
            ],
            None,
            timeout,
        )
        .map(drop)
    }

    fn is_repository(&self, dir: &Path, timeout: Duration) -> Result<bool, GitError> {
        if !dir.join(".git").exists() {
            return Ok(false);
        }
        match run_git(&["rev-parse", "--git-dir"], Some(dir), timeout) {
            Ok(out) => Ok(out.trim() == ".git"),
            // git ran and rejected the directory
            Err(GitError::Failed { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn update(&self, dir: &Path, timeout: Duration) -> Result<(), GitError> {
        run_git(&["fetch", "--all", "--tags", "--prune", "--quiet"], Some(dir), timeout)?;
        run_git(&["reset", "--hard", "--quiet", "origin/HEAD"], Some(dir), timeout)?;
        run_git(&["clean", "-x", "-d", "-f", "-q"], Some(dir), timeout)?;
        run_git(&["pull", "--quiet"], Some(dir), timeout)?;
        Ok(())
    }
}

/// Run one git command with a deadline and return its stdout.
fn run_git(args: &[&str], cwd: Option<&Path>, timeout: Duration) -> Result<String, GitError> {
    run_program("git", args, cwd, timeout)
}

/// Spawn `program`, drain its output while waiting, and kill it at the
/// deadline. Errors are labelled with the first argument.
fn run_program(
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
    timeout: Duration,
) -> Result<String, GitError> {
    let command = args.first().copied().unwrap_or_default().to_string();

    let mut cmd = Command::new(program);
    cmd.args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    debug!(program, ?args, "running command");
    let mut child = cmd.spawn().map_err(|source| GitError::Spawn {
        command: command.clone(),
        source,
    })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(source) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(GitError::Spawn { command, source });
            }
        }
        if Instant::now() >= deadline {
            // Readers are left detached: a helper process may still hold the pipes.
            let _ = child.kill();
            let _ = child.wait();
            return Err(GitError::TimedOut { command, timeout });
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();

    if !status.success() {
        let stderr = String::from_utf8_lossy(&stderr).trim().to_string();
        return Err(GitError::Failed { command, stderr });
    }

    Ok(String::from_utf8_lossy(&stdout).into_owned())
}

/// Read a child pipe to the end on its own thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

// ═══════════════════════════════════════════════════════════════════════
// Synchronizer
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Delete the cache and clone from scratch.
    pub force_refresh: bool,
}

/// Where the documents came from after a sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A local directory, used as-is.
    Local(PathBuf),
    /// A cache that was just cloned or updated.
    Fresh(PathBuf),
    /// A cache that could not be refreshed and is served from its last sync.
    Stale { path: PathBuf, reason: String },
}

impl SyncOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Local(path) | Self::Fresh(path) | Self::Stale { path, .. } => path,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }

    pub fn into_path(self) -> PathBuf {
        match self {
            Self::Local(path) | Self::Fresh(path) | Self::Stale { path, .. } => path,
        }
    }
}

/// Resolves store references to directories, refreshing remote caches.
pub struct StoreSynchronizer<G = SystemGit> {
    config: StoreConfig,
    git: G,
}

impl StoreSynchronizer<SystemGit> {
    pub fn new(config: StoreConfig) -> Self {
        Self::with_backend(config, SystemGit)
    }
}

impl<G: GitBackend> StoreSynchronizer<G> {
    pub fn with_backend(config: StoreConfig, git: G) -> Self {
        Self { config, git }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Resolve `reference` to a directory holding `prompts/` and `rules/`.
    ///
    /// Local references are never copied or refreshed. Remote references
    /// are cloned or updated; on failure an existing cache is served stale.
    pub fn sync(&self, reference: &str, options: SyncOptions) -> Result<SyncOutcome, SyncError> {
        match classify_reference(reference)? {
            StoreReference::Local(path) => {
                if !path.exists() {
                    return Err(SyncError::LocalPathMissing(path));
                }
                let resolved = path
                    .canonicalize()
                    .map_err(|source| SyncError::Io { path, source })?;
                debug!(path = %resolved.display(), "using local prompt store");
                Ok(SyncOutcome::Local(resolved))
            }
            StoreReference::Remote(url) => self.sync_remote(&url, options),
        }
    }

    /// Path a reference would use, without touching the network.
    pub fn resolve_path(&self, reference: &str) -> Result<PathBuf, SyncError> {
        Ok(store_path(&self.config, &classify_reference(reference)?))
    }

    fn sync_remote(&self, url: &str, options: SyncOptions) -> Result<SyncOutcome, SyncError> {
        let root = ensure_store_root(&self.config)?;
        let path = root.join(cache_dir_name(url));

        if options.force_refresh {
            info!(path = %path.display(), "clearing cached store");
            clear_store_cache(&path).map_err(|source| SyncError::Io {
                path: path.clone(),
                source,
            })?;
        }

        let err = match self.refresh(url, &path) {
            Ok(()) => {
                touch_sync_stamp(&path);
                return Ok(SyncOutcome::Fresh(path));
            }
            Err(err) => err,
        };

        if !has_valid_cache(&path) {
            return Err(SyncError::Unavailable {
                reference: url.to_string(),
                source: err,
            });
        }

        if let (Some(max_age), Some(age)) = (self.config.max_cache_age(), cache_age(&path)) {
            if age > max_age {
                return Err(SyncError::CacheTooOld {
                    path,
                    age,
                    max_age,
                    source: err,
                });
            }
        }

        warn!(
            reference = url,
            path = %path.display(),
            error = %err,
            "Falling back to cached content"
        );
        Ok(SyncOutcome::Stale {
            path,
            reason: err.to_string(),
        })
    }

    fn refresh(&self, url: &str, path: &Path) -> Result<(), GitError> {
        let timeout = self.config.sync_timeout();

        if path.exists() {
            if self.git.is_repository(path, timeout)? {
                info!(reference = url, path = %path.display(), "updating cached store");
                return self.git.update(path, timeout);
            }
            warn!(path = %path.display(), "cache is not a git repository, recloning");
            clear_store_cache(path).map_err(|source| GitError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }

        info!(reference = url, path = %path.display(), "cloning prompt store");
        self.git.clone_shallow(url, path, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records calls; clones create `dest/.git` unless told to fail.
    #[derive(Default)]
    struct MockGit {
        calls: RefCell<Vec<String>>,
        fail_clone: bool,
        fail_update: bool,
        fail_check: bool,
        repository: bool,
    }

    impl GitBackend for MockGit {
        fn clone_shallow(&self, url: &str, dest: &Path, _timeout: Duration) -> Result<(), GitError> {
            self.calls.borrow_mut().push(format!("clone {url}"));
            if self.fail_clone {
                return Err(GitError::Failed {
                    command: "clone".into(),
                    stderr: "network unreachable".into(),
                });
            }
            std::fs::create_dir_all(dest.join(".git")).unwrap();
            std::fs::create_dir_all(dest.join("prompts")).unwrap();
            Ok(())
        }

        fn is_repository(&self, _dir: &Path, _timeout: Duration) -> Result<bool, GitError> {
            self.calls.borrow_mut().push("is_repository".into());
            if self.fail_check {
                return Err(GitError::TimedOut {
                    command: "rev-parse".into(),
                    timeout: Duration::from_secs(1),
                });
            }
            Ok(self.repository)
        }

        fn update(&self, _dir: &Path, _timeout: Duration) -> Result<(), GitError> {
            self.calls.borrow_mut().push("update".into());
            if self.fail_update {
                return Err(GitError::TimedOut {
                    command: "fetch".into(),
                    timeout: Duration::from_secs(5),
                });
            }
            Ok(())
        }
    }

    fn config(root: &Path) -> StoreConfig {
        StoreConfig::new(root.join("store"))
    }

    const URL: &str = "https://github.com/acme/Team_Prompts.git";

    #[test]
    fn test_looks_like_remote() {
        assert!(looks_like_remote("https://github.com/acme/prompts"));
        assert!(looks_like_remote("git@github.com:acme/prompts"));
        assert!(looks_like_remote("ssh://git@example.com/prompts"));
        assert!(!looks_like_remote("./prompts"));
        assert!(!looks_like_remote("prompts.git"));
    }

    #[test]
    fn test_is_local_reference() {
        assert!(is_local_reference("./store"));
        assert!(is_local_reference("../store"));
        assert!(is_local_reference("/definitely/not/here"));
        assert!(!is_local_reference("  "));
        assert!(!is_local_reference("acme-prompts"));
        assert!(!is_local_reference(URL));

        let dir = tempfile::tempdir().unwrap();
        assert!(is_local_reference(&dir.path().to_string_lossy()));
    }

    #[test]
    fn test_cache_dir_name() {
        let name = cache_dir_name(URL);
        assert_eq!(name, format!("team-prompts-{}", short_hash(URL)));
        assert_eq!(short_hash(URL).len(), 12);

        assert!(cache_dir_name("git@github.com:acme/prompts.git").starts_with("prompts-"));
        assert!(cache_dir_name("host:repo").starts_with("repo-"));
        assert!(cache_dir_name("https://example.com/___.git").starts_with("store-"));
        assert_ne!(
            cache_dir_name("https://a.example/prompts.git"),
            cache_dir_name("https://b.example/prompts.git")
        );
    }

    #[test]
    fn test_classify_reference() {
        assert_eq!(
            classify_reference(" ./store ").unwrap(),
            StoreReference::Local(PathBuf::from("./store"))
        );
        assert_eq!(
            classify_reference(URL).unwrap(),
            StoreReference::Remote(URL.to_string())
        );
        assert!(matches!(classify_reference(""), Err(SyncError::BlankReference)));
    }

    #[test]
    fn test_blank_reference_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let sync = StoreSynchronizer::with_backend(config(dir.path()), MockGit::default());
        assert!(matches!(
            sync.sync("   ", SyncOptions::default()),
            Err(SyncError::BlankReference)
        ));
    }

    #[test]
    fn test_local_reference_used_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("local-store");
        std::fs::create_dir_all(local.join("prompts")).unwrap();

        let git = MockGit::default();
        let sync = StoreSynchronizer::with_backend(config(dir.path()), git);
        let outcome = sync
            .sync(
                &local.to_string_lossy(),
                SyncOptions {
                    force_refresh: true,
                },
            )
            .unwrap();

        assert_eq!(outcome, SyncOutcome::Local(local.canonicalize().unwrap()));
        assert!(sync.git.calls.borrow().is_empty());
        assert!(local.join("prompts").exists());
        assert!(!dir.path().join("store").exists());
    }

    #[test]
    fn test_missing_local_reference() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let sync = StoreSynchronizer::with_backend(config(dir.path()), MockGit::default());
        let err = sync
            .sync(&missing.to_string_lossy(), SyncOptions::default())
            .unwrap_err();
        assert!(matches!(err, SyncError::LocalPathMissing(p) if p == missing));
    }

    #[test]
    fn test_clone_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let sync = StoreSynchronizer::with_backend(config(dir.path()), MockGit::default());
        let outcome = sync.sync(URL, SyncOptions::default()).unwrap();

        let expected = dir.path().join("store").join(cache_dir_name(URL));
        assert_eq!(outcome, SyncOutcome::Fresh(expected.clone()));
        assert_eq!(*sync.git.calls.borrow(), [format!("clone {URL}")]);
        assert!(expected.join(".git").join(SYNC_STAMP).exists());
    }

    #[test]
    fn test_update_when_valid() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let path = cfg.store_root.join(cache_dir_name(URL));
        std::fs::create_dir_all(path.join(".git")).unwrap();

        let git = MockGit {
            repository: true,
            ..MockGit::default()
        };
        let sync = StoreSynchronizer::with_backend(cfg, git);
        let outcome = sync.sync(URL, SyncOptions::default()).unwrap();

        assert_eq!(outcome, SyncOutcome::Fresh(path));
        assert_eq!(*sync.git.calls.borrow(), ["is_repository", "update"]);
    }

    #[test]
    fn test_reclone_when_cache_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let path = cfg.store_root.join(cache_dir_name(URL));
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("leftover.txt"), "junk").unwrap();

        let sync = StoreSynchronizer::with_backend(cfg, MockGit::default());
        sync.sync(URL, SyncOptions::default()).unwrap();

        assert_eq!(
            *sync.git.calls.borrow(),
            ["is_repository".to_string(), format!("clone {URL}")]
        );
        assert!(!path.join("leftover.txt").exists());
        assert!(path.join(".git").exists());
    }

    #[test]
    fn test_failed_repository_check_keeps_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let path = cfg.store_root.join(cache_dir_name(URL));
        std::fs::create_dir_all(path.join(".git")).unwrap();
        std::fs::create_dir_all(path.join("prompts")).unwrap();
        std::fs::write(path.join("prompts/keep.md"), "kept").unwrap();

        let git = MockGit {
            fail_check: true,
            fail_clone: true,
            ..MockGit::default()
        };
        let sync = StoreSynchronizer::with_backend(cfg, git);
        let outcome = sync.sync(URL, SyncOptions::default()).unwrap();

        match &outcome {
            SyncOutcome::Stale { path: stale, reason } => {
                assert_eq!(stale, &path);
                assert!(reason.contains("rev-parse timed out"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(*sync.git.calls.borrow(), ["is_repository"]);
        assert!(path.join(".git").is_dir());
        assert!(path.join("prompts/keep.md").exists());
    }

    #[test]
    fn test_system_git_without_git_dir_is_not_a_repository() {
        let dir = tempfile::tempdir().unwrap();
        let found = SystemGit
            .is_repository(dir.path(), Duration::from_secs(5))
            .unwrap();
        assert!(!found);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_program_drains_large_stderr() {
        let started = Instant::now();
        let err = run_program(
            "sh",
            &["-c", "head -c 200000 /dev/zero | tr '\\0' x >&2; exit 1"],
            None,
            Duration::from_secs(10),
        )
        .unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(10));
        match err {
            GitError::Failed { stderr, .. } => assert_eq!(stderr.len(), 200_000),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_run_program_drains_large_stdout() {
        let out = run_program(
            "sh",
            &["-c", "head -c 200000 /dev/zero | tr '\\0' y"],
            None,
            Duration::from_secs(10),
        )
        .unwrap();
        assert_eq!(out.len(), 200_000);
    }

    #[test]
    fn test_force_refresh_clears_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let path = cfg.store_root.join(cache_dir_name(URL));
        std::fs::create_dir_all(path.join(".git")).unwrap();
        std::fs::write(path.join("stale.md"), "old").unwrap();

        let git = MockGit {
            repository: true,
            ..MockGit::default()
        };
        let sync = StoreSynchronizer::with_backend(cfg, git);
        sync.sync(
            URL,
            SyncOptions {
                force_refresh: true,
            },
        )
        .unwrap();

        assert_eq!(*sync.git.calls.borrow(), [format!("clone {URL}")]);
        assert!(!path.join("stale.md").exists());
    }

    #[test]
    fn test_falls_back_to_stale_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let path = cfg.store_root.join(cache_dir_name(URL));
        std::fs::create_dir_all(path.join(".git")).unwrap();

        let git = MockGit {
            repository: true,
            fail_update: true,
            ..MockGit::default()
        };
        let sync = StoreSynchronizer::with_backend(cfg, git);
        let outcome = sync.sync(URL, SyncOptions::default()).unwrap();

        assert!(outcome.is_stale());
        assert_eq!(outcome.path(), path);
        match outcome {
            SyncOutcome::Stale { reason, .. } => assert!(reason.contains("timed out")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_unavailable_without_cache() {
        let dir = tempfile::tempdir().unwrap();
        let git = MockGit {
            fail_clone: true,
            ..MockGit::default()
        };
        let sync = StoreSynchronizer::with_backend(config(dir.path()), git);
        let err = sync.sync(URL, SyncOptions::default()).unwrap_err();
        match err {
            SyncError::Unavailable { reference, source } => {
                assert_eq!(reference, URL);
                assert!(matches!(source, GitError::Failed { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cache_too_old() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.max_cache_age_secs = Some(0);
        let path = cfg.store_root.join(cache_dir_name(URL));
        std::fs::create_dir_all(path.join(".git")).unwrap();
        std::thread::sleep(Duration::from_millis(1100));

        let git = MockGit {
            repository: true,
            fail_update: true,
            ..MockGit::default()
        };
        let sync = StoreSynchronizer::with_backend(cfg, git);
        let err = sync.sync(URL, SyncOptions::default()).unwrap_err();
        assert!(matches!(err, SyncError::CacheTooOld { .. }));
    }

    #[test]
    fn test_clear_missing_cache_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(clear_store_cache(&dir.path().join("absent")).is_ok());
    }

    #[test]
    fn test_resolve_path_without_sync() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let expected = cfg.store_root.join(cache_dir_name(URL));
        let sync = StoreSynchronizer::with_backend(cfg, MockGit::default());
        assert_eq!(sync.resolve_path(URL).unwrap(), expected);
        assert!(sync.git.calls.borrow().is_empty());
    }
}
