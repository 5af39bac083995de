//! Structured logging to stderr via `tracing`.
//!
//! `RUST_LOG` controls the filter unless `--verbose` forces `debug`. With
//! neither, only warnings (such as stale-cache fallbacks) are shown.

use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn";
const VERBOSE_FILTER: &str = "debug";

/// Build the filter for the given verbosity.
pub fn build_filter(verbose: bool, env_filter: Option<&str>) -> EnvFilter {
    if verbose {
        return EnvFilter::new(VERBOSE_FILTER);
    }
    env_filter
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(verbose: bool, env_filter: Option<&str>) {
    let stderr = std::io::stderr();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(verbose, env_filter))
        .with_writer(std::io::stderr)
        .with_ansi(stderr.is_terminal())
        .with_target(false)
        .try_init();
}
