//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Variable holding the filter directive, checked before `RUST_LOG`.
pub const LOG_VAR: &str = "FIBERSCOPE_LOG";

/// Filter directive to use: `FIBERSCOPE_LOG`, then `RUST_LOG`, then `info`
/// (`debug` when `verbose`).
#[must_use]
pub fn filter_directive(lookup: impl Fn(&str) -> Option<String>, verbose: bool) -> String {
    lookup(LOG_VAR)
        .or_else(|| lookup("RUST_LOG"))
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| if verbose { "debug" } else { "info" }.to_string())
}

/// Installs the global subscriber writing to stderr. Later calls are no-ops.
pub fn init(verbose: bool) {
    let directive = filter_directive(|key| std::env::var(key).ok(), verbose);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
