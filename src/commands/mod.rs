//! Command dispatch and handlers.

pub mod inspect;
pub mod relay;
pub mod watch;

use tokio::runtime::{Builder, Runtime};

use crate::cli::Command;
use crate::context::ServiceContext;
use crate::diff::render_against;
use crate::normalize::{changed_node_names, normalize_snapshot, render_tree};
use crate::timeline::TimelineStore;

/// Dispatch a parsed command to its handler with live adapters.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    dispatch_with_context(command, &ServiceContext::live())
}

/// Dispatch a command with the given service context.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch_with_context(command: &Command, ctx: &ServiceContext) -> Result<(), String> {
    match command {
        Command::Relay {
            host,
            port,
            no_echo,
        } => relay::run(ctx, host.clone(), *port, *no_echo),
        Command::Watch { url, record } => watch::run(ctx, url.clone(), record.as_deref()),
        Command::Inspect {
            path,
            at,
            play,
            speed,
        } => inspect::run(path, *at, *play, *speed),
    }
}

fn runtime() -> Result<Runtime, String> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start async runtime: {e}"))
}

/// Text view of the snapshot under the cursor: position, component tree and
/// diff against the previous snapshot.
#[must_use]
pub fn render_frame(store: &TimelineStore) -> String {
    let Some(current) = store.current() else {
        return "No snapshots.".to_string();
    };
    let previous = store.previous();
    let mut out = format!("Snapshot {}/{}", store.current_index() + 1, store.len());
    if let Some(ts) = current.timestamp() {
        out.push_str(&format!(" @ {ts}"));
    }
    let changed = changed_node_names(previous, Some(current));
    out.push('\n');
    out.push_str(&render_tree(&normalize_snapshot(current), &changed));
    out.push_str("\n-- diff --\n");
    out.push_str(&render_against(previous, current));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Snapshot;
    use serde_json::json;

    #[test]
    fn frame_for_empty_store() {
        assert_eq!(render_frame(&TimelineStore::new()), "No snapshots.");
    }

    #[test]
    fn first_frame_has_no_diff() {
        let mut store = TimelineStore::new();
        store.append(Snapshot::new(json!({"count": 0, "timestamp": 10})));
        let frame = render_frame(&store);
        assert!(frame.starts_with("Snapshot 1/1 @ 10\nApp\n"));
        assert!(frame.ends_with("First snapshot, no previous state to compare."));
    }

    #[test]
    fn later_frame_marks_root_and_shows_diff() {
        let mut store = TimelineStore::new();
        store.append(Snapshot::new(json!({"count": 0})));
        store.append(Snapshot::new(json!({"count": 1})));
        let frame = render_frame(&store);
        assert!(frame.starts_with("Snapshot 2/2\nApp *\n"));
        assert!(frame.ends_with("~ count: 0 -> 1"));
    }
}
