//! `fiberscope watch`: follow a live relay and print each snapshot.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::ViewerConfig;
use crate::context::ServiceContext;
use crate::metrics::MetricLog;
use crate::relay::{client, MessageRouter, Routed};
use crate::session::SessionRecorder;
use crate::timeline::{self, TimelineStore};

/// Run the watch command.
///
/// # Errors
///
/// Returns an error string if the configuration is invalid, the relay is
/// unreachable, or the session file cannot be written.
pub fn run(ctx: &ServiceContext, url: Option<String>, record: Option<&Path>) -> Result<(), String> {
    let config = ViewerConfig::from_env()
        .map_err(|e| format!("Invalid configuration: {e}"))?
        .with_overrides(url, None);
    let store = timeline::shared(TimelineStore::new());
    let metrics = Arc::new(Mutex::new(MetricLog::new()));
    let router = MessageRouter::new(Arc::clone(&store)).with_metrics(Arc::clone(&metrics));
    let mut recorder = record.map(|path| {
        let name = path.file_stem().map_or_else(
            || "session".to_string(),
            |s| s.to_string_lossy().into_owned(),
        );
        SessionRecorder::new(path, name, Arc::clone(&ctx.clock))
    });

    let runtime = super::runtime()?;
    let outcome = runtime.block_on(async {
        let watching = client::watch(&config.url, &router, |routed| match routed {
            Routed::SnapshotAdded => {
                let store = timeline::lock(&store);
                if let (Some(recorder), Some(snapshot)) = (recorder.as_mut(), store.current()) {
                    recorder.record(snapshot);
                }
                println!("{}\n", super::render_frame(&store));
            }
            Routed::SnapshotJump(_) => {
                println!("{}\n", super::render_frame(&timeline::lock(&store)));
            }
            _ => {}
        });
        tokio::select! {
            result = watching => {
                result.map_err(|e| format!("Failed to watch {}: {e}", config.url))
            }
            _ = tokio::signal::ctrl_c() => Ok(()),
        }
    });

    print_metrics(&metrics.lock().unwrap_or_else(PoisonError::into_inner));
    if let Some(recorder) = recorder {
        let count = recorder.len();
        let path = recorder
            .finish()
            .map_err(|e| format!("Failed to save session: {e}"))?;
        println!("Saved {count} snapshot(s) to {}", path.display());
    }
    outcome
}

fn print_metrics(log: &MetricLog) {
    if let Some(avg) = log.average_commit_ms() {
        println!("Commits: {} (avg {avg:.1} ms)", log.commits().len());
    }
    if let Some(avg) = log.average_lag_ms() {
        println!("Event loop lag: {} samples (avg {avg:.1} ms)", log.lags().len());
    }
    if let Some(first) = log.latest_first_render() {
        println!("First render: {:.1} ms", first.first_render_ms);
    }
}
