//! `fiberscope inspect`: browse or replay a recorded session.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::ViewerConfig;
use crate::playback::{PlaybackController, Speed};
use crate::session;
use crate::timeline::{self, TimelineEvent, TimelineStore};

/// Run the inspect command.
///
/// # Errors
///
/// Returns an error string if the session file cannot be loaded or the
/// configuration is invalid.
pub fn run(
    path: &Path,
    at: Option<i64>,
    play: bool,
    speed: Option<Speed>,
) -> Result<(), String> {
    let file = session::load(path).map_err(|e| format!("Failed to load session: {e}"))?;
    println!(
        "Session {:?} recorded {} ({} snapshots)",
        file.name,
        file.recorded_at,
        file.snapshots.len()
    );
    let mut store = file.into_timeline();
    if store.is_empty() {
        println!("Session is empty.");
        return Ok(());
    }

    if let Some(index) = at {
        let moved = usize::try_from(index).is_ok_and(|index| store.jump_to(index));
        if !moved {
            println!(
                "Index {index} is out of range (0..{}); showing the last snapshot.",
                store.len()
            );
        }
    }

    if play {
        let config = ViewerConfig::from_env()
            .map_err(|e| format!("Invalid configuration: {e}"))?
            .with_overrides(None, speed);
        return play_back(store, config.speed);
    }

    println!("{}", super::render_frame(&store));
    Ok(())
}

fn play_back(mut store: TimelineStore, speed: Speed) -> Result<(), String> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    store.subscribe(move |event| {
        let _ = tx.send(*event);
    });
    let timeline = timeline::shared(store);
    let runtime = super::runtime()?;

    runtime.block_on(async {
        let controller = PlaybackController::with_speed(Arc::clone(&timeline), speed);
        println!("Playing at {speed}");
        controller.play();
        while rx.try_recv().is_ok() {}
        print_current(&timeline);
        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(TimelineEvent::Jumped { .. }) => print_current(&timeline),
                    Some(TimelineEvent::Paused) | None => break,
                    Some(_) => {}
                },
                _ = tokio::signal::ctrl_c() => break,
            }
        }
    });
    Ok(())
}

fn print_current(timeline: &timeline::SharedTimeline) {
    println!("{}\n", super::render_frame(&timeline::lock(timeline)));
}
