//! End-to-end flow: relay frames in, scrubbing, playback and diffing out.

use std::sync::Arc;
use std::time::Duration;

use fiberscope::diff::{diff_snapshots, render_against, DiffKind};
use fiberscope::playback::{PlaybackController, Speed, Tick};
use fiberscope::relay::{MessageRouter, Routed};
use fiberscope::timeline::{self, TimelineStore};
use serde_json::json;

fn add(ts: i64) -> String {
    json!({"channel": "snapshot", "type": "add", "payload": {"ts": ts}}).to_string()
}

#[test]
fn append_jump_and_diff() {
    let store = timeline::shared(TimelineStore::new());
    let router = MessageRouter::new(Arc::clone(&store));
    for ts in 1..=3 {
        assert_eq!(router.route_text(&add(ts)), Routed::SnapshotAdded);
    }
    let jump = r#"{"channel":"snapshot","type":"jumpTo","payload":{"index":1}}"#;
    router.route_text(jump);

    let guard = timeline::lock(&store);
    assert_eq!(guard.len(), 3);
    assert_eq!(guard.current_index(), 1);
    assert_eq!(guard.current().unwrap().value(), &json!({"ts": 2}));

    let diff = diff_snapshots(guard.previous().unwrap(), guard.current().unwrap());
    assert_eq!(diff.len(), 1);
    assert_eq!(diff["ts"].kind, DiffKind::Changed);
    assert_eq!(diff["ts"].prev_value, Some(json!(1)));
    assert_eq!(diff["ts"].next_value, Some(json!(2)));
    assert_eq!(render_against(guard.previous(), guard.current().unwrap()), "~ ts: 1 -> 2");
}

#[tokio::test(start_paused = true)]
async fn playback_from_the_end_restarts_and_auto_stops() {
    let store = timeline::shared(TimelineStore::new());
    let router = MessageRouter::new(Arc::clone(&store));
    for ts in 1..=3 {
        router.route_text(&add(ts));
    }

    let controller = PlaybackController::with_speed(Arc::clone(&store), Speed::Fast);
    controller.play();
    assert_eq!(timeline::lock(&store).current_index(), 0);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(timeline::lock(&store).current_index(), 2);
    assert!(controller.is_playing());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!controller.is_playing());
    assert!(!timeline::lock(&store).has_timer());
    assert_eq!(controller.tick(), Tick::Idle);
}

#[tokio::test(start_paused = true)]
async fn live_append_during_playback_extends_the_run() {
    let store = timeline::shared(TimelineStore::new());
    let router = MessageRouter::new(Arc::clone(&store));
    router.route_text(&add(1));
    router.route_text(&add(2));

    let controller = PlaybackController::new(Arc::clone(&store));
    controller.play();
    assert_eq!(timeline::lock(&store).current_index(), 0);

    // Appending jumps to live while the timer keeps running.
    router.route_text(&add(3));
    assert_eq!(timeline::lock(&store).current_index(), 2);
    assert!(controller.is_playing());

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(!controller.is_playing());
    assert_eq!(timeline::lock(&store).current_index(), 2);
}
