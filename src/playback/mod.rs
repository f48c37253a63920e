//! Timed advancement of the timeline cursor.
//!
//! [`PlaybackController`] owns the transport actions (play, pause, step,
//! scrub, speed). While playing, a single tokio task calls [`tick`] on a fixed
//! cadence; its abort handle is stored in the timeline so pausing from any
//! side cancels it.

pub mod speed;

use std::sync::Arc;

use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use crate::timeline::store::TimerOwner;
use crate::timeline::{
    self, can_step_back, can_step_forward, clamp_index, should_auto_stop, SharedTimeline,
};

pub use speed::{ParseSpeedError, Speed};

/// Outcome of one playback tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The cursor moved to this index.
    Advanced(usize),
    /// The cursor was already at the end; playback stopped.
    Stopped,
    /// Playback was not active; nothing happened.
    Idle,
}

/// Evaluates one playback step against the store's current state.
///
/// Length and cursor are read at call time, so snapshots appended during
/// playback extend the range being played.
pub fn tick(timeline: &SharedTimeline) -> Tick {
    let mut store = timeline::lock(timeline);
    if !store.is_playing() {
        return Tick::Idle;
    }
    let (index, len) = (store.current_index(), store.len());
    if should_auto_stop(index, len) {
        store.pause();
        debug!(index, len, "playback reached the end");
        return Tick::Stopped;
    }
    store.jump_to(index + 1);
    trace!(index = index + 1, len, "playback advanced");
    Tick::Advanced(index + 1)
}

/// Transport controls over a shared timeline.
///
/// Starting playback spawns a tokio task, so [`play`](Self::play),
/// [`toggle`](Self::toggle) and [`set_speed`](Self::set_speed) must run
/// inside a runtime. Dropping the controller stops playback it started;
/// playback driven by another controller on the same timeline keeps running.
#[derive(Debug)]
pub struct PlaybackController {
    timeline: SharedTimeline,
    speed: Speed,
    owner: TimerOwner,
}

impl PlaybackController {
    /// Creates a stopped controller at normal speed.
    #[must_use]
    pub fn new(timeline: SharedTimeline) -> Self {
        Self::with_speed(timeline, Speed::default())
    }

    /// Creates a stopped controller at the given speed.
    #[must_use]
    pub fn with_speed(timeline: SharedTimeline, speed: Speed) -> Self {
        Self {
            timeline,
            speed,
            owner: TimerOwner::unique(),
        }
    }

    /// The timeline being driven.
    #[must_use]
    pub fn timeline(&self) -> &SharedTimeline {
        &self.timeline
    }

    /// Current speed tier.
    #[must_use]
    pub fn speed(&self) -> Speed {
        self.speed
    }

    /// Whether playback is active.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        timeline::lock(&self.timeline).is_playing()
    }

    /// Starts playback. Restarts from the first snapshot when the cursor is
    /// on the last one. No-op on an empty timeline or when already playing.
    pub fn play(&self) {
        let mut store = timeline::lock(&self.timeline);
        if store.is_empty() || store.is_playing() {
            return;
        }
        if !can_step_forward(store.current_index(), store.len()) {
            store.jump_to(0);
        }
        store.play();
        let timer = spawn_ticker(Arc::clone(&self.timeline), self.speed);
        store.install_timer(self.owner, timer);
        debug!(speed = %self.speed, index = store.current_index(), "playback started");
    }

    /// Stops playback. Idempotent.
    pub fn pause(&self) {
        timeline::lock(&self.timeline).pause();
    }

    /// Pauses when playing, plays otherwise.
    pub fn toggle(&self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Whether [`step_back`](Self::step_back) would move the cursor.
    #[must_use]
    pub fn can_step_back(&self) -> bool {
        let store = timeline::lock(&self.timeline);
        !store.is_empty() && can_step_back(store.current_index())
    }

    /// Whether [`step_forward`](Self::step_forward) would move the cursor.
    #[must_use]
    pub fn can_step_forward(&self) -> bool {
        let store = timeline::lock(&self.timeline);
        can_step_forward(store.current_index(), store.len())
    }

    /// Moves one snapshot back, pausing playback. Returns whether it moved.
    pub fn step_back(&self) -> bool {
        let mut store = timeline::lock(&self.timeline);
        let index = store.current_index();
        if store.is_empty() || !can_step_back(index) {
            return false;
        }
        store.pause();
        store.jump_to(index - 1)
    }

    /// Moves one snapshot forward, pausing playback. Returns whether it moved.
    pub fn step_forward(&self) -> bool {
        let mut store = timeline::lock(&self.timeline);
        let index = store.current_index();
        if !can_step_forward(index, store.len()) {
            return false;
        }
        store.pause();
        store.jump_to(index + 1)
    }

    /// Manual scrub to a position: clamps into range, jumps and pauses.
    /// No-op on an empty timeline.
    pub fn scrub(&self, index: i64) -> bool {
        let mut store = timeline::lock(&self.timeline);
        if store.is_empty() {
            return false;
        }
        let target = clamp_index(index, store.len());
        let moved = store.jump_to(target);
        store.pause();
        moved
    }

    /// Changes the speed tier. While playing, the cadence restarts at the new
    /// period without touching the cursor.
    pub fn set_speed(&mut self, speed: Speed) {
        self.speed = speed;
        let mut store = timeline::lock(&self.timeline);
        if store.is_playing() {
            let timer = spawn_ticker(Arc::clone(&self.timeline), speed);
            store.install_timer(self.owner, timer);
            debug!(speed = %speed, "playback cadence restarted");
        }
    }

    /// Runs one playback step now. See [`tick`].
    pub fn tick(&self) -> Tick {
        tick(&self.timeline)
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        let mut store = timeline::lock(&self.timeline);
        if store.timer_owner() == Some(self.owner) {
            store.pause();
        }
    }
}

fn spawn_ticker(timeline: SharedTimeline, speed: Speed) -> tokio::task::AbortHandle {
    let period = speed.period();
    let task = tokio::spawn(async move {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if !matches!(tick(&timeline), Tick::Advanced(_)) {
                break;
            }
        }
    });
    task.abort_handle()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::snapshot::Snapshot;
    use crate::timeline::TimelineStore;

    fn timeline_with(n: usize) -> SharedTimeline {
        let mut store = TimelineStore::new();
        for ts in 0..n {
            store.append(Snapshot::new(json!({ "ts": ts })));
        }
        timeline::shared(store)
    }

    fn index(t: &SharedTimeline) -> usize {
        timeline::lock(t).current_index()
    }

    #[tokio::test(start_paused = true)]
    async fn play_at_end_restarts_from_beginning() {
        let t = timeline_with(3);
        let controller = PlaybackController::new(Arc::clone(&t));
        controller.play();
        assert!(controller.is_playing());
        assert_eq!(index(&t), 0);
        assert!(timeline::lock(&t).has_timer());
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_advance_then_stop_at_last_index() {
        let t = timeline_with(3);
        let controller = PlaybackController::new(Arc::clone(&t));
        controller.play();
        controller.pause();
        timeline::lock(&t).play();

        assert_eq!(controller.tick(), Tick::Advanced(1));
        assert_eq!(controller.tick(), Tick::Advanced(2));
        assert_eq!(controller.tick(), Tick::Stopped);
        assert_eq!(index(&t), 2);
        assert!(!controller.is_playing());
        assert_eq!(controller.tick(), Tick::Idle);
    }

    #[test]
    fn tick_reads_latest_length() {
        let t = timeline_with(2);
        {
            let mut store = timeline::lock(&t);
            store.jump_to(0);
            store.play();
        }
        assert_eq!(tick(&t), Tick::Advanced(1));

        timeline::lock(&t).append(Snapshot::new(json!({"ts": 2})));
        timeline::lock(&t).jump_to(1);
        assert_eq!(tick(&t), Tick::Advanced(2));
        assert_eq!(tick(&t), Tick::Stopped);
    }

    #[test]
    fn append_during_playback_keeps_playing() {
        let t = timeline_with(2);
        timeline::lock(&t).play();
        timeline::lock(&t).append(Snapshot::new(json!({"ts": 2})));
        assert!(timeline::lock(&t).is_playing());
        assert_eq!(index(&t), 2);
        assert_eq!(tick(&t), Tick::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_advances_on_cadence_and_auto_stops() {
        let t = timeline_with(3);
        let controller = PlaybackController::new(Arc::clone(&t));
        controller.play();

        time::sleep(Duration::from_millis(1001)).await;
        assert_eq!(index(&t), 1);
        time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(index(&t), 2);
        time::sleep(Duration::from_millis(1000)).await;
        assert!(!controller.is_playing());
        assert!(!timeline::lock(&t).has_timer());
        assert_eq!(index(&t), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_cancels_pending_advancement() {
        let t = timeline_with(3);
        let controller = PlaybackController::new(Arc::clone(&t));
        controller.play();
        controller.pause();

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(index(&t), 0);
        assert!(!timeline::lock(&t).has_timer());
    }

    #[tokio::test(start_paused = true)]
    async fn store_pause_also_cancels_the_timer() {
        let t = timeline_with(3);
        let controller = PlaybackController::new(Arc::clone(&t));
        controller.play();
        timeline::lock(&t).pause();

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(index(&t), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn speed_change_restarts_cadence() {
        let t = timeline_with(4);
        let mut controller = PlaybackController::new(Arc::clone(&t));
        controller.play();

        time::sleep(Duration::from_millis(700)).await;
        controller.set_speed(Speed::Fast);
        assert!(controller.is_playing());
        assert_eq!(index(&t), 0);

        time::sleep(Duration::from_millis(501)).await;
        assert_eq!(index(&t), 1);
        assert_eq!(controller.speed(), Speed::Fast);
    }

    #[tokio::test(start_paused = true)]
    async fn scrub_while_playing_pauses_and_clamps() {
        let t = timeline_with(3);
        let controller = PlaybackController::new(Arc::clone(&t));
        controller.play();

        assert!(controller.scrub(99));
        assert_eq!(index(&t), 2);
        assert!(!controller.is_playing());

        controller.scrub(-4);
        assert_eq!(index(&t), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn steps_respect_bounds_and_pause() {
        let t = timeline_with(2);
        let controller = PlaybackController::new(Arc::clone(&t));
        assert!(controller.can_step_back());
        assert!(!controller.can_step_forward());
        assert!(!controller.step_forward());

        controller.play();
        assert!(controller.step_forward());
        assert!(!controller.is_playing());
        assert_eq!(index(&t), 1);

        assert!(controller.step_back());
        assert!(!controller.step_back());
        assert_eq!(index(&t), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_timeline_transport_is_inert() {
        let t = timeline_with(0);
        let mut controller = PlaybackController::new(Arc::clone(&t));
        controller.play();
        controller.toggle();
        controller.set_speed(Speed::Slow);
        assert!(!controller.is_playing());
        assert!(!controller.step_back());
        assert!(!controller.step_forward());
        assert!(!controller.scrub(0));
        assert_eq!(controller.tick(), Tick::Idle);
        assert!(!timeline::lock(&t).has_timer());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_controller_stops_playback() {
        let t = timeline_with(3);
        let controller = PlaybackController::new(Arc::clone(&t));
        controller.play();
        drop(controller);
        assert!(!timeline::lock(&t).is_playing());
        assert!(!timeline::lock(&t).has_timer());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_an_idle_controller_leaves_playback_running() {
        let t = timeline_with(3);
        let driver = PlaybackController::new(Arc::clone(&t));
        driver.play();

        let bystander = PlaybackController::new(Arc::clone(&t));
        drop(bystander);
        assert!(timeline::lock(&t).is_playing());
        assert!(timeline::lock(&t).has_timer());

        time::sleep(Duration::from_millis(1001)).await;
        assert_eq!(index(&t), 1);

        drop(driver);
        assert!(!timeline::lock(&t).is_playing());
    }
}
