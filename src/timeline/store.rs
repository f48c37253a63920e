//! The snapshot log and its cursor.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::task::AbortHandle;
use tracing::{debug, trace};

use crate::snapshot::Snapshot;

/// Change notification delivered to subscribers after each mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineEvent {
    /// A snapshot was appended and the cursor moved onto it.
    Appended {
        /// Index of the new snapshot.
        index: usize,
    },
    /// The cursor moved.
    Jumped {
        /// Previous cursor.
        from: usize,
        /// New cursor.
        to: usize,
    },
    /// Playback started.
    Played,
    /// Playback stopped.
    Paused,
    /// The log was cleared.
    Reset,
}

/// Handle returned by [`TimelineStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(&TimelineEvent) + Send>;

/// Identifies whoever installed the advancement timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TimerOwner(u64);

impl TimerOwner {
    /// A token distinct from every other one handed out in this process.
    pub(crate) fn unique() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Append-only snapshot log with a cursor and playback flag.
///
/// All mutation goes through the methods below. The cursor satisfies
/// `current_index < len()` whenever the log is non-empty and is 0 otherwise.
#[derive(Default)]
pub struct TimelineStore {
    snapshots: Vec<Snapshot>,
    current_index: usize,
    playing: bool,
    timer: Option<(TimerOwner, AbortHandle)>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl TimelineStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a snapshot and jumps the cursor to it, regardless of playback.
    pub fn append(&mut self, snapshot: Snapshot) {
        self.snapshots.push(snapshot);
        self.current_index = self.snapshots.len() - 1;
        debug!(index = self.current_index, "snapshot appended");
        self.notify(TimelineEvent::Appended {
            index: self.current_index,
        });
    }

    /// Moves the cursor to `index`.
    ///
    /// Out-of-range requests are ignored, not clamped. Returns whether the
    /// cursor was moved.
    pub fn jump_to(&mut self, index: usize) -> bool {
        if index >= self.snapshots.len() {
            trace!(index, len = self.snapshots.len(), "jump ignored");
            return false;
        }
        let from = self.current_index;
        self.current_index = index;
        self.notify(TimelineEvent::Jumped { from, to: index });
        true
    }

    /// Marks playback active. Idempotent.
    pub fn play(&mut self) {
        if !self.playing {
            self.playing = true;
            self.notify(TimelineEvent::Played);
        }
    }

    /// Marks playback stopped and cancels any pending advancement. Idempotent.
    pub fn pause(&mut self) {
        self.cancel_timer();
        if self.playing {
            self.playing = false;
            self.notify(TimelineEvent::Paused);
        }
    }

    /// Clears the log back to its initial state.
    pub fn reset(&mut self) {
        self.cancel_timer();
        self.snapshots.clear();
        self.current_index = 0;
        self.playing = false;
        self.notify(TimelineEvent::Reset);
    }

    /// Takes ownership of the advancement timer, cancelling any previous one.
    ///
    /// A timer installed while stopped is cancelled immediately, so a handle
    /// is held only while playing.
    pub(crate) fn install_timer(&mut self, owner: TimerOwner, timer: AbortHandle) {
        self.cancel_timer();
        if self.playing {
            self.timer = Some((owner, timer));
        } else {
            timer.abort();
        }
    }

    /// Who installed the timer currently held, if any.
    pub(crate) fn timer_owner(&self) -> Option<TimerOwner> {
        self.timer.as_ref().map(|(owner, _)| *owner)
    }

    fn cancel_timer(&mut self) {
        if let Some((_, timer)) = self.timer.take() {
            timer.abort();
        }
    }

    /// Snapshot under the cursor, `None` when empty.
    #[must_use]
    pub fn current(&self) -> Option<&Snapshot> {
        self.snapshots.get(self.current_index)
    }

    /// Snapshot before the cursor, `None` at the start or when empty.
    #[must_use]
    pub fn previous(&self) -> Option<&Snapshot> {
        self.current_index.checked_sub(1).and_then(|i| self.snapshots.get(i))
    }

    /// Snapshot at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    /// All snapshots in arrival order.
    #[must_use]
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Number of snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// True when no snapshot has arrived.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Cursor position. Meaningless when the store is empty.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Whether playback is active.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Whether an advancement timer is held.
    #[must_use]
    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }

    /// Registers a listener called synchronously after every mutation.
    ///
    /// Listeners run inside the mutating call, so for a [`SharedTimeline`]
    /// they run with its mutex held. A listener must not lock the same
    /// timeline (that deadlocks); forward the event through a channel and
    /// read the store from the receiving side instead.
    ///
    /// [`SharedTimeline`]: crate::timeline::SharedTimeline
    pub fn subscribe(
        &mut self,
        listener: impl Fn(&TimelineEvent) + Send + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    fn notify(&self, event: TimelineEvent) {
        for (_, listener) in &self.listeners {
            listener(&event);
        }
    }
}

impl fmt::Debug for TimelineStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimelineStore")
            .field("len", &self.snapshots.len())
            .field("current_index", &self.current_index)
            .field("playing", &self.playing)
            .field("has_timer", &self.timer.is_some())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
