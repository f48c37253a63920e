//! Ordered snapshot log, cursor and playback state.
//!
//! The store is a plain state container. Code that shares it across the relay
//! task, the playback timer and the renderer holds a [`SharedTimeline`].

pub mod bounds;
pub mod store;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use bounds::{can_step_back, can_step_forward, clamp_index, should_auto_stop};
pub use store::{SubscriptionId, TimelineEvent, TimelineStore};

/// A store shared by reference between its readers and writers.
pub type SharedTimeline = Arc<Mutex<TimelineStore>>;

/// Wraps a store for sharing.
#[must_use]
pub fn shared(store: TimelineStore) -> SharedTimeline {
    Arc::new(Mutex::new(store))
}

/// Locks a shared store.
///
/// A poisoned lock is recovered: every store method leaves the store
/// consistent before calling out to listeners.
pub fn lock(timeline: &SharedTimeline) -> MutexGuard<'_, TimelineStore> {
    timeline.lock().unwrap_or_else(PoisonError::into_inner)
}
