//! Classification of inbound relay frames into timeline and metric updates.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing::{debug, warn};

use super::envelope::Envelope;
use crate::metrics::MetricLog;
use crate::snapshot::Snapshot;
use crate::timeline::{self, SharedTimeline};

/// Entry points the timeline exposes to the router.
pub trait SnapshotSink {
    /// A `snapshot/add` frame arrived.
    fn on_snapshot_add(&self, payload: Value);

    /// A `snapshot/jumpTo` frame arrived. Negative or out-of-range indices
    /// are ignored; an accepted jump stops playback.
    fn on_snapshot_jump(&self, index: i64);
}

impl SnapshotSink for SharedTimeline {
    fn on_snapshot_add(&self, payload: Value) {
        timeline::lock(self).append(Snapshot::new(payload));
    }

    fn on_snapshot_jump(&self, index: i64) {
        let Ok(index) = usize::try_from(index) else {
            return;
        };
        let mut store = timeline::lock(self);
        if store.jump_to(index) {
            store.pause();
        }
    }
}

/// What the router did with a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    /// A snapshot was appended.
    SnapshotAdded,
    /// A jump was forwarded to the timeline.
    SnapshotJump(i64),
    /// A metric sample was recorded.
    Metric,
    /// The peer sent a ping.
    Ping,
    /// The peer answered a ping.
    Pong,
    /// The peer reported an error.
    RemoteError(Value),
    /// The frame was dropped.
    Ignored,
}

/// Routes decoded frames to the timeline and the metric log.
#[derive(Debug)]
pub struct MessageRouter<S> {
    snapshots: S,
    metrics: Option<Arc<Mutex<MetricLog>>>,
}

impl<S: SnapshotSink> MessageRouter<S> {
    /// Creates a router feeding `snapshots`. Metric frames are dropped until
    /// a log is attached with [`with_metrics`](Self::with_metrics).
    pub fn new(snapshots: S) -> Self {
        Self {
            snapshots,
            metrics: None,
        }
    }

    /// Records metric frames into `log`.
    #[must_use]
    pub fn with_metrics(mut self, log: Arc<Mutex<MetricLog>>) -> Self {
        self.metrics = Some(log);
        self
    }

    /// The snapshot sink.
    pub fn sink(&self) -> &S {
        &self.snapshots
    }

    /// Parses and routes a text frame. Malformed frames are logged and
    /// ignored.
    pub fn route_text(&self, text: &str) -> Routed {
        match Envelope::parse(text) {
            Ok(envelope) => self.route(envelope),
            Err(err) => {
                warn!(error = %err, "ignoring relay frame");
                Routed::Ignored
            }
        }
    }

    /// Routes a classified frame.
    pub fn route(&self, envelope: Envelope) -> Routed {
        debug!(channel = envelope.channel(), kind = envelope.kind(), "routing frame");
        match envelope {
            Envelope::SnapshotAdd(payload) => {
                self.snapshots.on_snapshot_add(payload);
                Routed::SnapshotAdded
            }
            Envelope::SnapshotJump { index } => {
                self.snapshots.on_snapshot_jump(index);
                Routed::SnapshotJump(index)
            }
            Envelope::Commit(metric) => self.record(|log| log.push_commit(metric)),
            Envelope::Lag(metric) => self.record(|log| log.push_lag(metric)),
            Envelope::FirstRender(metric) => self.record(|log| log.push_first_render(metric)),
            Envelope::Ping => Routed::Ping,
            Envelope::Pong => Routed::Pong,
            Envelope::Error(payload) => {
                warn!(%payload, "relay reported an error");
                Routed::RemoteError(payload)
            }
        }
    }

    fn record(&self, push: impl FnOnce(&mut MetricLog)) -> Routed {
        let Some(log) = &self.metrics else {
            return Routed::Ignored;
        };
        push(&mut log.lock().unwrap_or_else(PoisonError::into_inner));
        Routed::Metric
    }
}
