//! Performance samples reported on the `metrics` relay channel.

use serde::{Deserialize, Serialize};

/// Duration of one React commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitMetric {
    /// Device timestamp in ms.
    pub ts: f64,
    /// Commit duration in ms.
    pub duration_ms: f64,
    /// Fibers touched by the commit, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fibers_updated: Option<u64>,
    /// Reporting app, when several are profiled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
}

/// Event-loop stall measured on the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LagMetric {
    /// Device timestamp in ms.
    pub ts: f64,
    /// Stall in ms.
    pub lag_ms: f64,
    /// Reporting app, when several are profiled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
}

/// Time to first screen render, sent once per app launch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstRenderMetric {
    /// Device timestamp in ms.
    pub ts: f64,
    /// First render time in ms.
    pub first_render_ms: f64,
    /// Reporting app, when several are profiled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
}

/// Arrival-ordered metric samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricLog {
    commits: Vec<CommitMetric>,
    lags: Vec<LagMetric>,
    first_renders: Vec<FirstRenderMetric>,
}

impl MetricLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a commit sample.
    pub fn push_commit(&mut self, metric: CommitMetric) {
        self.commits.push(metric);
    }

    /// Records a lag sample.
    pub fn push_lag(&mut self, metric: LagMetric) {
        self.lags.push(metric);
    }

    /// Records a first-render sample.
    pub fn push_first_render(&mut self, metric: FirstRenderMetric) {
        self.first_renders.push(metric);
    }

    /// Drops commit and lag samples. First renders are kept since the app
    /// reports them only once per launch.
    pub fn clear(&mut self) {
        self.commits.clear();
        self.lags.clear();
    }

    /// Commit samples.
    #[must_use]
    pub fn commits(&self) -> &[CommitMetric] {
        &self.commits
    }

    /// Lag samples.
    #[must_use]
    pub fn lags(&self) -> &[LagMetric] {
        &self.lags
    }

    /// First-render samples.
    #[must_use]
    pub fn first_renders(&self) -> &[FirstRenderMetric] {
        &self.first_renders
    }

    /// Mean commit duration, `None` without samples.
    #[must_use]
    pub fn average_commit_ms(&self) -> Option<f64> {
        average(self.commits.iter().map(|m| m.duration_ms))
    }

    /// Mean lag, `None` without samples.
    #[must_use]
    pub fn average_lag_ms(&self) -> Option<f64> {
        average(self.lags.iter().map(|m| m.lag_ms))
    }

    /// Most recent first-render sample.
    #[must_use]
    pub fn latest_first_render(&self) -> Option<&FirstRenderMetric> {
        self.first_renders.last()
    }
}

#[allow(clippy::cast_precision_loss)]
fn average(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}
