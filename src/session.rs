//! Recorded viewer sessions.
//!
//! A session file is YAML holding the snapshots a viewer saw, in arrival
//! order, so a run can be inspected and replayed offline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::ports::Clock;
use crate::snapshot::Snapshot;
use crate::timeline::TimelineStore;

/// Errors reading or writing session files.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The file could not be read or written.
    #[error("{path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying failure.
        source: std::io::Error,
    },
    /// The file is not a valid session.
    #[error("{path}: invalid session file: {source}")]
    Format {
        /// File involved.
        path: PathBuf,
        /// Decoding failure.
        source: serde_yaml::Error,
    },
    /// The session could not be encoded.
    #[error("failed to encode session: {0}")]
    Encode(#[source] serde_yaml::Error),
}

/// On-disk session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionFile {
    /// Human-readable name.
    pub name: String,
    /// When recording finished.
    pub recorded_at: DateTime<Utc>,
    /// Snapshot payloads in arrival order.
    pub snapshots: Vec<Value>,
}

impl SessionFile {
    /// Builds a store holding every snapshot, cursor on the last one.
    #[must_use]
    pub fn into_timeline(self) -> TimelineStore {
        let mut store = TimelineStore::new();
        for value in self.snapshots {
            store.append(Snapshot::new(value));
        }
        store
    }
}

/// Accumulates snapshots and writes them as a [`SessionFile`].
pub struct SessionRecorder {
    path: PathBuf,
    name: String,
    clock: Arc<dyn Clock>,
    snapshots: Vec<Value>,
}

impl SessionRecorder {
    /// Creates a recorder that will write to `path`.
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            clock,
            snapshots: Vec::new(),
        }
    }

    /// Adds a snapshot.
    pub fn record(&mut self, snapshot: &Snapshot) {
        self.snapshots.push(snapshot.value().clone());
    }

    /// Number of snapshots recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// True before the first snapshot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Writes the session file and returns its path.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be encoded or written.
    pub fn finish(self) -> Result<PathBuf, SessionError> {
        let count = self.snapshots.len();
        let file = SessionFile {
            name: self.name,
            recorded_at: self.clock.now(),
            snapshots: self.snapshots,
        };
        let yaml = serde_yaml::to_string(&file).map_err(SessionError::Encode)?;
        std::fs::write(&self.path, yaml).map_err(|source| SessionError::Io {
            path: self.path.clone(),
            source,
        })?;
        info!(path = %self.path.display(), snapshots = count, "session written");
        Ok(self.path)
    }
}

impl std::fmt::Debug for SessionRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRecorder")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("snapshots", &self.snapshots.len())
            .finish_non_exhaustive()
    }
}

/// Reads a session file.
///
/// # Errors
///
/// Returns an error if the file is missing or not a valid session.
pub fn load(path: &Path) -> Result<SessionFile, SessionError> {
    let content = std::fs::read_to_string(path).map_err(|source| SessionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| SessionError::Format {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "fiberscope_session_{name}_{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn record_finish_load() {
        let dir = scratch("roundtrip");
        let path = dir.join("run.session.yaml");
        let at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();

        let mut recorder = SessionRecorder::new(&path, "demo", Arc::new(FixedClock(at)));
        assert!(recorder.is_empty());
        recorder.record(&Snapshot::new(json!({"ts": 1})));
        recorder.record(&Snapshot::new(json!({"App": {"state": [1]}})));
        assert_eq!(recorder.len(), 2);
        assert_eq!(recorder.finish().unwrap(), path);

        let file = load(&path).unwrap();
        assert_eq!(file.name, "demo");
        assert_eq!(file.recorded_at, at);
        assert_eq!(file.snapshots[1], json!({"App": {"state": [1]}}));

        let store = file.into_timeline();
        assert_eq!(store.len(), 2);
        assert_eq!(store.current_index(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_reports_missing_and_invalid_files() {
        let dir = scratch("errors");
        assert!(matches!(load(&dir.join("absent.yaml")), Err(SessionError::Io { .. })));

        let bad = dir.join("bad.yaml");
        std::fs::write(&bad, "snapshots: 3\n").unwrap();
        assert!(matches!(load(&bad), Err(SessionError::Format { .. })));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
