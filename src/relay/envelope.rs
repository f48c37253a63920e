//! Relay wire format.
//!
//! Every frame is a JSON object keyed by `channel` and `type` with an
//! optional `payload`:
//!
//! ```text
//! {"channel":"snapshot","type":"add","payload":<any>}
//! {"channel":"snapshot","type":"jumpTo","payload":{"index":1}}
//! {"channel":"metrics","type":"commit","payload":{"ts":1,"durationMs":4}}
//! {"channel":"control","type":"ping"}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::metrics::{CommitMetric, FirstRenderMetric, LagMetric};

/// Message the relay sends back for frames that are not valid JSON.
pub const PARSE_ERROR_MESSAGE: &str = "Failed to parse JSON";

#[derive(Debug, Deserialize, Serialize)]
struct RawEnvelope {
    channel: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, Deserialize)]
struct JumpPayload {
    index: i64,
}

/// A classified relay message.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// New snapshot; the payload becomes the snapshot verbatim.
    SnapshotAdd(Value),
    /// Request to move the cursor.
    SnapshotJump {
        /// Requested index; may be out of range.
        index: i64,
    },
    /// Commit duration sample.
    Commit(CommitMetric),
    /// Event-loop lag sample.
    Lag(LagMetric),
    /// First render sample.
    FirstRender(FirstRenderMetric),
    /// Liveness probe.
    Ping,
    /// Reply to [`Envelope::Ping`].
    Pong,
    /// Error reported by the other side.
    Error(Value),
}

/// Why a frame could not be classified.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// Not JSON, or not an object with string `channel` and `type`.
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Channel/type pair nobody handles.
    #[error("unknown message {channel}/{kind}")]
    Unknown {
        /// The `channel` field.
        channel: String,
        /// The `type` field.
        kind: String,
    },
    /// Known channel/type with a payload of the wrong shape.
    #[error("invalid payload for {channel}/{kind}: {source}")]
    Payload {
        /// The `channel` field.
        channel: String,
        /// The `type` field.
        kind: String,
        /// Decoding failure.
        source: serde_json::Error,
    },
}

impl Envelope {
    /// Parses a text frame.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid JSON, unknown channel/type pairs, or
    /// payloads of the wrong shape.
    pub fn parse(text: &str) -> Result<Self, EnvelopeError> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Classifies an already-decoded frame.
    ///
    /// # Errors
    ///
    /// See [`Envelope::parse`].
    pub fn from_value(value: Value) -> Result<Self, EnvelopeError> {
        let raw: RawEnvelope = serde_json::from_value(value)?;
        let payload_err = |source| EnvelopeError::Payload {
            channel: raw.channel.clone(),
            kind: raw.kind.clone(),
            source,
        };
        match (raw.channel.as_str(), raw.kind.as_str()) {
            ("snapshot", "add") => Ok(Self::SnapshotAdd(raw.payload)),
            ("snapshot", "jumpTo") => {
                let jump: JumpPayload =
                    serde_json::from_value(raw.payload.clone()).map_err(payload_err)?;
                Ok(Self::SnapshotJump { index: jump.index })
            }
            ("metrics", "commit") => serde_json::from_value(raw.payload.clone())
                .map(Self::Commit)
                .map_err(payload_err),
            ("metrics", "lag") => serde_json::from_value(raw.payload.clone())
                .map(Self::Lag)
                .map_err(payload_err),
            ("metrics", "firstRender") => serde_json::from_value(raw.payload.clone())
                .map(Self::FirstRender)
                .map_err(payload_err),
            ("control", "ping") => Ok(Self::Ping),
            ("control", "pong") => Ok(Self::Pong),
            ("control", "error") => Ok(Self::Error(raw.payload)),
            _ => Err(EnvelopeError::Unknown {
                channel: raw.channel.clone(),
                kind: raw.kind.clone(),
            }),
        }
    }

    /// The `channel` this message travels on.
    #[must_use]
    pub fn channel(&self) -> &'static str {
        match self {
            Self::SnapshotAdd(_) | Self::SnapshotJump { .. } => "snapshot",
            Self::Commit(_) | Self::Lag(_) | Self::FirstRender(_) => "metrics",
            Self::Ping | Self::Pong | Self::Error(_) => "control",
        }
    }

    /// The `type` field on the wire.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SnapshotAdd(_) => "add",
            Self::SnapshotJump { .. } => "jumpTo",
            Self::Commit(_) => "commit",
            Self::Lag(_) => "lag",
            Self::FirstRender(_) => "firstRender",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::Error(_) => "error",
        }
    }

    fn payload(&self) -> Option<Value> {
        match self {
            Self::SnapshotAdd(value) | Self::Error(value) => Some(value.clone()),
            Self::SnapshotJump { index } => Some(json!({ "index": index })),
            Self::Commit(m) => serde_json::to_value(m).ok(),
            Self::Lag(m) => serde_json::to_value(m).ok(),
            Self::FirstRender(m) => serde_json::to_value(m).ok(),
            Self::Ping | Self::Pong => None,
        }
    }

    /// Wire representation.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("channel".into(), Value::from(self.channel()));
        map.insert("type".into(), Value::from(self.kind()));
        if let Some(payload) = self.payload() {
            map.insert("payload".into(), payload);
        }
        Value::Object(map)
    }

    /// Wire representation as a text frame.
    #[must_use]
    pub fn to_text(&self) -> String {
        self.to_value().to_string()
    }

    /// The `control/error` reply for a frame that failed to parse.
    #[must_use]
    pub fn parse_error(raw: &str) -> Self {
        Self::Error(json!({ "message": PARSE_ERROR_MESSAGE, "raw": raw }))
    }
}

/// True for `{"channel":"control","type":"ping"}` frames.
#[must_use]
pub fn is_ping(value: &Value) -> bool {
    value.get("channel").and_then(Value::as_str) == Some("control")
        && value.get("type").and_then(Value::as_str) == Some("ping")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_snapshot_messages() {
        let add = r#"{"channel":"snapshot","type":"add","payload":{"count":1}}"#;
        let add = Envelope::parse(add).unwrap();
        assert_eq!(add, Envelope::SnapshotAdd(json!({"count": 1})));

        let jump = r#"{"channel":"snapshot","type":"jumpTo","payload":{"index":-1}}"#;
        let jump = Envelope::parse(jump).unwrap();
        assert_eq!(jump, Envelope::SnapshotJump { index: -1 });
    }

    #[test]
    fn add_without_payload_is_null_snapshot() {
        let add = Envelope::parse(r#"{"channel":"snapshot","type":"add"}"#).unwrap();
        assert_eq!(add, Envelope::SnapshotAdd(Value::Null));
    }

    #[test]
    fn classifies_metrics_and_control() {
        let commit = r#"{"channel":"metrics","type":"commit","payload":{"ts":1,"durationMs":4}}"#;
        let commit = Envelope::parse(commit).unwrap();
        assert!(matches!(commit, Envelope::Commit(ref m) if m.duration_ms == 4.0));
        assert_eq!(
            Envelope::parse(r#"{"channel":"control","type":"ping"}"#).unwrap(),
            Envelope::Ping
        );
    }

    #[test]
    fn rejects_bad_frames() {
        assert!(matches!(
            Envelope::parse("not json"),
            Err(EnvelopeError::Malformed(_))
        ));
        assert!(matches!(
            Envelope::parse(r#"{"type":"add"}"#),
            Err(EnvelopeError::Malformed(_))
        ));
        assert!(matches!(
            Envelope::parse(r#"{"channel":"snapshot","type":"rewind"}"#),
            Err(EnvelopeError::Unknown { .. })
        ));
        let bad_index = r#"{"channel":"snapshot","type":"jumpTo","payload":{"index":"two"}}"#;
        assert!(matches!(
            Envelope::parse(bad_index),
            Err(EnvelopeError::Payload { .. })
        ));
    }

    #[test]
    fn control_frames_serialize_like_the_relay_expects() {
        assert_eq!(
            Envelope::Pong.to_value(),
            json!({"channel": "control", "type": "pong"})
        );
        assert_eq!(
            Envelope::parse_error("{{").to_value(),
            json!({
                "channel": "control",
                "type": "error",
                "payload": {"message": "Failed to parse JSON", "raw": "{{"}
            })
        );
    }

    #[test]
    fn round_trips_through_text() {
        let jump = Envelope::SnapshotJump { index: 3 };
        assert_eq!(Envelope::parse(&jump.to_text()).unwrap(), jump);
    }

    #[test]
    fn ping_detection() {
        assert!(is_ping(&json!({"channel": "control", "type": "ping"})));
        assert!(!is_ping(&json!({"channel": "control", "type": "pong"})));
        assert!(!is_ping(&json!([1])));
    }
}
