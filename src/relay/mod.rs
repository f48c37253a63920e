//! Relay transport: wire format, routing, server and client.

pub mod client;
pub mod envelope;
pub mod router;
pub mod server;

pub use envelope::{Envelope, EnvelopeError};
pub use router::{MessageRouter, Routed, SnapshotSink};
pub use server::{broadcast_targets, ClientId, Peer, RelayServer};

/// Errors raised by the relay transport.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The listening socket could not be bound.
    #[error("failed to bind relay: {0}")]
    Bind(#[source] std::io::Error),
    /// The viewer could not reach the relay.
    #[error("failed to connect to {url}: {source}")]
    Connect {
        /// Relay URL.
        url: String,
        /// Handshake failure.
        source: tokio_tungstenite::tungstenite::Error,
    },
    /// An established connection failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    /// Socket-level failure.
    #[error("io error: {0}")]
    Io(#[source] std::io::Error),
}
