//! Viewer side of the relay connection.

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::envelope::Envelope;
use super::router::{MessageRouter, Routed, SnapshotSink};
use super::RelayError;

/// Connects to the relay at `url`, sends a ping, then routes every text
/// frame until the relay closes the connection.
///
/// `on_routed` is called after each frame with the routing outcome.
///
/// # Errors
///
/// Returns an error if the connection cannot be established or breaks.
pub async fn watch<S, F>(
    url: &str,
    router: &MessageRouter<S>,
    mut on_routed: F,
) -> Result<(), RelayError>
where
    S: SnapshotSink,
    F: FnMut(Routed),
{
    let (mut ws, _) = connect_async(url)
        .await
        .map_err(|source| RelayError::Connect {
            url: url.to_string(),
            source,
        })?;
    info!(url, "connected to relay");
    ws.send(Message::Text(Envelope::Ping.to_text())).await?;

    while let Some(frame) = ws.next().await {
        match frame? {
            Message::Text(text) => on_routed(router.route_text(&text)),
            Message::Close(_) => break,
            other => debug!(kind = ?other, "ignoring non-text frame"),
        }
    }
    warn!(url, "relay connection closed");
    Ok(())
}
