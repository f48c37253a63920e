//! WebSocket relay between the instrumented app and viewers.
//!
//! Every valid JSON frame is forwarded to the other open clients. A lone
//! client gets its own frames echoed back so a single app can be debugged
//! without a viewer attached.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::envelope::{is_ping, Envelope};
use super::RelayError;
use crate::ports::IdGenerator;

/// Identifier assigned to a connection on accept.
pub type ClientId = String;

/// A connection as seen by the broadcast rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    /// Connection identifier.
    pub id: ClientId,
    /// Whether frames can still be delivered.
    pub open: bool,
}

/// Recipients of a frame sent by `sender`.
///
/// With `echo` enabled and `sender` as the only connection, the frame goes
/// back to the sender. Otherwise it goes to every open peer except the
/// sender.
#[must_use]
pub fn broadcast_targets(peers: &[Peer], sender: &str, echo: bool) -> Vec<ClientId> {
    if let [only] = peers {
        if echo && only.id == sender {
            return if only.open {
                vec![only.id.clone()]
            } else {
                Vec::new()
            };
        }
    }
    peers
        .iter()
        .filter(|p| p.open && p.id != sender)
        .map(|p| p.id.clone())
        .collect()
}

struct Client {
    id: ClientId,
    tx: mpsc::UnboundedSender<Message>,
}

struct Hub {
    echo: bool,
    clients: Mutex<Vec<Client>>,
}

impl Hub {
    fn new(echo: bool) -> Self {
        Self {
            echo,
            clients: Mutex::new(Vec::new()),
        }
    }

    fn clients(&self) -> MutexGuard<'_, Vec<Client>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, id: ClientId, tx: mpsc::UnboundedSender<Message>) {
        self.clients().push(Client { id, tx });
    }

    fn unregister(&self, id: &str) {
        self.clients().retain(|c| c.id != id);
    }

    fn send_to(&self, id: &str, text: String) {
        if let Some(client) = self.clients().iter().find(|c| c.id == id) {
            let _ = client.tx.send(Message::Text(text));
        }
    }

    fn handle_text(&self, sender: &str, text: &str) {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(err) => {
                warn!(client = sender, error = %err, "unparseable frame");
                self.send_to(sender, Envelope::parse_error(text).to_text());
                return;
            }
        };
        if is_ping(&value) {
            self.send_to(sender, Envelope::Pong.to_text());
            return;
        }

        let text = value.to_string();
        let clients = self.clients();
        let peers: Vec<Peer> = clients
            .iter()
            .map(|c| Peer {
                id: c.id.clone(),
                open: !c.tx.is_closed(),
            })
            .collect();
        let targets = broadcast_targets(&peers, sender, self.echo);
        debug!(client = sender, recipients = targets.len(), "forwarding frame");
        for client in clients.iter().filter(|c| targets.contains(&c.id)) {
            let _ = client.tx.send(Message::Text(text.clone()));
        }
    }
}

/// Accepts WebSocket connections and forwards frames between them.
pub struct RelayServer {
    listener: TcpListener,
    ids: Arc<dyn IdGenerator>,
    hub: Arc<Hub>,
}

impl RelayServer {
    /// Binds the listening socket.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Bind`] if the address cannot be bound.
    pub async fn bind(
        addr: impl ToSocketAddrs,
        echo: bool,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self, RelayError> {
        let listener = TcpListener::bind(addr).await.map_err(RelayError::Bind)?;
        Ok(Self {
            listener,
            ids,
            hub: Arc::new(Hub::new(echo)),
        })
    }

    /// Address the server is listening on.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Io`] if the socket address cannot be read.
    pub fn local_addr(&self) -> Result<SocketAddr, RelayError> {
        self.listener.local_addr().map_err(RelayError::Io)
    }

    /// Number of registered connections.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.hub.clients().len()
    }

    /// Serves until the process exits.
    ///
    /// # Errors
    ///
    /// See [`RelayServer::run_until`].
    pub async fn run(self) -> Result<(), RelayError> {
        self.run_until(std::future::pending()).await
    }

    /// Serves until `shutdown` resolves. A failed accept or a broken client
    /// is logged and the server keeps running.
    ///
    /// # Errors
    ///
    /// Currently infallible once bound; the `Result` leaves room for fatal
    /// listener errors.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<(), RelayError> {
        if let Ok(addr) = self.listener.local_addr() {
            info!(%addr, echo = self.hub.echo, "relay listening");
        }
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("relay shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let id = self.ids.generate_id();
                        tokio::spawn(serve_client(stream, addr, id, Arc::clone(&self.hub)));
                    }
                    Err(err) => warn!(error = %err, "accept failed"),
                },
            }
        }
    }
}

async fn serve_client(stream: TcpStream, addr: SocketAddr, id: ClientId, hub: Arc<Hub>) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(err) => {
            warn!(%addr, error = %err, "websocket handshake failed");
            return;
        }
    };
    let (mut sink, mut source) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel();
    hub.register(id.clone(), tx);
    info!(client = %id, %addr, "client connected");

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => hub.handle_text(&id, &text),
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => hub.handle_text(&id, &text),
                Err(err) => {
                    warn!(client = %id, error = %err, "dropping non-utf8 binary frame");
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                warn!(client = %id, error = %err, "websocket error");
                break;
            }
        }
    }

    hub.unregister(&id);
    writer.abort();
    info!(client = %id, "client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(id: &str, open: bool) -> Peer {
        Peer {
            id: id.to_string(),
            open,
        }
    }

    #[test]
    fn forwards_to_open_peers_except_sender() {
        let peers = [peer("a", true), peer("b", true), peer("c", true)];
        assert_eq!(broadcast_targets(&peers, "a", true), vec!["b", "c"]);
    }

    #[test]
    fn skips_closed_peers() {
        let peers = [peer("a", true), peer("b", false), peer("c", true)];
        assert_eq!(broadcast_targets(&peers, "a", true), vec!["c"]);
    }

    #[test]
    fn lone_sender_gets_echo() {
        let peers = [peer("a", true)];
        assert_eq!(broadcast_targets(&peers, "a", true), vec!["a"]);
        assert!(broadcast_targets(&peers, "a", false).is_empty());
    }

    #[test]
    fn no_echo_once_a_second_client_exists_even_if_closed() {
        let peers = [peer("a", true), peer("b", false)];
        assert!(broadcast_targets(&peers, "a", true).is_empty());
    }

    #[test]
    fn hub_replies_to_ping_and_malformed_frames_only_to_sender() {
        let hub = Hub::new(true);
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        hub.register("a".into(), tx_a);
        hub.register("b".into(), tx_b);

        hub.handle_text("a", r#"{"channel":"control","type":"ping"}"#);
        hub.handle_text("a", "{oops");
        let Message::Text(pong) = rx_a.try_recv().unwrap() else {
            panic!("expected text")
        };
        assert_eq!(pong, r#"{"channel":"control","type":"pong"}"#);
        let Message::Text(error) = rx_a.try_recv().unwrap() else {
            panic!("expected text")
        };
        let error: Value = serde_json::from_str(&error).unwrap();
        assert_eq!(error["payload"]["message"], "Failed to parse JSON");
        assert_eq!(error["payload"]["raw"], "{oops");
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn hub_forwards_to_other_clients() {
        let hub = Hub::new(true);
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        hub.register("a".into(), tx_a);
        hub.register("b".into(), tx_b);

        let first = r#"{"channel":"snapshot","type":"add","payload":{"n":1}}"#;
        hub.handle_text("a", first);
        assert!(rx_a.try_recv().is_err());
        let Message::Text(text) = rx_b.try_recv().unwrap() else {
            panic!("expected text")
        };
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["payload"]["n"], 1);

        hub.unregister("b");
        let second = r#"{"channel":"snapshot","type":"add","payload":{"n":2}}"#;
        hub.handle_text("a", second);
        assert!(rx_a.try_recv().is_ok());
    }
}
