use futures_util::{SinkExt, StreamExt};
use game_types::PeerMessage;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as ClientMessage;
use tracing::{debug, error, info, warn};
use warp::Filter;
use warp::ws::{Message, WebSocket, Ws};

use super::{ConnectionId, LinkError, LinkSender, PeerLink};

type AcceptSlot = Arc<Mutex<Option<oneshot::Sender<WebSocket>>>>;

/// A listening Authority waiting for its single peer.
pub struct PeerHost {
    connection_id: ConnectionId,
    local_addr: SocketAddr,
    accepted: oneshot::Receiver<WebSocket>,
    shutdown: oneshot::Sender<()>,
}

/// Listen on `bind` for one peer on `/peer/<connection_id>`. Port 0 picks a free port.
pub fn host(bind: SocketAddr, connection_id: ConnectionId) -> Result<PeerHost, LinkError> {
    let (accept_tx, accept_rx) = oneshot::channel();
    let slot: AcceptSlot = Arc::new(Mutex::new(Some(accept_tx)));
    let slot_filter = warp::any().map(move || slot.clone());

    let route = warp::path!("peer" / ConnectionId)
        .and(warp::ws())
        .and(slot_filter)
        .and_then(move |requested: ConnectionId, ws: Ws, slot: AcceptSlot| async move {
            if requested != connection_id {
                warn!("Rejecting peer for unknown connection {}", requested);
                return Err(warp::reject::not_found());
            }
            Ok(ws.on_upgrade(move |socket| admit(socket, slot)))
        });

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let (local_addr, server) = warp::serve(route)
        .try_bind_with_graceful_shutdown(bind, async move {
            let _ = shutdown_rx.await;
        })
        .map_err(|e| LinkError::Bind {
            addr: bind.to_string(),
            message: e.to_string(),
        })?;
    tokio::spawn(server);

    info!("Listening for peer on ws://{}/peer/{}", local_addr, connection_id);
    Ok(PeerHost {
        connection_id,
        local_addr,
        accepted: accept_rx,
        shutdown: shutdown_tx,
    })
}

/// First connection takes the slot; anyone after that is closed straight away.
async fn admit(socket: WebSocket, slot: AcceptSlot) {
    let sender = slot.lock().ok().and_then(|mut guard| guard.take());
    match sender {
        Some(sender) => {
            if let Err(socket) = sender.send(socket) {
                let _ = socket.close().await;
            }
        }
        None => {
            info!("Peer slot already taken, closing extra connection");
            let _ = socket.close().await;
        }
    }
}

impl PeerHost {
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The address a Mirror dials.
    pub fn url(&self) -> String {
        format!("ws://{}/peer/{}", self.local_addr, self.connection_id)
    }

    /// Wait for the peer. The listener stays up, refusing extras, until the link ends.
    pub async fn accept(self) -> Result<PeerLink, LinkError> {
        let socket = self.accepted.await.map_err(|_| LinkError::Closed)?;
        info!("Peer connected on {}", self.connection_id);
        Ok(pump_host_socket(socket, self.shutdown))
    }
}

/// Dial an Authority at `ws://host:port/peer/<connection_id>`.
pub async fn connect(url: &str) -> Result<PeerLink, LinkError> {
    let (stream, _) = connect_async(url)
        .await
        .map_err(|e| LinkError::WebSocket(e.to_string()))?;
    info!("Connected to peer at {}", url);

    let (mut ws_sender, mut ws_receiver) = stream.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<PeerMessage>();
    let (in_tx, in_rx) = mpsc::unbounded_channel::<PeerMessage>();

    tokio::spawn(async move {
        let incoming = async {
            while let Some(result) = ws_receiver.next().await {
                match result {
                    Ok(ClientMessage::Text(text)) => {
                        if let Some(message) = decode(text.as_str()) {
                            if in_tx.send(message).is_err() {
                                break;
                            }
                        }
                    }
                    Ok(ClientMessage::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("WebSocket error from peer: {}", e);
                        break;
                    }
                }
            }
        };

        let outgoing = async {
            while let Some(message) = out_rx.recv().await {
                let Some(json) = encode(&message) else {
                    continue;
                };
                if let Err(e) = ws_sender.send(ClientMessage::text(json)).await {
                    warn!("Failed to send to peer: {}", e);
                    break;
                }
            }
            let _ = ws_sender.close().await;
        };

        tokio::select! {
            _ = incoming => {},
            _ = outgoing => {},
        }
        info!("Peer connection closed");
    });

    Ok(PeerLink::new(LinkSender::new(out_tx), in_rx))
}

fn pump_host_socket(socket: WebSocket, shutdown: oneshot::Sender<()>) -> PeerLink {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<PeerMessage>();
    let (in_tx, in_rx) = mpsc::unbounded_channel::<PeerMessage>();

    tokio::spawn(async move {
        let incoming = async {
            while let Some(result) = ws_receiver.next().await {
                match result {
                    Ok(msg) => {
                        if msg.is_close() {
                            break;
                        }
                        // Only text frames carry messages
                        let Ok(text) = msg.to_str() else {
                            continue;
                        };
                        if let Some(message) = decode(text) {
                            if in_tx.send(message).is_err() {
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        warn!("WebSocket error from peer: {}", e);
                        break;
                    }
                }
            }
        };

        let outgoing = async {
            while let Some(message) = out_rx.recv().await {
                let Some(json) = encode(&message) else {
                    continue;
                };
                if let Err(e) = ws_sender.send(Message::text(json)).await {
                    warn!("Failed to send to peer: {}", e);
                    break;
                }
            }
            let _ = ws_sender.close().await;
        };

        tokio::select! {
            _ = incoming => {},
            _ = outgoing => {},
        }
        info!("Peer connection closed");
        drop(shutdown);
    });

    PeerLink::new(LinkSender::new(out_tx), in_rx)
}

fn decode(text: &str) -> Option<PeerMessage> {
    match serde_json::from_str::<PeerMessage>(text) {
        Ok(message) => {
            debug!("Received {}", message.kind());
            Some(message)
        }
        Err(e) => {
            warn!("Dropping malformed peer message: {}", e);
            None
        }
    }
}

fn encode(message: &PeerMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(json) => Some(json),
        Err(e) => {
            error!("Failed to serialize {}: {:?}", message.kind(), e);
            None
        }
    }
}
