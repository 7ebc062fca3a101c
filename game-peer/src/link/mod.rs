use game_types::PeerMessage;
use std::fmt;
use std::str::FromStr;
use tokio::sync::mpsc;
use uuid::Uuid;

pub mod websocket;

pub use websocket::{PeerHost, connect, host};

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("peer link closed")]
    Closed,
    #[error("could not listen on {addr}: {message}")]
    Bind { addr: String, message: String },
    #[error("websocket error: {0}")]
    WebSocket(String),
}

/// Identifier both sides agree on out-of-band before dialling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConnectionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Outbound half of a link. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LinkSender {
    outbound: mpsc::UnboundedSender<PeerMessage>,
}

impl LinkSender {
    pub fn new(outbound: mpsc::UnboundedSender<PeerMessage>) -> Self {
        Self { outbound }
    }

    pub fn send(&self, message: PeerMessage) -> Result<(), LinkError> {
        self.outbound.send(message).map_err(|_| LinkError::Closed)
    }
}

/// A point-to-point, per-connection ordered channel of peer messages. The inbound
/// stream ending means the link is gone.
pub struct PeerLink {
    sender: LinkSender,
    inbound: mpsc::UnboundedReceiver<PeerMessage>,
}

impl PeerLink {
    pub fn new(sender: LinkSender, inbound: mpsc::UnboundedReceiver<PeerMessage>) -> Self {
        Self { sender, inbound }
    }

    /// Two links wired back to back, for tests and single-process embedding.
    pub fn in_memory_pair() -> (PeerLink, PeerLink) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (
            PeerLink::new(LinkSender::new(a_tx), b_rx),
            PeerLink::new(LinkSender::new(b_tx), a_rx),
        )
    }

    pub fn sender(&self) -> LinkSender {
        self.sender.clone()
    }

    pub fn send(&self, message: PeerMessage) -> Result<(), LinkError> {
        self.sender.send(message)
    }

    pub async fn recv(&mut self) -> Option<PeerMessage> {
        self.inbound.recv().await
    }

    pub fn split(self) -> (LinkSender, mpsc::UnboundedReceiver<PeerMessage>) {
        (self.sender, self.inbound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_pair_delivers_in_order() {
        let (left, mut right) = PeerLink::in_memory_pair();
        left.send(PeerMessage::RematchFlag).unwrap();
        left.send(PeerMessage::ThemeVote {
            theme: "Astronomy".to_string(),
        })
        .unwrap();

        assert_eq!(right.recv().await, Some(PeerMessage::RematchFlag));
        assert!(matches!(
            right.recv().await,
            Some(PeerMessage::ThemeVote { .. })
        ));
    }

    #[tokio::test]
    async fn test_dropping_one_side_closes_the_other() {
        let (left, mut right) = PeerLink::in_memory_pair();
        drop(left);
        assert_eq!(right.recv().await, None);
        assert!(matches!(
            right.send(PeerMessage::RematchFlag),
            Err(LinkError::Closed)
        ));
    }

    #[test]
    fn test_connection_id_round_trips_through_text() {
        let id = ConnectionId::new();
        let parsed: ConnectionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<ConnectionId>().is_err());
    }
}
