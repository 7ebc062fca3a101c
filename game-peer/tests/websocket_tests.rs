use game_peer::link::{self, ConnectionId, LinkError, PeerLink};
use game_types::{CoinSide, Identity, PeerMessage};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn loopback() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 0))
}

async fn connected_pair() -> (PeerLink, PeerLink) {
    let host = link::host(loopback(), ConnectionId::new()).unwrap();
    let url = host.url();
    let accepting = tokio::spawn(host.accept());

    let mirror = link::connect(&url).await.unwrap();
    let authority = timeout(WAIT, accepting).await.unwrap().unwrap().unwrap();
    (authority, mirror)
}

#[tokio::test]
async fn test_messages_cross_in_both_directions() {
    let (mut authority, mut mirror) = connected_pair().await;

    let hello = PeerMessage::IdentityExchange {
        identity: Identity::human("Ben", "boomer"),
    };
    mirror.send(hello.clone()).unwrap();
    assert_eq!(timeout(WAIT, authority.recv()).await.unwrap(), Some(hello));

    // Per-connection order holds
    let calls = [CoinSide::Heads, CoinSide::Tails, CoinSide::Heads];
    for call in calls {
        authority.send(PeerMessage::CoinFlipCall { call }).unwrap();
    }
    for call in calls {
        let received = timeout(WAIT, mirror.recv()).await.unwrap();
        assert_eq!(received, Some(PeerMessage::CoinFlipCall { call }));
    }
}

#[tokio::test]
async fn test_host_url_names_connection() {
    let id = ConnectionId::new();
    let host = link::host(loopback(), id).unwrap();
    assert_ne!(host.local_addr().port(), 0);
    assert_eq!(host.connection_id(), id);
    assert!(host.url().ends_with(&format!("/peer/{}", id)));
}

#[tokio::test]
async fn test_wrong_connection_id_refused() {
    let host = link::host(loopback(), ConnectionId::new()).unwrap();
    let url = format!("ws://{}/peer/{}", host.local_addr(), ConnectionId::new());

    let result = link::connect(&url).await;
    assert!(matches!(result, Err(LinkError::WebSocket(_))));
}

#[tokio::test]
async fn test_second_peer_is_turned_away() {
    let host = link::host(loopback(), ConnectionId::new()).unwrap();
    let url = host.url();
    let accepting = tokio::spawn(host.accept());

    let _first = link::connect(&url).await.unwrap();
    let _authority = timeout(WAIT, accepting).await.unwrap().unwrap().unwrap();

    let mut second = link::connect(&url).await.unwrap();
    assert_eq!(timeout(WAIT, second.recv()).await.unwrap(), None);
}

#[tokio::test]
async fn test_dropped_side_ends_inbound_stream() {
    let (authority, mut mirror) = connected_pair().await;
    drop(authority);

    assert_eq!(timeout(WAIT, mirror.recv()).await.unwrap(), None);
}
