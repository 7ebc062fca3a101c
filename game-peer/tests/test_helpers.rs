#![allow(dead_code)]

use async_trait::async_trait;
use game_peer::coordinator::CoordinatorEvent;
use game_peer::link::PeerLink;
use game_peer::services::{
    InMemoryStatsStore, Services, SilentFlavorText, SupplierError, WordSupplier,
};
use game_peer::{SessionHandle, SessionSetup, spawn_session};
use game_types::{Difficulty, Identity, MatchSnapshot, PeerRole};
use std::sync::Arc;
use std::time::Duration;

/// Short words that always fit a 10x10 grid.
pub const TEST_WORDS: [&str; 12] = [
    "REEF", "KELP", "CLAM", "SQUID", "WHALE", "CORAL", "TUNA", "CRAB", "SEAL", "PERCH", "EELS",
    "SHARK",
];

/// Hands back the first `count` words of a fixed list, whatever the theme.
pub struct FixedWordSupplier {
    words: Vec<String>,
}

impl FixedWordSupplier {
    pub fn new(words: &[&str]) -> Self {
        Self {
            words: words.iter().map(|w| w.to_string()).collect(),
        }
    }
}

#[async_trait]
impl WordSupplier for FixedWordSupplier {
    async fn fetch_words(&self, _theme: &str, count: usize) -> Result<Vec<String>, SupplierError> {
        Ok(self.words.iter().take(count).cloned().collect())
    }
}

pub struct TestSetup {
    pub services: Services,
    pub stats: Arc<InMemoryStatsStore>,
}

impl TestSetup {
    pub fn new() -> Self {
        Self::with_words(&TEST_WORDS)
    }

    pub fn with_words(words: &[&str]) -> Self {
        let stats = Arc::new(InMemoryStatsStore::new());
        let services = Services {
            words: Arc::new(FixedWordSupplier::new(words)),
            flavor: Arc::new(SilentFlavorText),
            stats: stats.clone(),
        };
        Self { services, stats }
    }

    pub fn solo(&self, name: &str, difficulty: Difficulty) -> (Identity, SessionHandle) {
        let identity = create_identity(name);
        let setup = SessionSetup::solo(identity.clone(), difficulty);
        (identity, spawn_session(setup, self.services.clone()))
    }

    /// Authority and Mirror sessions joined by an in-memory link.
    pub fn pair(&self) -> (Identity, SessionHandle, Identity, SessionHandle) {
        let (host_link, join_link) = PeerLink::in_memory_pair();
        let ada = create_identity("Ada");
        let ben = create_identity("Ben");
        let host = spawn_session(
            SessionSetup::peer(PeerRole::Authority, ada.clone(), host_link),
            self.services.clone(),
        );
        let join = spawn_session(
            SessionSetup::peer(PeerRole::Mirror, ben.clone(), join_link),
            self.services.clone(),
        );
        (ada, host, ben, join)
    }
}

pub fn create_identity(name: &str) -> Identity {
    Identity::human(name, "fox")
}

/// Skip events until one matches. Panics if nothing matching arrives in time.
pub async fn wait_for<F>(session: &mut SessionHandle, mut wanted: F) -> CoordinatorEvent
where
    F: FnMut(&CoordinatorEvent) -> bool,
{
    let deadline = Duration::from_secs(600);
    tokio::time::timeout(deadline, async {
        loop {
            match session.next_event().await {
                Some(event) if wanted(&event) => return event,
                Some(_) => continue,
                None => panic!("session closed while waiting for an event"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

pub async fn wait_for_snapshot<F>(session: &mut SessionHandle, mut wanted: F) -> MatchSnapshot
where
    F: FnMut(&MatchSnapshot) -> bool,
{
    let event = wait_for(session, |event| {
        matches!(event, CoordinatorEvent::StateUpdated { snapshot } if wanted(snapshot))
    })
    .await;
    match event {
        CoordinatorEvent::StateUpdated { snapshot } => snapshot,
        other => panic!("expected a snapshot, got {:?}", other),
    }
}

/// Drive a pair through the handshake and coin call; returns the first Mirror snapshot.
pub async fn start_pair_match(
    host: &mut SessionHandle,
    join: &mut SessionHandle,
) -> MatchSnapshot {
    wait_for(join, |e| matches!(e, CoordinatorEvent::CoinCallRequested)).await;
    join.send(game_peer::LocalCommand::CallCoin(game_types::CoinSide::Heads));
    wait_for(host, |e| matches!(e, CoordinatorEvent::MatchStarted { .. })).await;
    wait_for_snapshot(join, |_| true).await
}
