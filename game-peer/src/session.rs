use game_core::ComputerAgent;
use game_types::{Difficulty, Identity, MatchError, PeerRole};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::coordinator::{CoordinatorEvent, Flow, Inbound, LocalCommand, MatchCoordinator};
use crate::link::PeerLink;
use crate::services::Services;

pub enum Opponent {
    Peer(PeerLink),
    Computer(Difficulty),
}

pub struct SessionSetup {
    pub role: PeerRole,
    pub local: Identity,
    pub opponent: Opponent,
}

impl SessionSetup {
    pub fn peer(role: PeerRole, local: Identity, link: PeerLink) -> Self {
        Self {
            role,
            local,
            opponent: Opponent::Peer(link),
        }
    }

    pub fn solo(local: Identity, difficulty: Difficulty) -> Self {
        Self {
            role: PeerRole::Authority,
            local,
            opponent: Opponent::Computer(difficulty),
        }
    }
}

/// The local user's end of a running session.
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<LocalCommand>,
    events: mpsc::UnboundedReceiver<CoordinatorEvent>,
    task: JoinHandle<Result<(), MatchError>>,
}

impl SessionHandle {
    pub fn send(&self, command: LocalCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn commands(&self) -> mpsc::UnboundedSender<LocalCommand> {
        self.commands.clone()
    }

    pub async fn next_event(&mut self) -> Option<CoordinatorEvent> {
        self.events.recv().await
    }

    pub async fn join(self) -> Result<(), MatchError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(MatchError::RemoteFault {
                message: format!("session task failed: {}", e),
            }),
        }
    }
}

/// Start a session task. Every input (local commands, peer messages, timers) is
/// processed one at a time by a single coordinator.
pub fn spawn_session(setup: SessionSetup, services: Services) -> SessionHandle {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let task = tokio::spawn(run_session(setup, services, command_rx, event_tx));

    SessionHandle {
        commands: command_tx,
        events: event_rx,
        task,
    }
}

async fn run_session(
    setup: SessionSetup,
    services: Services,
    mut commands: mpsc::UnboundedReceiver<LocalCommand>,
    events: mpsc::UnboundedSender<CoordinatorEvent>,
) -> Result<(), MatchError> {
    let (internal_tx, mut internal_rx) = mpsc::unbounded_channel();

    let (mut coordinator, mut peer_rx) = match setup.opponent {
        Opponent::Peer(link) => {
            let (sender, inbound) = link.split();
            let coordinator = MatchCoordinator::with_peer(
                setup.role,
                setup.local,
                sender,
                services,
                events,
                internal_tx,
            );
            (coordinator, Some(inbound))
        }
        Opponent::Computer(difficulty) => {
            let coordinator = MatchCoordinator::with_computer(
                setup.local,
                ComputerAgent::new(difficulty),
                services,
                events,
                internal_tx,
            );
            (coordinator, None)
        }
    };

    info!("Session open as {:?} ({:?})", coordinator.role(), coordinator.mode());
    if let Err(e) = coordinator.open().await {
        return close(&mut coordinator, Err(e));
    }

    let result = loop {
        let inbound = tokio::select! {
            command = commands.recv() => match command {
                Some(command) => Inbound::Local(command),
                None => Inbound::Local(LocalCommand::Quit),
            },
            message = recv_peer(&mut peer_rx) => match message {
                Some(message) => Inbound::Peer(message),
                None => Inbound::LinkClosed,
            },
            Some(internal) = internal_rx.recv() => internal,
        };

        match coordinator.handle(inbound).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Stop) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    close(&mut coordinator, result)
}

/// Waits forever when there is no peer, so the branch never fires in solo play.
async fn recv_peer(
    peer_rx: &mut Option<mpsc::UnboundedReceiver<game_types::PeerMessage>>,
) -> Option<game_types::PeerMessage> {
    match peer_rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn close(
    coordinator: &mut MatchCoordinator,
    result: Result<(), MatchError>,
) -> Result<(), MatchError> {
    match &result {
        Ok(()) => info!("Session closed"),
        Err(e) if e.is_terminal() => warn!("Session ended: {}", e),
        Err(e) => {
            error!("Session aborted: {}", e);
            coordinator.report_fault(e);
        }
    }
    coordinator.shutdown(result.as_ref().err().cloned());
    result
}
