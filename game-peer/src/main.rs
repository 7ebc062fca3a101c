use std::net::SocketAddr;

use anyhow::{Context, bail};
use game_peer::config::Config;
use game_peer::console::{HELP, describe_event, parse_command, render_board};
use game_peer::link::{self, ConnectionId};
use game_peer::services::Services;
use game_peer::{CoordinatorEvent, LocalCommand, SessionSetup, spawn_session};
use game_types::{Difficulty, Identity, PeerRole};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().context("reading configuration")?;
    let services = Services::from_config(&config);
    let local = Identity::human(config.display_name.clone(), config.avatar.clone());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let setup = match args.first().map(String::as_str) {
        Some("host") => {
            let bind = SocketAddr::new(config.host, config.port);
            let host = link::host(bind, ConnectionId::new())?;
            println!("Waiting for an opponent. Share this address: {}", host.url());
            let peer = host.accept().await?;
            info!("Opponent connected");
            SessionSetup::peer(PeerRole::Authority, local, peer)
        }
        Some("join") => {
            let Some(url) = args.get(1) else {
                bail!("usage: word-duel join <ws://host:port/peer/ID>");
            };
            let peer = link::connect(url).await?;
            info!("Connected to {}", url);
            SessionSetup::peer(PeerRole::Mirror, local, peer)
        }
        Some("solo") => {
            let difficulty = match args.get(1) {
                Some(level) => level.parse::<Difficulty>().map_err(anyhow::Error::msg)?,
                None => config.computer_difficulty,
            };
            SessionSetup::solo(local, difficulty)
        }
        _ => bail!("usage: word-duel host | join <url> | solo [easy|medium|hard]"),
    };

    println!("{}", HELP);
    let mut session = spawn_session(setup, services);

    let commands = session.commands();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match parse_command(&line) {
                Ok(command) => {
                    let quitting = command == LocalCommand::Quit;
                    if commands.send(command).is_err() || quitting {
                        break;
                    }
                }
                Err(e) => println!("{}", e),
            }
        }
    });

    while let Some(event) = session.next_event().await {
        match &event {
            CoordinatorEvent::StateUpdated { snapshot } => println!("\n{}", render_board(snapshot)),
            other => {
                if let Some(text) = describe_event(other) {
                    println!("{}", text);
                }
            }
        }
        if matches!(event, CoordinatorEvent::SessionEnded { .. }) {
            break;
        }
    }

    if let Err(e) = session.join().await {
        error!("Session finished with an error: {}", e);
    }
    Ok(())
}
