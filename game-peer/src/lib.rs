pub mod config;
pub mod console;
pub mod coordinator;
pub mod link;
pub mod services;
pub mod session;

pub use coordinator::{CoordinatorEvent, LocalCommand, MatchCoordinator};
pub use session::{Opponent, SessionHandle, SessionSetup, spawn_session};
