pub mod chat;
pub mod computer;
pub mod consensus;
pub mod game_events;
pub mod puzzle;
pub mod selection;
pub mod turn_engine;

// Re-export main components
pub use chat::*;
pub use computer::*;
pub use consensus::*;
pub use game_events::*;
pub use puzzle::*;
pub use selection::*;
pub use turn_engine::*;
