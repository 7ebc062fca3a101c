pub mod contestant;
pub mod errors;
pub mod game;
pub mod grid;
pub mod messages;

// Re-export all types
pub use contestant::*;
pub use errors::*;
pub use game::*;
pub use grid::*;
pub use messages::*;
