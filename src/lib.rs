pub mod config;
pub mod game;
pub mod provider;
pub mod storage;
pub mod ui;

pub use game::session::Session;
pub use game::state::{Card, CardId, GameMode, GameStatus, SessionState};
