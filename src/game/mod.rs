pub mod deck;
pub mod difficulty;
pub mod records;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod theme;
