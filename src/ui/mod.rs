pub mod app;
pub mod board;
pub mod hud;
pub mod records;
