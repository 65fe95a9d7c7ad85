//! Mentor/student live-coding rooms: one shared code buffer, a chat feed and
//! presence counts per room, kept in sync over WebSockets.

pub mod api;
pub mod config;
pub mod error;
pub mod rooms;

pub use error::{Result, RoomError};
