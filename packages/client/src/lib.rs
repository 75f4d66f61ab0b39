//! Lockstep terminal client.
//!
//! Creates or joins a room over HTTP, opens the room's WebSocket and lets the
//! user drive playback (as host) or watch the shared state (as guest).

pub mod api;
pub mod command;
pub mod error;
pub mod formatter;
mod input;
mod runner;
mod session;
mod ui;

pub use runner::{ClientConfig, JoinMode, run_client};
