//! Lockstep room synchronization server library.
//!
//! Keeps the participants of a room watching the same video in lock-step:
//! the host drives play, pause and seek; everyone else mirrors the room
//! state pushed over WebSocket.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
