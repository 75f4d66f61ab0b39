//! HTTP and WebSocket handlers.

pub mod error;
mod http;
mod websocket;

pub use http::{create_room, get_room_state, health_check, join_room, rejoin_room};
pub use websocket::websocket_handler;
