//! `Transport` implementations.
//!
//! - `websocket`: the split write half of an axum WebSocket

pub mod websocket;

pub use websocket::WebSocketTransport;
