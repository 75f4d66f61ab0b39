//! Data Transfer Objects (DTOs) for the sync protocol.
//!
//! DTOs are organized by protocol:
//! - `websocket`: envelopes exchanged over the room connection
//! - `http`: request and response bodies of the REST API

pub mod conversion;
pub mod http;
pub mod websocket;
