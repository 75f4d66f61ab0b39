//! Adapters between the core and the outside world: wire DTOs and the
//! WebSocket implementation of the `Transport` seam.

pub mod dto;
pub mod transport;
