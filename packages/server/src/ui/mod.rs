//! HTTP and WebSocket surface of the server.

pub mod config;
mod handler;
mod server;
mod signal;
pub mod state;

pub use config::ServerConfig;
pub use handler::error::{ApiError, ApiResult};
pub use server::{Server, router};
pub use signal::shutdown_signal;
