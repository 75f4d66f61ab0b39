//! Server state shared by every handler.

use std::time::Duration;

use tokio::sync::watch;

use crate::{domain::BatchConfig, usecase::UseCases};

/// Per-connection limits and timings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub batch: BatchConfig,
    /// A connection with no inbound traffic for this long is closed.
    pub idle_timeout: Duration,
    pub max_message_bytes: usize,
    /// How long a closing connection may take to flush its mailbox.
    pub drain_timeout: Duration,
}

/// Shared application state
pub struct AppState {
    pub usecases: UseCases,
    pub connection: ConnectionSettings,
    /// Flips to `true` once the process starts shutting down.
    pub shutdown: watch::Receiver<bool>,
}
