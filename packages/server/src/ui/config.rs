//! Server configuration.
//!
//! Every option can be given as a flag or through its `LOCKSTEP_*`
//! environment variable.

use std::time::Duration;

use clap::Parser;

use crate::domain::{BatchConfig, ConflictPolicy};

use super::state::ConnectionSettings;

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "lockstep-server")]
#[command(about = "Room synchronization server for shared video playback", long_about = None)]
pub struct ServerConfig {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "LOCKSTEP_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "LOCKSTEP_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Frames buffered per participant before new ones are dropped
    #[arg(long, env = "LOCKSTEP_MAILBOX_CAPACITY", default_value_t = 8)]
    pub mailbox_capacity: usize,

    /// Frames written per flush
    #[arg(long, env = "LOCKSTEP_BATCH_SIZE", default_value_t = 5)]
    pub batch_size: usize,

    /// Idle time before a partial batch is flushed
    #[arg(long, env = "LOCKSTEP_FLUSH_INTERVAL_MS", default_value_t = 5)]
    pub flush_interval_ms: u64,

    /// Close a connection that sends nothing for this long
    #[arg(long, env = "LOCKSTEP_IDLE_TIMEOUT_SECS", default_value_t = 60)]
    pub idle_timeout_secs: u64,

    /// Upper bound on graceful shutdown
    #[arg(long, env = "LOCKSTEP_SHUTDOWN_TIMEOUT_SECS", default_value_t = 10)]
    pub shutdown_timeout_secs: u64,

    /// How a CONTROL older than the last applied one is handled
    /// (last-writer-wins or last-received-wins)
    #[arg(long, env = "LOCKSTEP_CONFLICT_POLICY", default_value_t = ConflictPolicy::LastWriterWins)]
    pub conflict_policy: ConflictPolicy,

    /// Largest inbound WebSocket message accepted
    #[arg(long, env = "LOCKSTEP_MAX_MESSAGE_BYTES", default_value_t = 65536)]
    pub max_message_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            mailbox_capacity: 8,
            batch_size: 5,
            flush_interval_ms: 5,
            idle_timeout_secs: 60,
            shutdown_timeout_secs: 10,
            conflict_policy: ConflictPolicy::LastWriterWins,
            max_message_bytes: 65536,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            max_batch: self.batch_size,
            flush_interval: Duration::from_millis(self.flush_interval_ms),
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Read timeout of a connection, also the window a session has to connect.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            batch: self.batch_config(),
            idle_timeout: self.idle_timeout(),
            max_message_bytes: self.max_message_bytes,
            drain_timeout: self.shutdown_timeout(),
        }
    }
}
