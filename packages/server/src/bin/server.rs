//! Lockstep room synchronization server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin lockstep-server
//! cargo run --bin lockstep-server -- --host 0.0.0.0 --port 3000
//! LOCKSTEP_CONFLICT_POLICY=last-received-wins cargo run --bin lockstep-server
//! ```

use std::sync::Arc;

use clap::Parser;
use lockstep_server::{
    domain::RoomManager,
    ui::{Server, ServerConfig},
    usecase::UseCases,
};
use lockstep_shared::{
    logger::setup_logger,
    time::{Clock, SystemClock},
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let config = ServerConfig::parse();
    tracing::info!(
        "Conflict policy: {}, mailbox capacity: {}",
        config.conflict_policy,
        config.mailbox_capacity
    );

    // Initialize dependencies in order:
    // 1. Clock
    // 2. RoomManager
    // 3. UseCases
    // 4. Server

    // 1. Create Clock
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // 2. Create RoomManager (in-memory registry of rooms)
    let manager = Arc::new(RoomManager::new(clock.clone(), config.conflict_policy));

    // 3. Create UseCases
    let usecases = UseCases::new(
        manager,
        clock,
        config.mailbox_capacity,
        config.idle_timeout(),
    );

    // 4. Create and run the server
    let server = Server::new(usecases, config);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
