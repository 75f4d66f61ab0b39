//! Server execution logic.

use std::{future::Future, sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{get, post},
};
use tokio::{net::TcpListener, sync::watch};
use tower_http::trace::TraceLayer;

use crate::usecase::{SweepIdleParticipantsUseCase, UseCases};

use super::{
    config::ServerConfig,
    handler::{
        create_room, get_room_state, health_check, join_room, rejoin_room, websocket_handler,
    },
    signal::{shutdown_signal, wait_for_shutdown},
    state::AppState,
};

/// Room synchronization server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(usecases, config);
/// server.run().await?;
/// ```
pub struct Server {
    usecases: UseCases,
    config: ServerConfig,
}

impl Server {
    pub fn new(usecases: UseCases, config: ServerConfig) -> Self {
        Self { usecases, config }
    }

    /// Bind to the configured address and serve until Ctrl+C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the configured address or
    /// if there's an error during server execution.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        tracing::info!("Lockstep server listening on {}", listener.local_addr()?);
        tracing::info!("Press Ctrl+C to shutdown gracefully");
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `signal` resolves.
    ///
    /// Open connections are told to close when the signal fires; whatever is
    /// still running after the shutdown timeout is abandoned.
    pub async fn serve<F>(
        self,
        listener: TcpListener,
        signal: F,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let shutdown_timeout = self.config.shutdown_timeout();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sweeper = tokio::spawn(sweep_idle_participants(
            self.usecases.sweep_idle_participants.clone(),
            self.config.idle_timeout(),
            shutdown_rx.clone(),
        ));
        let app = router(Arc::new(AppState {
            usecases: self.usecases,
            connection: self.config.connection_settings(),
            shutdown: shutdown_rx.clone(),
        }));

        let graceful = async move {
            signal.await;
            tracing::info!("Shutting down, closing open connections");
            // Receivers only fail to see this if they are all gone already.
            let _ = shutdown_tx.send(true);
        };
        let mut server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(graceful)
                .await
        });

        tokio::select! {
            result = &mut server => {
                sweeper.abort();
                result??;
                tracing::info!("Server shutdown complete");
                return Ok(());
            }
            () = wait_for_shutdown(shutdown_rx) => {}
        }
        sweeper.abort();

        match tokio::time::timeout(shutdown_timeout, &mut server).await {
            Ok(result) => {
                result??;
                tracing::info!("Server shutdown complete");
            }
            Err(_) => {
                tracing::warn!(
                    "Graceful shutdown did not finish within {:?}, aborting",
                    shutdown_timeout
                );
                server.abort();
            }
        }
        Ok(())
    }
}

/// Periodically detach participants that never connected, until shutdown.
async fn sweep_idle_participants(
    usecase: Arc<SweepIdleParticipantsUseCase>,
    period: Duration,
    shutdown: watch::Receiver<bool>,
) {
    // `interval` panics on a zero period.
    let mut ticker = tokio::time::interval(period.max(Duration::from_secs(1)));
    // The first tick completes immediately.
    ticker.tick().await;
    let shutdown = wait_for_shutdown(shutdown);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                usecase.execute().await;
            }
            () = &mut shutdown => break,
        }
    }
}

/// Build the router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // HTTP エンドポイント
        .route("/healthz", get(health_check))
        .route("/api/rooms", post(create_room))
        .route("/api/rooms/create", post(create_room))
        .route("/api/rooms/join/{room_id}", post(join_room))
        .route("/api/rooms/{room_id}", get(get_room_state))
        .route("/api/rooms/{room_id}/join", post(join_room))
        .route("/api/rooms/{room_id}/rejoin", post(rejoin_room))
        // WebSocket エンドポイント
        .route("/ws/rooms/{room_id}", get(websocket_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

