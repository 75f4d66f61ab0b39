//! WebSocket connection handlers.

use std::{fmt, sync::Arc};

use axum::{
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::stream::{SplitStream, StreamExt};
use serde::Deserialize;

use crate::{
    domain::{RoomId, SendLoop, UserId},
    infrastructure::transport::WebSocketTransport,
    ui::{signal::wait_for_shutdown, state::AppState},
    usecase::{ConnectAuthorization, ParticipantBinding},
};

use super::error::ApiResult;

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

/// Lifecycle of one connection, logged on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionPhase {
    /// Token resolved, transport not yet bound.
    Connecting,
    /// Bound to its participant; initial state queued.
    Bound,
    /// Read and send loops running.
    Active,
    Closing,
    /// Participant released and cleanup offered.
    Detached,
}

/// Why the read side of a connection stopped
#[derive(Debug, Clone, PartialEq, Eq)]
enum CloseReason {
    PeerClosed,
    StreamEnded,
    ReadError(String),
    IdleTimeout,
    Shutdown,
    /// The send loop ended first: write failure, rebind or token rotation.
    SendLoopEnded,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::PeerClosed => f.write_str("peer closed"),
            CloseReason::StreamEnded => f.write_str("stream ended"),
            CloseReason::ReadError(e) => write!(f, "read error: {}", e),
            CloseReason::IdleTimeout => f.write_str("idle timeout"),
            CloseReason::Shutdown => f.write_str("server shutdown"),
            CloseReason::SendLoopEnded => f.write_str("send loop ended"),
        }
    }
}

struct ConnectionLog {
    user_id: UserId,
    phase: ConnectionPhase,
}

impl ConnectionLog {
    fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            phase: ConnectionPhase::Connecting,
        }
    }

    fn transition(&mut self, next: ConnectionPhase) {
        tracing::debug!(
            "Connection of '{}': {:?} -> {:?}",
            self.user_id,
            self.phase,
            next
        );
        self.phase = next;
    }
}

/// Authorize the token, then upgrade.
///
/// A missing or unresolvable token is answered with 401 and never upgraded.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Query(query): Query<ConnectQuery>,
) -> ApiResult<impl IntoResponse> {
    let room_id = RoomId::from(room_id);
    let authorization = match state
        .usecases
        .connect_participant
        .authorize(&room_id, query.token.as_deref())
        .await
    {
        Ok(resolved) => resolved,
        Err(e) => {
            tracing::warn!("Rejecting WebSocket for room '{}': {}", room_id, e);
            return Err(e.into());
        }
    };

    let max_message_bytes = state.connection.max_message_bytes;
    Ok(ws
        .max_message_size(max_message_bytes)
        .on_upgrade(move |socket| handle_socket(socket, state, authorization)))
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    authorization: ConnectAuthorization,
) {
    let mut log = ConnectionLog::new(authorization.participant.id.clone());

    let (binding, mailbox) = match state
        .usecases
        .connect_participant
        .bind(authorization)
        .await
    {
        Ok(bound) => bound,
        Err(e) => {
            // Detached or rotated between upgrade and bind; dropping the socket closes it.
            tracing::warn!("Failed to bind connection of '{}': {}", log.user_id, e);
            return;
        }
    };
    log.transition(ConnectionPhase::Bound);

    let (sink, stream) = socket.split();
    let send_loop = SendLoop::new(
        mailbox,
        WebSocketTransport::new(sink),
        state.connection.batch,
    );
    let mut send_task = tokio::spawn(send_loop.run());
    let mut recv_task = tokio::spawn(read_loop(stream, state.clone(), binding.clone()));
    log.transition(ConnectionPhase::Active);

    // If either side stops, the connection is closing.
    let (reason, send_finished) = tokio::select! {
        result = &mut recv_task => {
            let reason = result.unwrap_or_else(|e| CloseReason::ReadError(e.to_string()));
            (reason, false)
        }
        result = &mut send_task => {
            recv_task.abort();
            if let Ok(exit) = result {
                tracing::debug!("Send loop of '{}' exited: {:?}", log.user_id, exit);
            }
            (CloseReason::SendLoopEnded, true)
        }
    };
    tracing::info!("Connection of '{}' closing: {}", log.user_id, reason);
    log.transition(ConnectionPhase::Closing);

    // Detaching drops the mailbox, so the send loop flushes what is queued and exits.
    let outcome = state
        .usecases
        .disconnect_participant
        .execute(&binding)
        .await;
    if !send_finished
        && tokio::time::timeout(state.connection.drain_timeout, &mut send_task)
            .await
            .is_err()
    {
        tracing::warn!("Send loop of '{}' did not drain in time", log.user_id);
        send_task.abort();
    }

    log.transition(ConnectionPhase::Detached);
    if outcome.room_removed {
        tracing::info!("Room '{}' closed after last participant left", binding.room.id());
    }
}

/// Read inbound frames until the peer goes away, goes quiet, or the server stops.
async fn read_loop(
    mut stream: SplitStream<WebSocket>,
    state: Arc<AppState>,
    binding: ParticipantBinding,
) -> CloseReason {
    let idle_timeout = state.connection.idle_timeout;
    let shutdown = wait_for_shutdown(state.shutdown.clone());
    tokio::pin!(shutdown);

    loop {
        let next = tokio::select! {
            next = tokio::time::timeout(idle_timeout, stream.next()) => next,
            () = &mut shutdown => return CloseReason::Shutdown,
        };
        let message = match next {
            Err(_) => return CloseReason::IdleTimeout,
            Ok(None) => return CloseReason::StreamEnded,
            Ok(Some(Err(e))) => return CloseReason::ReadError(e.to_string()),
            Ok(Some(Ok(message))) => message,
        };

        match message {
            Message::Text(text) => {
                let outcome = state
                    .usecases
                    .dispatch_message
                    .execute(&binding, text.as_str())
                    .await;
                tracing::debug!(
                    "Dispatched frame from '{}': {:?}",
                    binding.participant.id,
                    outcome
                );
            }
            Message::Close(_) => return CloseReason::PeerClosed,
            Message::Binary(_) => {
                tracing::debug!(
                    "Ignoring binary frame from '{}'",
                    binding.participant.id
                );
            }
            // Ping/pong is answered by the WebSocket layer; it still counts as traffic.
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
}
