//! One WebSocket session with a room.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use lockstep_server::infrastructure::dto::{
    http::SessionDto,
    websocket::{RoomStateDto, ServerEnvelope},
};
use lockstep_shared::time::{Clock, SystemClock};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, protocol::Message},
};

use crate::{
    api::ApiClient,
    command::{Command, HELP},
    error::ClientError,
    formatter::MessageFormatter,
    ui::redisplay_prompt,
};

/// Keeps the connection inside the server's idle timeout while the user is quiet.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(20);

/// Run the WebSocket session until the user quits or the connection drops.
///
/// Returns `Ok(())` only when the user asked to leave.
pub async fn run_client_session(
    api: &ApiClient,
    session: &SessionDto,
    input: &mut mpsc::UnboundedReceiver<String>,
    prompt: &str,
) -> Result<(), ClientError> {
    let url = api.websocket_url(&session.room_id, &session.token);
    let (ws_stream, _response) = connect_async(&url).await.map_err(|e| match e {
        tungstenite::Error::Http(response) if response.status() == 401 => {
            ClientError::Unauthorized("connection token was rejected".to_string())
        }
        e => ClientError::ConnectionError(e.to_string()),
    })?;

    tracing::info!("Connected to room '{}'", session.room_id);
    print!("{}", MessageFormatter::format_welcome(session));
    redisplay_prompt(prompt);

    let (mut write, mut read) = ws_stream.split();
    let clock = SystemClock;
    let mut last_state: Option<RoomStateDto> = Some(session.state.clone());
    let mut keepalive = tokio::time::interval(KEEPALIVE_INTERVAL);
    keepalive.tick().await;

    loop {
        tokio::select! {
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ServerEnvelope>(text.as_str()) {
                        Ok(ServerEnvelope::RoomState(payload)) => {
                            print!(
                                "{}",
                                MessageFormatter::format_room_state(&payload.room, &session.user_id)
                            );
                            last_state = Some(payload.room);
                        }
                        Ok(ServerEnvelope::Error(error)) => {
                            print!("{}", MessageFormatter::format_error(&error));
                        }
                        Err(_) => print!("{}", MessageFormatter::format_raw_message(text.as_str())),
                    }
                    redisplay_prompt(prompt);
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!("Server closed the connection");
                    return Err(ClientError::ConnectionError("Connection lost".to_string()));
                }
                Some(Err(e)) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    return Err(ClientError::ConnectionError(e.to_string()));
                }
                Some(Ok(_)) => {}
            },
            line = input.recv() => {
                // Input closed (Ctrl+C / Ctrl+D) means the user is leaving.
                let Some(line) = line else {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                };
                let command = match line.parse::<Command>() {
                    Ok(command) => command,
                    Err(e) => {
                        println!("{}", e);
                        redisplay_prompt(prompt);
                        continue;
                    }
                };
                match command {
                    Command::Quit => {
                        let _ = write.send(Message::Close(None)).await;
                        return Ok(());
                    }
                    Command::Help => println!("{}", HELP),
                    command => {
                        let envelope = command.to_envelope(
                            &session.room_id,
                            &session.user_id,
                            last_state.as_ref(),
                            clock.now(),
                        );
                        if let Some(envelope) = envelope {
                            let json = match serde_json::to_string(&envelope) {
                                Ok(json) => json,
                                Err(e) => {
                                    tracing::error!("Failed to serialize command: {}", e);
                                    continue;
                                }
                            };
                            write
                                .send(Message::Text(json.into()))
                                .await
                                .map_err(|e| ClientError::ConnectionError(e.to_string()))?;
                        }
                    }
                }
                redisplay_prompt(prompt);
            }
            _ = keepalive.tick() => {
                write
                    .send(Message::Ping(Vec::new().into()))
                    .await
                    .map_err(|e| ClientError::ConnectionError(e.to_string()))?;
            }
        }
    }
}
