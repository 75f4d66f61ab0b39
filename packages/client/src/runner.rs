//! Client execution logic with reconnection support.

use std::time::Duration;

use lockstep_server::infrastructure::dto::http::SessionDto;

use super::{
    api::ApiClient, error::ClientError, input::spawn_input_thread, session::run_client_session,
};

const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const RECONNECT_INTERVAL_SECS: u64 = 5;

/// How the client enters a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinMode {
    /// Create a new room playing this video, as host
    Create(String),
    /// Join an existing room as guest
    Join(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// HTTP origin of the server
    pub server: String,
    pub display_name: String,
    pub mode: JoinMode,
}

/// Run the client with reconnection logic
pub async fn run_client(config: ClientConfig) -> Result<(), ClientError> {
    let api = ApiClient::new(config.server.clone());
    let mut session = match &config.mode {
        JoinMode::Create(video_url) => api.create_room(&config.display_name, video_url).await?,
        JoinMode::Join(room_id) => api.join_room(room_id, &config.display_name).await?,
    };
    tracing::info!(
        "Entered room '{}' as '{}'",
        session.room_id,
        session.user_id
    );

    let prompt = format!("{}> ", config.display_name);
    let mut input = spawn_input_thread(prompt.clone());
    let mut reconnect_count = 0;

    loop {
        match run_client_session(&api, &session, &mut input, &prompt).await {
            Ok(()) => {
                tracing::info!("Client session ended normally");
                break;
            }
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                tracing::warn!("Connection lost: {}", e);
                reconnect_count += 1;

                if reconnect_count >= MAX_RECONNECT_ATTEMPTS {
                    tracing::error!(
                        "Failed to reconnect after {} attempts. Exiting.",
                        MAX_RECONNECT_ATTEMPTS
                    );
                    return Err(e);
                }

                tracing::info!(
                    "Reconnecting in {} seconds... (attempt {}/{})",
                    RECONNECT_INTERVAL_SECS,
                    reconnect_count + 1,
                    MAX_RECONNECT_ATTEMPTS
                );
                tokio::time::sleep(Duration::from_secs(RECONNECT_INTERVAL_SECS)).await;

                match resume(&api, &session, &config.display_name).await {
                    Ok(resumed) => session = resumed,
                    // Server unreachable: keep the session and retry on the next attempt.
                    Err(e) if e.is_retryable() => tracing::warn!("Rejoin failed: {}", e),
                    Err(e) => return Err(e),
                }
            }
        }
    }

    Ok(())
}

/// Get a usable session back after a disconnect.
///
/// Rotating the token keeps our identity (and host role) if the server still
/// holds the participant. Once the server has detached us the token is gone,
/// and the only way back in is a fresh join as guest.
async fn resume(
    api: &ApiClient,
    session: &SessionDto,
    display_name: &str,
) -> Result<SessionDto, ClientError> {
    match api.rejoin_room(&session.room_id, &session.token).await {
        Ok(resumed) => Ok(resumed),
        Err(ClientError::Unauthorized(_)) => {
            tracing::info!("Token expired, joining room '{}' again", session.room_id);
            if session.is_host {
                tracing::warn!("Host role was released when the connection dropped");
            }
            api.join_room(&session.room_id, display_name).await
        }
        Err(e) => Err(e),
    }
}
