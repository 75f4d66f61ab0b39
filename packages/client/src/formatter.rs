//! Message formatting utilities for client display.

use lockstep_server::infrastructure::dto::{
    http::SessionDto,
    websocket::{ErrorPayload, RoomStateDto},
};
use lockstep_shared::time::format_timestamp;

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Banner shown once a session is established
    pub fn format_welcome(session: &SessionDto) -> String {
        let role = if session.is_host { "host" } else { "guest" };
        let mut output = String::new();
        output.push_str("\n============================================================\n");
        output.push_str(&format!("Room:  {}\n", session.room_id));
        output.push_str(&format!("You:   {} ({})\n", session.user_id, role));
        output.push_str(&format!("Video: {}\n", session.state.video_url));
        output.push_str("============================================================\n");
        if session.is_host {
            output.push_str("You control playback. Type 'help' for commands.\n");
        } else {
            output.push_str("The host controls playback. Type 'sync' to refresh, 'quit' to leave.\n");
        }
        output
    }

    /// Format a `ROOM_STATE` update
    ///
    /// # Arguments
    ///
    /// * `state` - The room state received from the server
    /// * `current_user_id` - The current user's ID (to mark the host as "me")
    pub fn format_room_state(state: &RoomStateDto, current_user_id: &str) -> String {
        let status = if state.is_playing { "playing" } else { "paused" };
        let host = match state.owner_id.as_deref() {
            Some(owner) if owner == current_user_id => "me".to_string(),
            Some(owner) => owner.to_string(),
            None => "(none)".to_string(),
        };
        format!(
            "\n[{}] {} at {:.1}s - {} (host: {})\n",
            format_timestamp(&state.updated_at),
            status,
            state.position,
            state.video_url,
            host
        )
    }

    /// Format an `ERROR` envelope
    pub fn format_error(error: &ErrorPayload) -> String {
        format!("\n! {}: {}\n", error.code, error.message)
    }

    /// Format a frame that could not be decoded
    pub fn format_raw_message(text: &str) -> String {
        format!("\n? {}\n", text)
    }
}
