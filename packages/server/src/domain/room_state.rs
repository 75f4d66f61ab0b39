//! Playback state values: snapshots, control commands and the conflict rule.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};

use super::value_object::{RoomId, UserId};

/// Immutable copy of a room's playback fields at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomState {
    pub room_id: RoomId,
    pub video_url: String,
    pub is_playing: bool,
    /// Playhead position in seconds
    pub position: f64,
    /// Unset until a host is attached, and again after the host leaves.
    pub owner_id: Option<UserId>,
    pub updated_at: DateTime<Utc>,
}

/// Host request to change playback.
///
/// `video_url` and `is_playing` are partial updates: `None` leaves the room
/// field unchanged. `position` is always applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlMessage {
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub position: f64,
    pub video_url: Option<String>,
    pub is_playing: Option<bool>,
    /// Sender-supplied; defaulted to receipt time when absent.
    pub issued_at: DateTime<Utc>,
}

/// How a control older than the last applied one is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Reject a control whose `issued_at` precedes the last applied control.
    #[default]
    LastWriterWins,
    /// Apply every control in arrival order.
    LastReceivedWins,
}

impl ConflictPolicy {
    /// Whether a control issued at `issued_at` may be applied after one
    /// issued at `last_applied`.
    pub fn accepts(self, issued_at: DateTime<Utc>, last_applied: Option<DateTime<Utc>>) -> bool {
        match (self, last_applied) {
            (ConflictPolicy::LastReceivedWins, _) | (_, None) => true,
            (ConflictPolicy::LastWriterWins, Some(last)) => issued_at >= last,
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictPolicy::LastWriterWins => f.write_str("last-writer-wins"),
            ConflictPolicy::LastReceivedWins => f.write_str("last-received-wins"),
        }
    }
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "last-writer-wins" => Ok(ConflictPolicy::LastWriterWins),
            "last-received-wins" => Ok(ConflictPolicy::LastReceivedWins),
            other => Err(format!(
                "unknown conflict policy '{}' (expected last-writer-wins or last-received-wins)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn test_last_writer_wins_rejects_older_control() {
        // テスト項目: last-writer-wins では古い issued_at が拒否され、同時刻は受理される
        // given (前提条件):
        let last = Utc::now();
        let earlier = last - TimeDelta::seconds(1);

        // when / then:
        assert!(!ConflictPolicy::LastWriterWins.accepts(earlier, Some(last)));
        assert!(ConflictPolicy::LastWriterWins.accepts(last, Some(last)));
        assert!(ConflictPolicy::LastWriterWins.accepts(earlier, None));
    }

    #[test]
    fn test_last_received_wins_accepts_everything() {
        // テスト項目: last-received-wins では常に受理される
        // given (前提条件):
        let last = Utc::now();
        let earlier = last - TimeDelta::minutes(5);

        // when / then:
        assert!(ConflictPolicy::LastReceivedWins.accepts(earlier, Some(last)));
    }

    #[test]
    fn test_conflict_policy_parses_from_flag_value() {
        // テスト項目: 設定値の文字列から ConflictPolicy を解析できる
        // given / when / then:
        assert_eq!(
            "last-received-wins".parse::<ConflictPolicy>(),
            Ok(ConflictPolicy::LastReceivedWins)
        );
        assert_eq!(
            ConflictPolicy::LastWriterWins
                .to_string()
                .parse::<ConflictPolicy>(),
            Ok(ConflictPolicy::LastWriterWins)
        );
        assert!("newest".parse::<ConflictPolicy>().is_err());
    }
}
