//! Conversion logic between DTOs and domain values.

use chrono::{DateTime, Utc};
use lockstep_shared::time::is_unset;

use crate::domain::{ControlMessage, RoomId, RoomState, Session, UserId};

use super::{
    http::SessionDto,
    websocket::{ControlPayloadDto, RoomStateDto},
};

// ========================================
// Domain → DTO
// ========================================

impl From<RoomState> for RoomStateDto {
    fn from(state: RoomState) -> Self {
        Self {
            room_id: state.room_id.into_string(),
            video_url: state.video_url,
            is_playing: state.is_playing,
            position: state.position,
            owner_id: state.owner_id.map(UserId::into_string),
            updated_at: state.updated_at,
        }
    }
}

impl From<Session> for SessionDto {
    fn from(session: Session) -> Self {
        Self {
            room_id: session.room_id.into_string(),
            user_id: session.user_id.into_string(),
            token: session.token.into_string(),
            is_host: session.is_host,
            state: session.state.into(),
        }
    }
}

// ========================================
// DTO → Domain
// ========================================

impl ControlPayloadDto {
    /// Build a control for the authenticated sender.
    ///
    /// An absent or zero `issuedAt` is replaced by `received_at`.
    pub fn into_control(
        self,
        room_id: RoomId,
        sender_id: UserId,
        received_at: DateTime<Utc>,
    ) -> ControlMessage {
        let issued_at = match self.issued_at {
            Some(issued_at) if !is_unset(&issued_at) => issued_at,
            _ => received_at,
        };
        ControlMessage {
            room_id,
            sender_id,
            position: self.position,
            video_url: self.video_url,
            is_playing: self.is_playing,
            issued_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Token;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn payload(issued_at: Option<DateTime<Utc>>) -> ControlPayloadDto {
        ControlPayloadDto {
            position: 3.0,
            video_url: Some("https://x/b.mp4".to_string()),
            is_playing: None,
            issued_at,
        }
    }

    #[test]
    fn test_room_state_to_dto() {
        // テスト項目: RoomState が DTO に変換され、オーナー未設定は None になる
        // given (前提条件):
        let state = RoomState {
            room_id: RoomId::from("room_1"),
            video_url: "https://x/a.mp4".to_string(),
            is_playing: false,
            position: 0.0,
            owner_id: None,
            updated_at: at(100),
        };

        // when (操作):
        let dto: RoomStateDto = state.into();

        // then (期待する結果):
        assert_eq!(dto.room_id, "room_1");
        assert_eq!(dto.owner_id, None);
        assert_eq!(dto.updated_at, at(100));
    }

    #[test]
    fn test_session_to_dto_exposes_token() {
        // テスト項目: Session の DTO にはトークン文字列がそのまま入る
        // given (前提条件):
        let session = Session {
            room_id: RoomId::from("room_1"),
            user_id: UserId::from("user_1"),
            token: Token::from("tok_abc"),
            is_host: true,
            state: RoomState {
                room_id: RoomId::from("room_1"),
                video_url: "https://x/a.mp4".to_string(),
                is_playing: false,
                position: 0.0,
                owner_id: Some(UserId::from("user_1")),
                updated_at: at(0),
            },
        };

        // when (操作):
        let dto: SessionDto = session.into();

        // then (期待する結果):
        assert_eq!(dto.token, "tok_abc");
        assert!(dto.is_host);
        assert_eq!(dto.state.owner_id.as_deref(), Some("user_1"));
    }

    #[test]
    fn test_into_control_keeps_sender_timestamp() {
        // テスト項目: issuedAt が指定されていればそのまま使われる
        // given / when:
        let control = payload(Some(at(50))).into_control(
            RoomId::from("room_1"),
            UserId::from("user_1"),
            at(999),
        );

        // then (期待する結果):
        assert_eq!(control.issued_at, at(50));
        assert_eq!(control.video_url.as_deref(), Some("https://x/b.mp4"));
        assert_eq!(control.is_playing, None);
    }

    #[test]
    fn test_into_control_defaults_missing_or_zero_timestamp() {
        // テスト項目: issuedAt が無い、またはゼロ値なら受信時刻で補われる
        // given (前提条件):
        let zero = DateTime::parse_from_rfc3339("0001-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        // when (操作):
        let missing = payload(None).into_control(RoomId::from("r"), UserId::from("u"), at(999));
        let zeroed = payload(Some(zero)).into_control(RoomId::from("r"), UserId::from("u"), at(999));

        // then (期待する結果):
        assert_eq!(missing.issued_at, at(999));
        assert_eq!(zeroed.issued_at, at(999));
    }
}
