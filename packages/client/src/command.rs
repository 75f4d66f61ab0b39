//! Terminal commands and the envelopes they turn into.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use lockstep_server::infrastructure::dto::websocket::{
    ClientEnvelope, ControlDataDto, ControlPayloadDto, RoomStateDto, SyncRequestDto,
};
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  play [pos]   resume playback (at pos seconds)
  pause [pos]  pause playback (at pos seconds)
  seek <pos>   jump to pos seconds
  load <url>   switch to another video
  sync         ask the server for the current state
  help         show this help
  quit         leave the room";

/// One line of user input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play(Option<f64>),
    Pause(Option<f64>),
    Seek(f64),
    Load(String),
    Sync,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}' (type 'help')")]
    Unknown(String),

    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),

    #[error("invalid position '{0}': expected seconds >= 0")]
    InvalidPosition(String),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let name = parts.next().ok_or(CommandError::Empty)?;
        let arg = parts.next();

        match name.to_ascii_lowercase().as_str() {
            "play" => Ok(Command::Play(arg.map(parse_position).transpose()?)),
            "pause" => Ok(Command::Pause(arg.map(parse_position).transpose()?)),
            "seek" => {
                let arg = arg.ok_or(CommandError::MissingArgument("seek"))?;
                Ok(Command::Seek(parse_position(arg)?))
            }
            "load" => {
                let url = arg.ok_or(CommandError::MissingArgument("load"))?;
                Ok(Command::Load(url.to_string()))
            }
            "sync" => Ok(Command::Sync),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn parse_position(arg: &str) -> Result<f64, CommandError> {
    match arg.parse::<f64>() {
        Ok(position) if position.is_finite() && position >= 0.0 => Ok(position),
        _ => Err(CommandError::InvalidPosition(arg.to_string())),
    }
}

/// Where the playhead should be now, given the last known state.
pub fn estimate_position(state: &RoomStateDto, now: DateTime<Utc>) -> f64 {
    if !state.is_playing {
        return state.position;
    }
    let elapsed = (now - state.updated_at).num_milliseconds().max(0) as f64 / 1000.0;
    state.position + elapsed
}

impl Command {
    /// Build the envelope for this command.
    ///
    /// `help` and `quit` are handled locally and produce nothing.
    pub fn to_envelope(
        &self,
        room_id: &str,
        user_id: &str,
        state: Option<&RoomStateDto>,
        now: DateTime<Utc>,
    ) -> Option<ClientEnvelope> {
        let current = state.map(|s| estimate_position(s, now)).unwrap_or(0.0);
        let control = |control_type: &str, payload: ControlPayloadDto| {
            ClientEnvelope::Control(ControlDataDto {
                control_type: control_type.to_string(),
                room_id: room_id.to_string(),
                sender_id: user_id.to_string(),
                payload,
            })
        };

        match self {
            Command::Play(position) => Some(control(
                "play",
                ControlPayloadDto {
                    position: position.unwrap_or(current),
                    video_url: None,
                    is_playing: Some(true),
                    issued_at: Some(now),
                },
            )),
            Command::Pause(position) => Some(control(
                "pause",
                ControlPayloadDto {
                    position: position.unwrap_or(current),
                    video_url: None,
                    is_playing: Some(false),
                    issued_at: Some(now),
                },
            )),
            Command::Seek(position) => Some(control(
                "seek",
                ControlPayloadDto {
                    position: *position,
                    video_url: None,
                    is_playing: None,
                    issued_at: Some(now),
                },
            )),
            Command::Load(url) => Some(control(
                "load",
                ControlPayloadDto {
                    position: 0.0,
                    video_url: Some(url.clone()),
                    is_playing: Some(false),
                    issued_at: Some(now),
                },
            )),
            Command::Sync => Some(ClientEnvelope::SyncRequest(SyncRequestDto {
                room_id: room_id.to_string(),
                sender_id: user_id.to_string(),
            })),
            Command::Help | Command::Quit => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn state(position: f64, is_playing: bool, updated_at: DateTime<Utc>) -> RoomStateDto {
        RoomStateDto {
            room_id: "room_1".to_string(),
            video_url: "https://x/a.mp4".to_string(),
            is_playing,
            position,
            owner_id: Some("user_1".to_string()),
            updated_at,
        }
    }

    #[test]
    fn test_parse_commands() {
        // テスト項目: 各コマンドがパースされる
        // given / when / then:
        assert_eq!("play".parse(), Ok(Command::Play(None)));
        assert_eq!("play 12.5".parse(), Ok(Command::Play(Some(12.5))));
        assert_eq!("PAUSE 3".parse(), Ok(Command::Pause(Some(3.0))));
        assert_eq!("seek 90".parse(), Ok(Command::Seek(90.0)));
        assert_eq!(
            "load https://x/b.mp4".parse(),
            Ok(Command::Load("https://x/b.mp4".to_string()))
        );
        assert_eq!("sync".parse(), Ok(Command::Sync));
        assert_eq!("quit".parse(), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_errors() {
        // テスト項目: 不正な入力はエラーになる
        // given / when / then:
        assert_eq!("".parse::<Command>(), Err(CommandError::Empty));
        assert_eq!(
            "rewind".parse::<Command>(),
            Err(CommandError::Unknown("rewind".to_string()))
        );
        assert_eq!(
            "seek".parse::<Command>(),
            Err(CommandError::MissingArgument("seek"))
        );
        assert_eq!(
            "seek -1".parse::<Command>(),
            Err(CommandError::InvalidPosition("-1".to_string()))
        );
        assert_eq!(
            "play NaN".parse::<Command>(),
            Err(CommandError::InvalidPosition("NaN".to_string()))
        );
    }

    #[test]
    fn test_estimate_position_advances_while_playing() {
        // テスト項目: 再生中なら経過時間ぶん位置が進み、停止中は進まない
        // given (前提条件):
        let playing = state(10.0, true, at(100));
        let paused = state(10.0, false, at(100));

        // when / then:
        assert_eq!(estimate_position(&playing, at(105)), 15.0);
        assert_eq!(estimate_position(&paused, at(105)), 10.0);
        assert_eq!(estimate_position(&playing, at(90)), 10.0);
    }

    #[test]
    fn test_play_without_position_uses_estimate() {
        // テスト項目: 位置なしの play は推定位置と現在時刻で CONTROL を作る
        // given (前提条件):
        let current = state(10.0, false, at(100));

        // when (操作):
        let envelope = Command::Play(None).to_envelope("room_1", "user_1", Some(&current), at(200));

        // then (期待する結果):
        match envelope {
            Some(ClientEnvelope::Control(data)) => {
                assert_eq!(data.control_type, "play");
                assert_eq!(data.payload.position, 10.0);
                assert_eq!(data.payload.is_playing, Some(true));
                assert_eq!(data.payload.issued_at, Some(at(200)));
            }
            other => panic!("unexpected envelope: {:?}", other),
        }
    }

    #[test]
    fn test_local_commands_produce_no_envelope() {
        // テスト項目: help と quit はサーバーに送られない
        // given / when / then:
        assert!(Command::Help.to_envelope("r", "u", None, at(0)).is_none());
        assert!(Command::Quit.to_envelope("r", "u", None, at(0)).is_none());
        assert!(matches!(
            Command::Sync.to_envelope("r", "u", None, at(0)),
            Some(ClientEnvelope::SyncRequest(_))
        ));
    }
}
