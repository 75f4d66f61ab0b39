//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::RoomError;

/// WebSocket 接続の認可エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("missing token")]
    MissingToken,

    #[error(transparent)]
    Lookup(#[from] RoomError),
}
