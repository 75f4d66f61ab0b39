//! UseCase: ルーム参加・再参加処理

use std::sync::Arc;

use crate::domain::{DisplayName, RoomError, RoomId, RoomManager, Session, Token};

/// ゲストとしてのルーム参加のユースケース
pub struct JoinRoomUseCase {
    manager: Arc<RoomManager>,
}

impl JoinRoomUseCase {
    pub fn new(manager: Arc<RoomManager>) -> Self {
        Self { manager }
    }

    pub async fn execute(
        &self,
        room_id: &RoomId,
        display_name: DisplayName,
    ) -> Result<Session, RoomError> {
        self.manager.join_room(room_id, display_name).await
    }
}

/// 再参加（トークンのローテーション）のユースケース
///
/// 旧トークンで接続中のコネクションはこの時点で閉じられる。
pub struct RejoinRoomUseCase {
    manager: Arc<RoomManager>,
}

impl RejoinRoomUseCase {
    pub fn new(manager: Arc<RoomManager>) -> Self {
        Self { manager }
    }

    pub async fn execute(&self, room_id: &RoomId, token: &Token) -> Result<Session, RoomError> {
        self.manager.rejoin_room(room_id, token).await
    }
}
