//! UseCase: ルーム状態取得処理

use std::sync::Arc;

use crate::domain::{RoomError, RoomId, RoomManager, RoomState};

/// ルーム状態取得のユースケース
pub struct GetRoomStateUseCase {
    manager: Arc<RoomManager>,
}

impl GetRoomStateUseCase {
    pub fn new(manager: Arc<RoomManager>) -> Self {
        Self { manager }
    }

    /// 現在のスナップショットを返す（状態は変更しない）
    pub async fn execute(&self, room_id: &RoomId) -> Result<RoomState, RoomError> {
        self.manager.get_state(room_id).await
    }
}
