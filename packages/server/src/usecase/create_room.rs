//! UseCase: ルーム作成処理

use std::sync::Arc;

use crate::domain::{DisplayName, RoomError, RoomManager, Session, VideoUrl};

/// ルーム作成のユースケース
pub struct CreateRoomUseCase {
    manager: Arc<RoomManager>,
}

impl CreateRoomUseCase {
    pub fn new(manager: Arc<RoomManager>) -> Self {
        Self { manager }
    }

    /// 作成者をホストとしてルームを作成する
    pub async fn execute(
        &self,
        display_name: DisplayName,
        video_url: VideoUrl,
    ) -> Result<Session, RoomError> {
        self.manager.create_room(display_name, video_url).await
    }
}
