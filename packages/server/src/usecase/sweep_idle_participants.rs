//! UseCase: 未接続参加者の掃除
//!
//! HTTP で作成・参加・再参加したまま WebSocket を開かない参加者は、
//! 接続の切断処理が走らないためルームに残り続ける。一定時間バインドされない
//! 参加者を切り離し、空になったルームを削除する。

use std::{sync::Arc, time::Duration};

use crate::domain::{RoomManager, SweepReport};

/// 未接続参加者を掃除するユースケース
pub struct SweepIdleParticipantsUseCase {
    manager: Arc<RoomManager>,
    max_idle: Duration,
}

impl SweepIdleParticipantsUseCase {
    pub fn new(manager: Arc<RoomManager>, max_idle: Duration) -> Self {
        Self { manager, max_idle }
    }

    pub async fn execute(&self) -> SweepReport {
        let report = self.manager.sweep_unbound(self.max_idle).await;
        if report.detached > 0 {
            tracing::info!(
                "Swept {} unconnected participant(s), removed {} room(s)",
                report.detached,
                report.rooms_removed
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConflictPolicy, DisplayName, VideoUrl};
    use lockstep_shared::time::SystemClock;

    #[tokio::test]
    async fn test_room_never_connected_is_removed() {
        // テスト項目: 作成後に一度も接続されなかったルームは削除される
        // given (前提条件):
        let manager = Arc::new(RoomManager::new(
            Arc::new(SystemClock),
            ConflictPolicy::default(),
        ));
        manager
            .create_room(
                DisplayName::new("alice".to_string()).unwrap(),
                VideoUrl::new("https://x/a.mp4".to_string()).unwrap(),
            )
            .await
            .unwrap();
        let usecase = SweepIdleParticipantsUseCase::new(manager.clone(), Duration::ZERO);

        // when (操作):
        let report = usecase.execute().await;

        // then (期待する結果):
        assert_eq!(report.detached, 1);
        assert_eq!(report.rooms_removed, 1);
        assert_eq!(manager.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_recent_session_survives_sweep() {
        // テスト項目: 期限内の未接続参加者は残る
        // given (前提条件):
        let manager = Arc::new(RoomManager::new(
            Arc::new(SystemClock),
            ConflictPolicy::default(),
        ));
        manager
            .create_room(
                DisplayName::new("alice".to_string()).unwrap(),
                VideoUrl::new("https://x/a.mp4".to_string()).unwrap(),
            )
            .await
            .unwrap();
        let usecase =
            SweepIdleParticipantsUseCase::new(manager.clone(), Duration::from_secs(3600));

        // when (操作):
        let report = usecase.execute().await;

        // then (期待する結果):
        assert_eq!(report, SweepReport::default());
        assert_eq!(manager.room_count().await, 1);
    }
}
