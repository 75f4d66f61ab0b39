//! UseCase: 参加者切断処理

use std::sync::Arc;

use crate::domain::RoomManager;

use super::connect_participant::ParticipantBinding;

/// 切断処理の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisconnectOutcome {
    /// この接続が参加者をルームから切り離したか
    pub detached: bool,
    /// ルームが空になりレジストリから削除されたか
    pub room_removed: bool,
}

/// 参加者切断のユースケース
pub struct DisconnectParticipantUseCase {
    manager: Arc<RoomManager>,
}

impl DisconnectParticipantUseCase {
    pub fn new(manager: Arc<RoomManager>) -> Self {
        Self { manager }
    }

    /// 接続終了時の後始末
    ///
    /// 参加者の切り離しは接続の世代が現在のものと一致する場合のみ行う。
    /// ルームの掃除は毎回試みる。
    pub async fn execute(&self, binding: &ParticipantBinding) -> DisconnectOutcome {
        let detached = binding
            .room
            .release_connection(&binding.participant.id, binding.epoch)
            .await;
        if detached {
            tracing::info!(
                "Participant '{}' detached from room '{}'",
                binding.participant.id,
                binding.room.id()
            );
        } else {
            tracing::debug!(
                "Connection epoch {} of participant '{}' was superseded",
                binding.epoch,
                binding.participant.id
            );
        }

        let room_removed = self.manager.cleanup_room(&binding.room).await;
        DisconnectOutcome {
            detached,
            room_removed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ConflictPolicy, DisplayName, Session, VideoUrl},
        usecase::ConnectParticipantUseCase,
    };
    use lockstep_shared::time::SystemClock;

    async fn setup() -> (Arc<RoomManager>, ConnectParticipantUseCase, Session) {
        let manager = Arc::new(RoomManager::new(
            Arc::new(SystemClock),
            ConflictPolicy::default(),
        ));
        let session = manager
            .create_room(
                DisplayName::new("alice".to_string()).unwrap(),
                VideoUrl::new("https://x/a.mp4".to_string()).unwrap(),
            )
            .await
            .unwrap();
        let connect = ConnectParticipantUseCase::new(manager.clone(), 8);
        (manager, connect, session)
    }

    #[tokio::test]
    async fn test_last_disconnect_removes_room() {
        // テスト項目: 最後の参加者が切断するとルームが削除される
        // given (前提条件):
        let (manager, connect, session) = setup().await;
        let authorization = connect
            .authorize(&session.room_id, Some(session.token.as_str()))
            .await
            .unwrap();
        let (binding, _receiver) = connect.bind(authorization).await.unwrap();
        let usecase = DisconnectParticipantUseCase::new(manager.clone());

        // when (操作):
        let outcome = usecase.execute(&binding).await;

        // then (期待する結果):
        assert_eq!(
            outcome,
            DisconnectOutcome {
                detached: true,
                room_removed: true
            }
        );
        assert_eq!(manager.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_superseded_connection_does_not_detach() {
        // テスト項目: 再接続で置き換えられた古い接続の切断では参加者は残る
        // given (前提条件):
        let (manager, connect, session) = setup().await;
        let authorization = connect
            .authorize(&session.room_id, Some(session.token.as_str()))
            .await
            .unwrap();
        let (old_binding, _old) = connect.bind(authorization.clone()).await.unwrap();
        let (_new_binding, _new) = connect.bind(authorization).await.unwrap();
        let usecase = DisconnectParticipantUseCase::new(manager.clone());

        // when (操作):
        let outcome = usecase.execute(&old_binding).await;

        // then (期待する結果):
        assert!(!outcome.detached);
        assert!(!outcome.room_removed);
        assert_eq!(manager.room_count().await, 1);
    }

    #[tokio::test]
    async fn test_double_disconnect_is_noop() {
        // テスト項目: 同じ接続の二重切断はエラーにならない
        // given (前提条件):
        let (manager, connect, session) = setup().await;
        let guest = manager
            .join_room(&session.room_id, DisplayName::new("bob".to_string()).unwrap())
            .await
            .unwrap();
        let authorization = connect
            .authorize(&session.room_id, Some(guest.token.as_str()))
            .await
            .unwrap();
        let (binding, _receiver) = connect.bind(authorization).await.unwrap();
        let usecase = DisconnectParticipantUseCase::new(manager.clone());

        // when (操作):
        let first = usecase.execute(&binding).await;
        let second = usecase.execute(&binding).await;

        // then (期待する結果): ホストが残っているのでルームは削除されない
        assert!(first.detached);
        assert!(!second.detached);
        assert!(!second.room_removed);
        assert_eq!(manager.room_count().await, 1);
    }
}
