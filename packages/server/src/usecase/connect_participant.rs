//! UseCase: 参加者接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::authorize() / bind() メソッド
//! - トークン認可と、接続直後の ROOM_STATE 送信
//!
//! ### どのような状況を想定しているか
//! - 正常系：有効なトークンでの接続、初期スナップショットの受信
//! - 異常系：トークンなし、不正なトークン、存在しないルーム
//! - エッジケース：同じ参加者の再接続で古い接続のメールボックスが閉じる
//! - エッジケース：認可とバインドの間にトークンがローテーションされるとバインドは失敗する

use std::sync::Arc;

use crate::{
    domain::{MailboxReceiver, ParticipantInfo, Room, RoomError, RoomId, RoomManager, Token},
    infrastructure::dto::websocket::ServerEnvelope,
};

use super::error::ConnectError;

/// アップグレード前の認可結果
///
/// 提示されたトークンを保持し、バインド時にもう一度照合する。
#[derive(Debug, Clone)]
pub struct ConnectAuthorization {
    pub room: Arc<Room>,
    pub participant: ParticipantInfo,
    pub token: Token,
}

/// 接続中のコネクションと参加者の対応
///
/// `epoch` はこの接続がバインドされた世代。再接続やトークンの
/// ローテーションで古くなった接続は参加者を切り離さない。
#[derive(Debug, Clone)]
pub struct ParticipantBinding {
    pub room: Arc<Room>,
    pub participant: ParticipantInfo,
    pub epoch: u64,
}

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    manager: Arc<RoomManager>,
    mailbox_capacity: usize,
}

impl ConnectParticipantUseCase {
    pub fn new(manager: Arc<RoomManager>, mailbox_capacity: usize) -> Self {
        Self {
            manager,
            mailbox_capacity,
        }
    }

    /// アップグレード前にトークンを検証する
    ///
    /// # Returns
    ///
    /// * `Ok(ConnectAuthorization)` - トークンが解決できた
    /// * `Err(ConnectError)` - トークンなし、または解決できない
    pub async fn authorize(
        &self,
        room_id: &RoomId,
        token: Option<&str>,
    ) -> Result<ConnectAuthorization, ConnectError> {
        let token = match token {
            Some(token) if !token.is_empty() => Token::from(token),
            _ => return Err(ConnectError::MissingToken),
        };
        let (room, participant) = self.manager.lookup_participant(room_id, &token).await?;
        Ok(ConnectAuthorization {
            room,
            participant,
            token,
        })
    }

    /// 接続を参加者にバインドし、現在の状態を最初のフレームとして積む
    ///
    /// 既存の接続があればそのメールボックスは閉じられ、古い送信ループが終了する。
    /// 認可後にトークンが無効になっていれば `InvalidToken` を返す。
    pub async fn bind(
        &self,
        authorization: ConnectAuthorization,
    ) -> Result<(ParticipantBinding, MailboxReceiver), RoomError> {
        let ConnectAuthorization {
            room,
            participant,
            token,
        } = authorization;
        let (epoch, receiver) = room
            .bind_connection(&participant.id, &token, self.mailbox_capacity)
            .await?;

        let snapshot = room.state_snapshot().await;
        match ServerEnvelope::room_state(snapshot.into()).encode() {
            Ok(frame) => {
                room.send_to(&participant.id, frame).await;
            }
            Err(e) => tracing::error!("Failed to encode initial room state: {}", e),
        }

        tracing::info!(
            "Participant '{}' bound to room '{}' (epoch {})",
            participant.id,
            room.id(),
            epoch
        );

        Ok((
            ParticipantBinding {
                room,
                participant,
                epoch,
            },
            receiver,
        ))
    }
}
