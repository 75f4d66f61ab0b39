//! UseCase: 受信メッセージの振り分け
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DispatchMessageUseCase::execute() メソッド
//! - CONTROL / SYNC_REQUEST / それ以外の kind の扱い
//!
//! ### なぜこのテストが必要か
//! - ホスト以外の CONTROL が状態を変えないことを保証
//! - エラーは送信者にだけ返り、ブロードキャストされないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：ホストの CONTROL が全員に配信される、SYNC_REQUEST は本人にだけ返る
//! - 異常系：ゲストの CONTROL、壊れた JSON、未知の kind、古い issuedAt
//! - エッジケース：issuedAt の省略

use std::sync::Arc;

use lockstep_shared::time::Clock;

use crate::{
    domain::{BroadcastReport, RoomError},
    infrastructure::dto::websocket::{
        ErrorCode, KIND_CONTROL, KIND_SYNC_REQUEST, RawEnvelope, ServerEnvelope,
    },
};

use super::connect_participant::ParticipantBinding;

/// What a single inbound frame led to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A control was applied and the new state broadcast to the room.
    Broadcast(BroadcastReport),
    /// The current state was sent to the requester only.
    Synced,
    /// An `ERROR` envelope with this code was sent to the requester only.
    Rejected(ErrorCode),
    /// Nothing could be encoded; nothing was sent.
    Failed,
}

/// 受信メッセージ振り分けのユースケース
pub struct DispatchMessageUseCase {
    /// issuedAt が無い CONTROL の受信時刻
    clock: Arc<dyn Clock>,
}

impl DispatchMessageUseCase {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// 1 フレーム分のテキストを処理する
    pub async fn execute(&self, binding: &ParticipantBinding, text: &str) -> DispatchOutcome {
        let envelope = match RawEnvelope::parse(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(
                    "Malformed envelope from '{}': {}",
                    binding.participant.id,
                    e
                );
                return self
                    .reject(
                        binding,
                        ErrorCode::InvalidRequest,
                        format!("malformed envelope: {}", e),
                    )
                    .await;
            }
        };

        match envelope.kind.as_str() {
            KIND_CONTROL => self.control(binding, &envelope).await,
            KIND_SYNC_REQUEST => self.sync(binding, &envelope).await,
            other => {
                tracing::warn!(
                    "Unknown kind '{}' from '{}'",
                    other,
                    binding.participant.id
                );
                self.reject(binding, ErrorCode::UnknownKind, "unsupported message type")
                    .await
            }
        }
    }

    async fn control(
        &self,
        binding: &ParticipantBinding,
        envelope: &RawEnvelope,
    ) -> DispatchOutcome {
        // Guests are refused before their payload is even looked at.
        if !binding.participant.is_host {
            tracing::warn!(
                "Guest '{}' attempted to control room '{}'",
                binding.participant.id,
                binding.room.id()
            );
            return self
                .reject(
                    binding,
                    ErrorCode::Unauthorized,
                    RoomError::UnauthorizedControl.to_string(),
                )
                .await;
        }

        let data = match envelope.control() {
            Ok(data) => data,
            Err(e) => {
                return self
                    .reject(
                        binding,
                        ErrorCode::InvalidRequest,
                        format!("invalid CONTROL payload: {}", e),
                    )
                    .await;
            }
        };
        let control = data.payload.into_control(
            binding.room.id().clone(),
            binding.participant.id.clone(),
            self.clock.now(),
        );

        let state = match binding
            .room
            .apply_control(&binding.participant.id, &control)
            .await
        {
            Ok(state) => state,
            Err(RoomError::UnauthorizedControl) => {
                // The participant lost host ownership after connecting.
                return self
                    .reject(
                        binding,
                        ErrorCode::Unauthorized,
                        RoomError::UnauthorizedControl.to_string(),
                    )
                    .await;
            }
            Err(e) => {
                tracing::warn!(
                    "Control from '{}' rejected in room '{}': {}",
                    binding.participant.id,
                    binding.room.id(),
                    e
                );
                return self
                    .reject(binding, ErrorCode::ControlFailed, e.to_string())
                    .await;
            }
        };

        match ServerEnvelope::room_state(state.into()).encode() {
            Ok(frame) => DispatchOutcome::Broadcast(binding.room.broadcast(frame).await),
            Err(e) => {
                tracing::error!("Failed to encode room state: {}", e);
                DispatchOutcome::Failed
            }
        }
    }

    async fn sync(&self, binding: &ParticipantBinding, envelope: &RawEnvelope) -> DispatchOutcome {
        if let Err(e) = envelope.sync_request() {
            return self
                .reject(
                    binding,
                    ErrorCode::InvalidRequest,
                    format!("invalid SYNC_REQUEST payload: {}", e),
                )
                .await;
        }

        let snapshot = binding.room.state_snapshot().await;
        match ServerEnvelope::room_state(snapshot.into()).encode() {
            Ok(frame) => {
                binding.room.send_to(&binding.participant.id, frame).await;
                DispatchOutcome::Synced
            }
            Err(e) => {
                tracing::error!("Failed to encode room state: {}", e);
                DispatchOutcome::Failed
            }
        }
    }

    async fn reject(
        &self,
        binding: &ParticipantBinding,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> DispatchOutcome {
        match ServerEnvelope::error(code, message).encode() {
            Ok(frame) => {
                binding.room.send_to(&binding.participant.id, frame).await;
                DispatchOutcome::Rejected(code)
            }
            Err(e) => {
                tracing::error!("Failed to encode error envelope: {}", e);
                DispatchOutcome::Failed
            }
        }
    }
}
