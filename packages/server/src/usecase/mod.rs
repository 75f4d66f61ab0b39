//! UseCase 層
//!
//! HTTP / WebSocket ハンドラーから呼ばれるアプリケーション操作。
//! ドメイン層（RoomManager, Room）を組み合わせ、送信するフレームの
//! シリアライズもここで一度だけ行う。

mod connect_participant;
mod create_room;
mod disconnect_participant;
mod dispatch_message;
mod error;
mod get_room_state;
mod join_room;
mod sweep_idle_participants;

use std::{sync::Arc, time::Duration};

use lockstep_shared::time::Clock;

use crate::domain::RoomManager;

pub use connect_participant::{ConnectAuthorization, ConnectParticipantUseCase, ParticipantBinding};
pub use create_room::CreateRoomUseCase;
pub use disconnect_participant::{DisconnectOutcome, DisconnectParticipantUseCase};
pub use dispatch_message::{DispatchMessageUseCase, DispatchOutcome};
pub use error::ConnectError;
pub use get_room_state::GetRoomStateUseCase;
pub use join_room::{JoinRoomUseCase, RejoinRoomUseCase};
pub use sweep_idle_participants::SweepIdleParticipantsUseCase;

/// すべてのユースケースの組
#[derive(Clone)]
pub struct UseCases {
    pub create_room: Arc<CreateRoomUseCase>,
    pub join_room: Arc<JoinRoomUseCase>,
    pub rejoin_room: Arc<RejoinRoomUseCase>,
    pub get_room_state: Arc<GetRoomStateUseCase>,
    pub connect_participant: Arc<ConnectParticipantUseCase>,
    pub dispatch_message: Arc<DispatchMessageUseCase>,
    pub disconnect_participant: Arc<DisconnectParticipantUseCase>,
    pub sweep_idle_participants: Arc<SweepIdleParticipantsUseCase>,
}

impl UseCases {
    /// 1 つの RoomManager を共有するユースケース一式を組み立てる
    ///
    /// `bind_timeout` を過ぎても接続しない参加者は掃除の対象になる。
    pub fn new(
        manager: Arc<RoomManager>,
        clock: Arc<dyn Clock>,
        mailbox_capacity: usize,
        bind_timeout: Duration,
    ) -> Self {
        Self {
            create_room: Arc::new(CreateRoomUseCase::new(manager.clone())),
            join_room: Arc::new(JoinRoomUseCase::new(manager.clone())),
            rejoin_room: Arc::new(RejoinRoomUseCase::new(manager.clone())),
            get_room_state: Arc::new(GetRoomStateUseCase::new(manager.clone())),
            connect_participant: Arc::new(ConnectParticipantUseCase::new(
                manager.clone(),
                mailbox_capacity,
            )),
            dispatch_message: Arc::new(DispatchMessageUseCase::new(clock)),
            disconnect_participant: Arc::new(DisconnectParticipantUseCase::new(manager.clone())),
            sweep_idle_participants: Arc::new(SweepIdleParticipantsUseCase::new(
                manager,
                bind_timeout,
            )),
        }
    }
}
