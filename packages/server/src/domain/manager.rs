//! Process-wide registry of rooms.

use std::{collections::HashMap, sync::Arc, time::Duration};

use lockstep_shared::time::Clock;
use tokio::sync::RwLock;

use super::{
    error::RoomError,
    participant::ParticipantInfo,
    room::Room,
    room_state::{ConflictPolicy, RoomState},
    value_object::{DisplayName, RoomId, Token, UserId, VideoUrl},
};

/// What a client needs to open its connection after creating or joining a room.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub token: Token,
    pub is_host: bool,
    pub state: RoomState,
}

/// Outcome of one sweep over unconnected participants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub detached: usize,
    pub rooms_removed: usize,
}

/// Registry of rooms keyed by id.
///
/// The registry lock is independent of every room's own lock. When both are
/// needed the registry lock is taken first, and no path holds two room locks.
pub struct RoomManager {
    rooms: RwLock<HashMap<RoomId, Arc<Room>>>,
    clock: Arc<dyn Clock>,
    policy: ConflictPolicy,
}

impl RoomManager {
    pub fn new(clock: Arc<dyn Clock>, policy: ConflictPolicy) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            clock,
            policy,
        }
    }

    /// Create a room with the caller attached as host.
    pub async fn create_room(
        &self,
        display_name: DisplayName,
        video_url: VideoUrl,
    ) -> Result<Session, RoomError> {
        let room_id = RoomId::generate();
        let user_id = UserId::generate();
        let token = Token::generate();

        let room = Arc::new(Room::new(
            room_id.clone(),
            video_url.into_string(),
            self.clock.now(),
            self.policy,
        ));
        // Attach before publishing so the registry never holds an empty new room.
        room.attach_participant(
            user_id.clone(),
            display_name.as_str().to_string(),
            token.clone(),
            true,
        )
        .await?;
        let state = room.state_snapshot().await;

        self.rooms.write().await.insert(room_id.clone(), room);
        tracing::info!("Room '{}' created by host '{}'", room_id, user_id);

        Ok(Session {
            room_id,
            user_id,
            token,
            is_host: true,
            state,
        })
    }

    /// Attach a new guest to an existing room.
    pub async fn join_room(
        &self,
        room_id: &RoomId,
        display_name: DisplayName,
    ) -> Result<Session, RoomError> {
        let room = self.get_room(room_id).await?;
        let user_id = UserId::generate();
        let token = Token::generate();

        room.attach_participant(
            user_id.clone(),
            display_name.as_str().to_string(),
            token.clone(),
            false,
        )
        .await?;
        tracing::info!("Participant '{}' joined room '{}'", user_id, room_id);

        Ok(Session {
            room_id: room_id.clone(),
            user_id,
            token,
            is_host: false,
            state: room.state_snapshot().await,
        })
    }

    /// Rotate the token of the participant currently holding `token`.
    ///
    /// The old token stops resolving and any connection bound under it is closed.
    pub async fn rejoin_room(&self, room_id: &RoomId, token: &Token) -> Result<Session, RoomError> {
        let room = self.get_room(room_id).await?;
        let participant = room.find_by_token(token).await?;
        let new_token = Token::generate();

        room.attach_participant(
            participant.id.clone(),
            participant.name.clone(),
            new_token.clone(),
            participant.is_host,
        )
        .await?;
        tracing::info!(
            "Participant '{}' rotated its token in room '{}'",
            participant.id,
            room_id
        );

        Ok(Session {
            room_id: room_id.clone(),
            user_id: participant.id,
            token: new_token,
            is_host: participant.is_host,
            state: room.state_snapshot().await,
        })
    }

    pub async fn get_state(&self, room_id: &RoomId) -> Result<RoomState, RoomError> {
        let room = self.get_room(room_id).await?;
        Ok(room.state_snapshot().await)
    }

    /// Resolve a connection token within a room.
    pub async fn lookup_participant(
        &self,
        room_id: &RoomId,
        token: &Token,
    ) -> Result<(Arc<Room>, ParticipantInfo), RoomError> {
        let room = self.get_room(room_id).await?;
        let participant = room.find_by_token(token).await?;
        Ok((room, participant))
    }

    /// Remove `room` from the registry if it is empty and still registered.
    ///
    /// Compares room identity, not just id, so a stale call for an old
    /// instance never removes a newer room registered under the same id.
    pub async fn cleanup_room(&self, room: &Arc<Room>) -> bool {
        if room.participant_count().await > 0 {
            return false;
        }

        let mut rooms = self.rooms.write().await;
        let registered = rooms
            .get(room.id())
            .is_some_and(|current| Arc::ptr_eq(current, room));
        if !registered || !room.retire_if_empty().await {
            return false;
        }
        rooms.remove(room.id());
        tracing::info!("Room '{}' is empty and was removed", room.id());
        true
    }

    /// Detach participants left without a connection for `max_idle` and
    /// remove the rooms this empties.
    pub async fn sweep_unbound(&self, max_idle: Duration) -> SweepReport {
        let rooms: Vec<Arc<Room>> = self.rooms.read().await.values().cloned().collect();

        let mut report = SweepReport::default();
        for room in rooms {
            let released = room.release_unbound(max_idle).await;
            if released.is_empty() {
                continue;
            }
            report.detached += released.len();
            if self.cleanup_room(&room).await {
                report.rooms_removed += 1;
            }
        }
        report
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    async fn get_room(&self, room_id: &RoomId) -> Result<Arc<Room>, RoomError> {
        self.rooms
            .read()
            .await
            .get(room_id)
            .cloned()
            .ok_or(RoomError::RoomNotFound)
    }
}
