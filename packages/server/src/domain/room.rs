//! Room entity: the authoritative playback state of one room.
//!
//! All mutable fields, the participant map and the token index live behind a
//! single lock. Nothing outside this module touches them directly; snapshots
//! are copied under the lock and used lock-free afterwards.

use std::{collections::HashMap, time::Duration};

use chrono::{DateTime, Utc};
use tokio::{sync::RwLock, task::JoinSet, time::Instant};

use super::{
    error::RoomError,
    mailbox::{Delivery, Frame, Mailbox, MailboxReceiver},
    participant::{Participant, ParticipantInfo},
    room_state::{ConflictPolicy, ControlMessage, RoomState},
    value_object::{RoomId, Token, UserId},
};

/// Above this many recipients a broadcast is fanned out over worker tasks.
pub const BROADCAST_POOL_THRESHOLD: usize = 10;

/// Upper bound on broadcast worker tasks.
pub const MAX_BROADCAST_WORKERS: usize = 10;

/// Outcome counters of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub enqueued: usize,
    pub dropped: usize,
    pub closed: usize,
}

impl BroadcastReport {
    fn record(&mut self, delivery: Delivery) {
        match delivery {
            Delivery::Enqueued => self.enqueued += 1,
            Delivery::Dropped => self.dropped += 1,
            Delivery::Closed => self.closed += 1,
            Delivery::Unbound => {}
        }
    }

    fn merge(&mut self, other: BroadcastReport) {
        self.enqueued += other.enqueued;
        self.dropped += other.dropped;
        self.closed += other.closed;
    }
}

#[derive(Debug)]
struct RoomInner {
    video_url: String,
    is_playing: bool,
    position: f64,
    owner_id: Option<UserId>,
    updated_at: DateTime<Utc>,
    /// `issued_at` of the last applied control, the reference for staleness.
    last_control_at: Option<DateTime<Utc>>,
    participants: HashMap<UserId, Participant>,
    token_index: HashMap<Token, UserId>,
    /// Set by the registry when it removes this room; attaching is refused afterwards.
    retired: bool,
}

impl RoomInner {
    fn snapshot(&self, room_id: &RoomId) -> RoomState {
        RoomState {
            room_id: room_id.clone(),
            video_url: self.video_url.clone(),
            is_playing: self.is_playing,
            position: self.position,
            owner_id: self.owner_id.clone(),
            updated_at: self.updated_at,
        }
    }

    fn remove_participant(&mut self, user_id: &UserId) -> Option<Participant> {
        let participant = self.participants.remove(user_id)?;
        if self.token_index.get(participant.token()) == Some(user_id) {
            self.token_index.remove(participant.token());
        }
        if self.owner_id.as_ref() == Some(user_id) {
            self.owner_id = None;
        }
        Some(participant)
    }
}

/// One synchronized playback room
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    policy: ConflictPolicy,
    inner: RwLock<RoomInner>,
}

impl Room {
    /// Create an empty, paused room at position 0.
    pub fn new(id: RoomId, video_url: String, now: DateTime<Utc>, policy: ConflictPolicy) -> Self {
        Self {
            id,
            policy,
            inner: RwLock::new(RoomInner {
                video_url,
                is_playing: false,
                position: 0.0,
                owner_id: None,
                updated_at: now,
                last_control_at: None,
                participants: HashMap::new(),
                token_index: HashMap::new(),
                retired: false,
            }),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// Attach a participant, or re-attach an existing one with a new token.
    ///
    /// Re-attaching keeps the participant's host flag, drops its previous
    /// token from the index and closes any connection bound under the old
    /// token. A second, different host is refused.
    pub async fn attach_participant(
        &self,
        user_id: UserId,
        name: String,
        token: Token,
        is_host: bool,
    ) -> Result<(), RoomError> {
        let mut inner = self.inner.write().await;
        if inner.retired {
            return Err(RoomError::RoomNotFound);
        }

        if let Some(participant) = inner.participants.get_mut(&user_id) {
            let old_token = participant.rotate_token(token.clone());
            participant.unbind();
            let participant_is_host = participant.is_host();
            inner.token_index.remove(&old_token);
            inner.token_index.insert(token, user_id.clone());
            if participant_is_host {
                inner.owner_id = Some(user_id);
            }
            return Ok(());
        }

        if is_host
            && let Some(owner) = &inner.owner_id
            && owner != &user_id
        {
            return Err(RoomError::HostAlreadyAssigned(owner.to_string()));
        }

        inner.token_index.insert(token.clone(), user_id.clone());
        inner.participants.insert(
            user_id.clone(),
            Participant::new(user_id.clone(), name, token, is_host),
        );
        if is_host {
            inner.owner_id = Some(user_id);
        }
        Ok(())
    }

    /// Resolve a token to the participant currently holding it.
    pub async fn find_by_token(&self, token: &Token) -> Result<ParticipantInfo, RoomError> {
        let inner = self.inner.read().await;
        let user_id = inner.token_index.get(token).ok_or(RoomError::InvalidToken)?;
        match inner.participants.get(user_id) {
            Some(participant) => Ok(participant.info()),
            None => {
                tracing::error!(
                    "Token index of room '{}' points at missing participant '{}'",
                    self.id,
                    user_id
                );
                Err(RoomError::ParticipantNotFound)
            }
        }
    }

    pub async fn state_snapshot(&self) -> RoomState {
        self.inner.read().await.snapshot(&self.id)
    }

    /// Apply a host control and return the post-update snapshot.
    ///
    /// `updated_at` becomes the control's `issued_at`, not the receipt time.
    pub async fn apply_control(
        &self,
        sender_id: &UserId,
        control: &ControlMessage,
    ) -> Result<RoomState, RoomError> {
        let mut inner = self.inner.write().await;

        let sender_is_host = inner
            .participants
            .get(sender_id)
            .is_some_and(|p| p.is_host())
            && inner.owner_id.as_ref() == Some(sender_id);
        if !sender_is_host {
            return Err(RoomError::UnauthorizedControl);
        }

        if !self.policy.accepts(control.issued_at, inner.last_control_at) {
            return Err(RoomError::StaleControl {
                issued_at: control.issued_at.to_rfc3339(),
                last_applied: inner
                    .last_control_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default(),
            });
        }

        inner.position = control.position;
        if let Some(video_url) = &control.video_url {
            inner.video_url = video_url.clone();
        }
        if let Some(is_playing) = control.is_playing {
            inner.is_playing = is_playing;
        }
        inner.updated_at = control.issued_at;
        inner.last_control_at = Some(control.issued_at);

        Ok(inner.snapshot(&self.id))
    }

    /// Offer `frame` to every bound participant without waiting.
    ///
    /// Full mailboxes drop the frame. Large rooms are split across worker
    /// tasks; the drop policy is the same either way.
    pub async fn broadcast(&self, frame: Frame) -> BroadcastReport {
        let targets: Vec<(UserId, Mailbox)> = {
            let inner = self.inner.read().await;
            inner
                .participants
                .values()
                .filter_map(|p| p.mailbox().map(|m| (p.id().clone(), m.clone())))
                .collect()
        };

        let report = if targets.len() > BROADCAST_POOL_THRESHOLD {
            let workers = targets.len().min(MAX_BROADCAST_WORKERS);
            let chunk_size = targets.len().div_ceil(workers);
            let mut set = JoinSet::new();
            for chunk in targets.chunks(chunk_size) {
                let chunk = chunk.to_vec();
                let frame = frame.clone();
                set.spawn(async move { deliver_all(&chunk, &frame) });
            }
            let mut report = BroadcastReport::default();
            while let Some(result) = set.join_next().await {
                match result {
                    Ok(partial) => report.merge(partial),
                    Err(e) => tracing::error!("Broadcast worker failed: {}", e),
                }
            }
            report
        } else {
            deliver_all(&targets, &frame)
        };

        tracing::debug!(
            "Broadcast in room '{}': {} enqueued, {} dropped, {} closed",
            self.id,
            report.enqueued,
            report.dropped,
            report.closed
        );
        report
    }

    /// Offer `frame` to a single participant without waiting.
    pub async fn send_to(&self, user_id: &UserId, frame: Frame) -> Delivery {
        let inner = self.inner.read().await;
        let delivery = match inner.participants.get(user_id) {
            Some(participant) => participant.send(frame),
            None => Delivery::Closed,
        };
        if delivery == Delivery::Dropped {
            tracing::warn!(
                "Mailbox of participant '{}' in room '{}' is full, frame dropped",
                user_id,
                self.id
            );
        }
        delivery
    }

    /// Bind a new connection to a participant, closing any previous one.
    ///
    /// `token` is the one the connection presented; it must still belong to
    /// `user_id`, so a token rotated away since authorization cannot bind.
    /// Returns the binding epoch and the consumer side of the fresh mailbox.
    pub async fn bind_connection(
        &self,
        user_id: &UserId,
        token: &Token,
        mailbox_capacity: usize,
    ) -> Result<(u64, MailboxReceiver), RoomError> {
        let mut inner = self.inner.write().await;
        if inner.token_index.get(token) != Some(user_id) {
            return Err(RoomError::InvalidToken);
        }
        let participant = inner
            .participants
            .get_mut(user_id)
            .ok_or(RoomError::ParticipantNotFound)?;
        Ok(participant.bind(mailbox_capacity))
    }

    /// Detach a participant on behalf of the connection bound at `epoch`.
    ///
    /// Does nothing if the participant has since been rebound or rotated.
    /// Returns whether the participant was detached.
    pub async fn release_connection(&self, user_id: &UserId, epoch: u64) -> bool {
        let mut inner = self.inner.write().await;
        let current = inner
            .participants
            .get(user_id)
            .is_some_and(|p| p.epoch() == epoch);
        if !current {
            return false;
        }
        inner.remove_participant(user_id).is_some()
    }

    /// Detach every participant that has gone `max_idle` without a connection.
    ///
    /// Covers sessions that were created, joined or rotated over HTTP and
    /// never connected. Returns the detached ids.
    pub async fn release_unbound(&self, max_idle: Duration) -> Vec<UserId> {
        let now = Instant::now();
        let mut inner = self.inner.write().await;
        let expired: Vec<UserId> = inner
            .participants
            .values()
            .filter(|p| p.unbound_for(now).is_some_and(|idle| idle >= max_idle))
            .map(|p| p.id().clone())
            .collect();
        for user_id in &expired {
            inner.remove_participant(user_id);
            tracing::info!(
                "Participant '{}' never connected to room '{}', detached",
                user_id,
                self.id
            );
        }
        expired
    }

    /// Remove a participant and its token; closes its mailbox. Idempotent.
    pub async fn detach_participant(&self, user_id: &UserId) {
        let mut inner = self.inner.write().await;
        inner.remove_participant(user_id);
    }

    pub async fn participant_count(&self) -> usize {
        self.inner.read().await.participants.len()
    }

    /// Mark the room as retired if it has no participants.
    ///
    /// Called by the registry while it holds its own lock, so a join racing
    /// with cleanup either lands before (and keeps the room alive) or fails
    /// with `RoomNotFound`.
    pub(crate) async fn retire_if_empty(&self) -> bool {
        let mut inner = self.inner.write().await;
        if inner.participants.is_empty() {
            inner.retired = true;
        }
        inner.retired
    }
}

fn deliver_all(targets: &[(UserId, Mailbox)], frame: &Frame) -> BroadcastReport {
    let mut report = BroadcastReport::default();
    for (user_id, mailbox) in targets {
        let delivery = mailbox.offer(frame.clone());
        if delivery == Delivery::Dropped {
            tracing::warn!("Mailbox of participant '{}' is full, frame dropped", user_id);
        }
        report.record(delivery);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use lockstep_shared::time::{Clock, FixedClock};
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        FixedClock::from_millis(1_700_000_000_000).now()
    }

    async fn create_room_with_host(policy: ConflictPolicy) -> (Room, UserId, Token) {
        let room = Room::new(RoomId::from("room_1"), "https://x/a.mp4".to_string(), now(), policy);
        let host = UserId::from("user_host");
        let token = Token::from("tok_host");
        room.attach_participant(host.clone(), "host".to_string(), token.clone(), true)
            .await
            .unwrap();
        (room, host, token)
    }

    fn control(room: &Room, sender: &UserId, position: f64, issued_at: DateTime<Utc>) -> ControlMessage {
        ControlMessage {
            room_id: room.id().clone(),
            sender_id: sender.clone(),
            position,
            video_url: None,
            is_playing: Some(true),
            issued_at,
        }
    }

    #[tokio::test]
    async fn test_new_room_starts_paused_at_zero() {
        // テスト項目: 作成直後のルームは一時停止・位置 0 で、ホストがオーナーになる
        // given (前提条件):
        let (room, host, _token) = create_room_with_host(ConflictPolicy::default()).await;

        // when (操作):
        let state = room.state_snapshot().await;

        // then (期待する結果):
        assert_eq!(state.position, 0.0);
        assert!(!state.is_playing);
        assert_eq!(state.video_url, "https://x/a.mp4");
        assert_eq!(state.owner_id, Some(host));
        assert_eq!(state.updated_at, now());
    }

    #[tokio::test]
    async fn test_apply_control_by_host_updates_state() {
        // テスト項目: ホストの CONTROL で状態が更新され、updated_at は issued_at になる
        // given (前提条件):
        let (room, host, _token) = create_room_with_host(ConflictPolicy::default()).await;
        let issued_at = now() + TimeDelta::seconds(3);

        // when (操作):
        let state = room
            .apply_control(&host, &control(&room, &host, 12.5, issued_at))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(state.position, 12.5);
        assert!(state.is_playing);
        assert_eq!(state.updated_at, issued_at);
        assert_eq!(room.state_snapshot().await, state);
    }

    #[tokio::test]
    async fn test_apply_control_partial_update_keeps_absent_fields() {
        // テスト項目: 省略されたフィールドは変更されない
        // given (前提条件):
        let (room, host, _token) = create_room_with_host(ConflictPolicy::default()).await;
        room.apply_control(&host, &control(&room, &host, 5.0, now()))
            .await
            .unwrap();
        let mut seek = control(&room, &host, 42.0, now() + TimeDelta::seconds(1));
        seek.is_playing = None;
        seek.video_url = Some("https://x/b.mp4".to_string());

        // when (操作):
        let state = room.apply_control(&host, &seek).await.unwrap();

        // then (期待する結果):
        assert!(state.is_playing);
        assert_eq!(state.position, 42.0);
        assert_eq!(state.video_url, "https://x/b.mp4");
    }

    #[tokio::test]
    async fn test_apply_control_by_guest_is_rejected_without_change() {
        // テスト項目: ゲストの CONTROL は拒否され、状態は変わらない
        // given (前提条件):
        let (room, _host, _token) = create_room_with_host(ConflictPolicy::default()).await;
        let guest = UserId::from("user_guest");
        room.attach_participant(guest.clone(), "guest".to_string(), Token::from("tok_guest"), false)
            .await
            .unwrap();
        let before = room.state_snapshot().await;

        // when (操作):
        let result = room
            .apply_control(&guest, &control(&room, &guest, 99.0, now()))
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(RoomError::UnauthorizedControl));
        assert_eq!(room.state_snapshot().await, before);
    }

    #[tokio::test]
    async fn test_stale_control_rejected_under_last_writer_wins() {
        // テスト項目: last-writer-wins では直前の CONTROL より古いものが拒否される
        // given (前提条件):
        let (room, host, _token) = create_room_with_host(ConflictPolicy::LastWriterWins).await;
        let t1 = now() + TimeDelta::seconds(10);
        room.apply_control(&host, &control(&room, &host, 10.0, t1))
            .await
            .unwrap();
        let before = room.state_snapshot().await;

        // when (操作):
        let result = room
            .apply_control(&host, &control(&room, &host, 3.0, t1 - TimeDelta::seconds(1)))
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(RoomError::StaleControl { .. })));
        assert_eq!(room.state_snapshot().await, before);
    }

    #[tokio::test]
    async fn test_first_control_accepted_even_if_older_than_creation() {
        // テスト項目: 最初の CONTROL はルーム作成時刻より古くても受理される（時計ずれ対策）
        // given (前提条件):
        let (room, host, _token) = create_room_with_host(ConflictPolicy::LastWriterWins).await;
        let skewed = now() - TimeDelta::seconds(30);

        // when (操作):
        let result = room.apply_control(&host, &control(&room, &host, 1.0, skewed)).await;

        // then (期待する結果):
        assert_eq!(result.unwrap().updated_at, skewed);
    }

    #[tokio::test]
    async fn test_stale_control_applied_under_last_received_wins() {
        // テスト項目: last-received-wins では古い CONTROL もそのまま適用される
        // given (前提条件):
        let (room, host, _token) = create_room_with_host(ConflictPolicy::LastReceivedWins).await;
        let t1 = now() + TimeDelta::seconds(10);
        room.apply_control(&host, &control(&room, &host, 10.0, t1))
            .await
            .unwrap();

        // when (操作):
        let earlier = t1 - TimeDelta::seconds(1);
        let state = room
            .apply_control(&host, &control(&room, &host, 3.0, earlier))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(state.position, 3.0);
        assert_eq!(state.updated_at, earlier);
    }

    #[tokio::test]
    async fn test_second_host_is_refused() {
        // テスト項目: 別のユーザーを2人目のホストとして追加することはできない
        // given (前提条件):
        let (room, host, _token) = create_room_with_host(ConflictPolicy::default()).await;

        // when (操作):
        let result = room
            .attach_participant(UserId::from("user_other"), "other".to_string(), Token::from("tok_o"), true)
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(RoomError::HostAlreadyAssigned(host.to_string())));
        assert_eq!(room.participant_count().await, 1);
    }

    #[tokio::test]
    async fn test_reattach_rotates_token_and_closes_connection() {
        // テスト項目: 再アタッチでトークンが差し替えられ、古い接続は閉じられる
        // given (前提条件):
        let (room, host, old_token) = create_room_with_host(ConflictPolicy::default()).await;
        let (epoch, mut receiver) = room.bind_connection(&host, &old_token, 4).await.unwrap();
        let new_token = Token::from("tok_rotated");

        // when (操作):
        room.attach_participant(host.clone(), "ignored".to_string(), new_token.clone(), false)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(room.find_by_token(&old_token).await, Err(RoomError::InvalidToken));
        let info = room.find_by_token(&new_token).await.unwrap();
        assert_eq!(info.id, host);
        assert!(info.is_host);
        assert_eq!(room.state_snapshot().await.owner_id, Some(host.clone()));
        assert_eq!(receiver.recv().await, None);
        // 古い接続の切断処理は新しいセッションを巻き込まない
        assert!(!room.release_connection(&host, epoch).await);
        assert_eq!(room.participant_count().await, 1);
    }

    #[tokio::test]
    async fn test_detach_is_idempotent_and_clears_owner() {
        // テスト項目: 二重の detach はエラーにならず、ホスト離脱でオーナーが未設定になる
        // given (前提条件):
        let (room, host, token) = create_room_with_host(ConflictPolicy::default()).await;

        // when (操作):
        room.detach_participant(&host).await;
        room.detach_participant(&host).await;

        // then (期待する結果):
        assert_eq!(room.participant_count().await, 0);
        assert_eq!(room.find_by_token(&token).await, Err(RoomError::InvalidToken));
        assert_eq!(room.state_snapshot().await.owner_id, None);
    }

    #[tokio::test]
    async fn test_release_connection_detaches_current_binding() {
        // テスト項目: 現在のエポックで release すると参加者が削除される
        // given (前提条件):
        let (room, host, token) = create_room_with_host(ConflictPolicy::default()).await;
        let (_old_epoch, _old_receiver) = room.bind_connection(&host, &token, 4).await.unwrap();
        let (epoch, _receiver) = room.bind_connection(&host, &token, 4).await.unwrap();

        // when (操作):
        let stale = room.release_connection(&host, epoch - 1).await;
        let current = room.release_connection(&host, epoch).await;

        // then (期待する結果):
        assert!(!stale);
        assert!(current);
        assert_eq!(room.participant_count().await, 0);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_bound_participant() {
        // テスト項目: ブロードキャストは送信者を含むすべてのバインド済み参加者に届く
        // given (前提条件):
        let (room, host, token) = create_room_with_host(ConflictPolicy::default()).await;
        let guest = UserId::from("user_guest");
        room.attach_participant(guest.clone(), "guest".to_string(), Token::from("tok_g"), false)
            .await
            .unwrap();
        let (_e1, mut host_rx) = room.bind_connection(&host, &token, 4).await.unwrap();
        let (_e2, mut guest_rx) = room.bind_connection(&guest, &Token::from("tok_g"), 4).await.unwrap();

        // when (操作):
        let report = room.broadcast(Arc::from("state")).await;

        // then (期待する結果):
        assert_eq!(report.enqueued, 2);
        assert_eq!(host_rx.recv().await.as_deref(), Some("state"));
        assert_eq!(guest_rx.recv().await.as_deref(), Some("state"));
    }

    #[tokio::test]
    async fn test_broadcast_skips_full_mailbox() {
        // テスト項目: メールボックスが満杯の参加者はスキップされ、他の参加者には届く
        // given (前提条件):
        let (room, host, token) = create_room_with_host(ConflictPolicy::default()).await;
        let guest = UserId::from("user_guest");
        room.attach_participant(guest.clone(), "guest".to_string(), Token::from("tok_g"), false)
            .await
            .unwrap();
        let (_e1, mut host_rx) = room.bind_connection(&host, &token, 1).await.unwrap();
        let (_e2, _stalled_guest_rx) = room.bind_connection(&guest, &Token::from("tok_g"), 1).await.unwrap();
        room.send_to(&guest, Arc::from("backlog")).await;
        room.send_to(&host, Arc::from("first")).await;
        host_rx.recv().await;

        // when (操作):
        let report = room.broadcast(Arc::from("second")).await;

        // then (期待する結果):
        assert_eq!(report.enqueued, 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(host_rx.recv().await.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_broadcast_uses_worker_pool_for_large_rooms() {
        // テスト項目: 参加者が多いルームでもすべての参加者に届く（ワーカープール経由）
        // given (前提条件):
        let (room, _host, _token) = create_room_with_host(ConflictPolicy::default()).await;
        let mut receivers = Vec::new();
        for i in 0..(BROADCAST_POOL_THRESHOLD * 3) {
            let id = UserId::from(format!("user_{}", i));
            room.attach_participant(id.clone(), format!("guest{}", i), Token::from(format!("tok_{}", i)), false)
                .await
                .unwrap();
            let token = Token::from(format!("tok_{}", i));
            receivers.push(room.bind_connection(&id, &token, 2).await.unwrap().1);
        }

        // when (操作):
        let report = room.broadcast(Arc::from("tick")).await;

        // then (期待する結果):
        assert_eq!(report.enqueued, BROADCAST_POOL_THRESHOLD * 3);
        for receiver in receivers.iter_mut() {
            assert_eq!(receiver.recv().await.as_deref(), Some("tick"));
        }
    }

    #[tokio::test]
    async fn test_snapshot_is_stable_without_mutation() {
        // テスト項目: 変更がなければスナップショットは同一になる
        // given (前提条件):
        let (room, _host, _token) = create_room_with_host(ConflictPolicy::default()).await;

        // when (操作):
        let first = room.state_snapshot().await;
        let second = room.state_snapshot().await;

        // then (期待する結果):
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_retired_room_refuses_attach() {
        // テスト項目: 空になり退役したルームには参加できない
        // given (前提条件):
        let (room, host, _token) = create_room_with_host(ConflictPolicy::default()).await;
        assert!(!room.retire_if_empty().await);
        room.detach_participant(&host).await;

        // when (操作):
        let retired = room.retire_if_empty().await;
        let result = room
            .attach_participant(UserId::from("user_late"), "late".to_string(), Token::from("tok_l"), false)
            .await;

        // then (期待する結果):
        assert!(retired);
        assert_eq!(result, Err(RoomError::RoomNotFound));
    }

    #[tokio::test]
    async fn test_bind_with_rotated_token_is_refused() {
        // テスト項目: 認可後にトークンがローテーションされたら、古いトークンではバインドできない
        // given (前提条件):
        let (room, host, old_token) = create_room_with_host(ConflictPolicy::default()).await;
        let new_token = Token::from("tok_rotated");
        room.attach_participant(host.clone(), "host".to_string(), new_token.clone(), true)
            .await
            .unwrap();

        // when (操作):
        let stale = room.bind_connection(&host, &old_token, 4).await;
        let fresh = room.bind_connection(&host, &new_token, 4).await;

        // then (期待する結果):
        assert!(matches!(stale, Err(RoomError::InvalidToken)));
        assert!(fresh.is_ok());
    }

    #[tokio::test]
    async fn test_release_unbound_detaches_only_unconnected_participants() {
        // テスト項目: 接続していない参加者だけが期限切れで切り離される
        // given (前提条件):
        let (room, host, token) = create_room_with_host(ConflictPolicy::default()).await;
        let guest = UserId::from("user_guest");
        room.attach_participant(guest.clone(), "guest".to_string(), Token::from("tok_g"), false)
            .await
            .unwrap();
        let (_epoch, _host_rx) = room.bind_connection(&host, &token, 4).await.unwrap();

        // when (操作):
        let kept = room.release_unbound(Duration::from_secs(3600)).await;
        let released = room.release_unbound(Duration::ZERO).await;

        // then (期待する結果):
        assert!(kept.is_empty());
        assert_eq!(released, vec![guest]);
        assert_eq!(room.participant_count().await, 1);
    }

    #[tokio::test]
    async fn test_rotated_then_abandoned_participant_is_released() {
        // テスト項目: トークンをローテーションして再接続しない参加者も期限切れで切り離される
        // given (前提条件): 古い接続の切断処理はエポックが古いので何もしない
        let (room, host, token) = create_room_with_host(ConflictPolicy::default()).await;
        let (epoch, _old_rx) = room.bind_connection(&host, &token, 4).await.unwrap();
        room.attach_participant(host.clone(), "host".to_string(), Token::from("tok_new"), true)
            .await
            .unwrap();
        assert!(!room.release_connection(&host, epoch).await);

        // when (操作):
        let released = room.release_unbound(Duration::ZERO).await;

        // then (期待する結果):
        assert_eq!(released, vec![host]);
        assert_eq!(room.participant_count().await, 0);
        assert_eq!(room.state_snapshot().await.owner_id, None);
    }
}
