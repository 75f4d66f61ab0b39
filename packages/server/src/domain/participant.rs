//! Participant entity.

use std::time::Duration;

use tokio::time::Instant;

use super::{
    mailbox::{Delivery, Frame, Mailbox, MailboxReceiver, mailbox},
    value_object::{Token, UserId},
};

/// A member of a room.
///
/// Lives inside its room's protected state; callers outside the room only
/// ever see a [`ParticipantInfo`] copy.
#[derive(Debug)]
pub struct Participant {
    id: UserId,
    name: String,
    token: Token,
    is_host: bool,
    mailbox: Option<Mailbox>,
    /// Incremented on every bind and unbind so a superseded connection can
    /// tell it no longer owns this participant.
    epoch: u64,
    /// When the participant last had no connection; `None` while bound.
    unbound_since: Option<Instant>,
}

/// Read-only copy of a participant's identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantInfo {
    pub id: UserId,
    pub name: String,
    pub is_host: bool,
}

impl Participant {
    pub fn new(id: UserId, name: String, token: Token, is_host: bool) -> Self {
        Self {
            id,
            name,
            token,
            is_host,
            mailbox: None,
            epoch: 0,
            unbound_since: Some(Instant::now()),
        }
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn is_host(&self) -> bool {
        self.is_host
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_bound(&self) -> bool {
        self.mailbox.is_some()
    }

    /// How long this participant has been without a connection at `now`.
    pub fn unbound_for(&self, now: Instant) -> Option<Duration> {
        self.unbound_since
            .map(|since| now.saturating_duration_since(since))
    }

    pub fn info(&self) -> ParticipantInfo {
        ParticipantInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            is_host: self.is_host,
        }
    }

    /// Swap in a new token, returning the old one.
    pub fn rotate_token(&mut self, token: Token) -> Token {
        std::mem::replace(&mut self.token, token)
    }

    /// Give this participant a fresh mailbox for a new connection.
    ///
    /// The previous mailbox is dropped first, which ends the old send loop.
    pub fn bind(&mut self, capacity: usize) -> (u64, MailboxReceiver) {
        self.mailbox = None;
        let (mailbox, receiver) = mailbox(capacity);
        self.mailbox = Some(mailbox);
        self.unbound_since = None;
        self.epoch += 1;
        (self.epoch, receiver)
    }

    /// Drop the current mailbox without binding a new one.
    ///
    /// Restarts the unbound clock, so a freshly rotated token gets a full
    /// window to connect.
    pub fn unbind(&mut self) {
        if self.mailbox.take().is_some() {
            self.epoch += 1;
        }
        self.unbound_since = Some(Instant::now());
    }

    pub fn mailbox(&self) -> Option<&Mailbox> {
        self.mailbox.as_ref()
    }

    /// Non-blocking enqueue of an already serialized frame.
    pub fn send(&self, frame: Frame) -> Delivery {
        match &self.mailbox {
            Some(mailbox) => mailbox.offer(frame),
            None => Delivery::Unbound,
        }
    }
}
