//! Bounded per-participant outbound queue.
//!
//! Producers never wait: a full queue drops the frame. This keeps a stalled
//! receiver from holding up a room broadcast.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};

/// A serialized outbound message, shared between all recipients of a broadcast.
pub type Frame = Arc<str>;

/// Result of offering a frame to a mailbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Enqueued,
    /// The queue was full and the frame was discarded.
    Dropped,
    /// The consumer is gone.
    Closed,
    /// The participant has no connection bound.
    Unbound,
}

/// Producer side of a mailbox
#[derive(Debug, Clone)]
pub struct Mailbox {
    sender: mpsc::Sender<Frame>,
}

/// Consumer side of a mailbox, owned by the participant's send loop
#[derive(Debug)]
pub struct MailboxReceiver {
    receiver: mpsc::Receiver<Frame>,
}

/// Create a mailbox holding at most `capacity` frames (minimum 1).
pub fn mailbox(capacity: usize) -> (Mailbox, MailboxReceiver) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (Mailbox { sender }, MailboxReceiver { receiver })
}

impl Mailbox {
    /// Non-blocking enqueue.
    pub fn offer(&self, frame: Frame) -> Delivery {
        match self.sender.try_send(frame) {
            Ok(()) => Delivery::Enqueued,
            Err(TrySendError::Full(_)) => Delivery::Dropped,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}

impl MailboxReceiver {
    /// Next frame in enqueue order; `None` once every producer is gone and
    /// the queue is drained.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.receiver.recv().await
    }

    /// Next frame if one is already queued.
    pub fn try_recv(&mut self) -> Option<Frame> {
        self.receiver.try_recv().ok()
    }
}
