//! Per-participant send discipline.
//!
//! One [`SendLoop`] per connection is the only writer to that connection's
//! [`Transport`]. It drains the participant's mailbox in enqueue order and
//! coalesces consecutive frames with a [`Batcher`]: a batch is written when
//! it reaches `max_batch` frames or when no new frame arrives within
//! `flush_interval`, whichever comes first.

use std::time::Duration;

use async_trait::async_trait;

use super::{
    error::TransportError,
    mailbox::{Frame, MailboxReceiver},
};

/// Write side of one physical connection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send {
    /// Write `frames` in order as separate messages.
    async fn write_batch(&mut self, frames: Vec<Frame>) -> Result<(), TransportError>;

    /// Close the connection. Errors are ignored; the peer may already be gone.
    async fn close(&mut self);
}

/// Coalescing window of a send loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    pub max_batch: usize,
    pub flush_interval: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch: 5,
            flush_interval: Duration::from_millis(5),
        }
    }
}

/// Accumulates frames until full or flushed. Never reorders.
#[derive(Debug)]
pub struct Batcher {
    pending: Vec<Frame>,
    max_batch: usize,
}

impl Batcher {
    pub fn new(max_batch: usize) -> Self {
        let max_batch = max_batch.max(1);
        Self {
            pending: Vec::with_capacity(max_batch),
            max_batch,
        }
    }

    /// Add a frame; returns the batch if it is now full.
    pub fn push(&mut self, frame: Frame) -> Option<Vec<Frame>> {
        self.pending.push(frame);
        if self.pending.len() >= self.max_batch {
            self.take()
        } else {
            None
        }
    }

    /// Take whatever is pending.
    pub fn take(&mut self) -> Option<Vec<Frame>> {
        if self.pending.is_empty() {
            return None;
        }
        Some(std::mem::replace(
            &mut self.pending,
            Vec::with_capacity(self.max_batch),
        ))
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Why a send loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendLoopExit {
    /// Every producer dropped the mailbox (detach or rebind).
    MailboxClosed,
    WriteFailed(TransportError),
}

/// Drains one mailbox into one transport.
pub struct SendLoop<T: Transport> {
    mailbox: MailboxReceiver,
    transport: T,
    batcher: Batcher,
    flush_interval: Duration,
}

impl<T: Transport> SendLoop<T> {
    pub fn new(mailbox: MailboxReceiver, transport: T, config: BatchConfig) -> Self {
        Self {
            mailbox,
            transport,
            batcher: Batcher::new(config.max_batch),
            flush_interval: config.flush_interval,
        }
    }

    /// Run until the mailbox closes or a write fails, then close the transport.
    pub async fn run(mut self) -> SendLoopExit {
        let exit = loop {
            let flush_timer = tokio::time::sleep(self.flush_interval);
            tokio::select! {
                biased;
                frame = self.mailbox.recv() => match frame {
                    Some(frame) => {
                        if let Some(batch) = self.batcher.push(frame)
                            && let Err(e) = self.transport.write_batch(batch).await
                        {
                            break SendLoopExit::WriteFailed(e);
                        }
                    }
                    None => {
                        // Flush what was already accepted before releasing the handle.
                        if let Some(batch) = self.batcher.take()
                            && let Err(e) = self.transport.write_batch(batch).await
                        {
                            break SendLoopExit::WriteFailed(e);
                        }
                        break SendLoopExit::MailboxClosed;
                    }
                },
                () = flush_timer, if !self.batcher.is_empty() => {
                    if let Some(batch) = self.batcher.take()
                        && let Err(e) = self.transport.write_batch(batch).await
                    {
                        break SendLoopExit::WriteFailed(e);
                    }
                }
            }
        };

        self.transport.close().await;
        tracing::debug!("Send loop stopped: {:?}", exit);
        exit
    }
}
