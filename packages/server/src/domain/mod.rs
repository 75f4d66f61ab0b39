//! Room synchronization core.
//!
//! Rooms, participants and their mailboxes, the registry of rooms and the
//! per-connection send discipline. Nothing here knows about HTTP, JSON or
//! WebSocket; frames arrive already serialized and leave through the
//! [`Transport`] seam.

pub mod error;
pub mod mailbox;
pub mod manager;
pub mod outbound;
pub mod participant;
pub mod room;
pub mod room_state;
pub mod value_object;

pub use error::{RoomError, TransportError, ValueObjectError};
pub use mailbox::{Delivery, Frame, Mailbox, MailboxReceiver, mailbox};
pub use manager::{RoomManager, Session, SweepReport};
pub use outbound::{BatchConfig, Batcher, SendLoop, SendLoopExit, Transport};
pub use participant::{Participant, ParticipantInfo};
pub use room::{BroadcastReport, Room};
pub use room_state::{ConflictPolicy, ControlMessage, RoomState};
pub use value_object::{DisplayName, RoomId, Token, UserId, VideoUrl};
