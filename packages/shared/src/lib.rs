//! Utilities shared by the Lockstep server and client.

pub mod logger;
pub mod time;
