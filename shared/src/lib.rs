//! # Shared Protocol Library
//!
//! Byte-level building blocks for the two wire protocols spoken to a game server:
//!
//! - [`wire`]: bounds-checked cursor over a received datagram (C strings, little-endian integers)
//! - [`query`]: UDP server-query requests and the player-list / server-info reply parsers
//! - [`rcon`]: TCP remote-console packet framing
//!
//! Nothing in this crate performs I/O. Every parser works on a borrowed byte slice and
//! reports malformed input through [`WireError`] instead of panicking, so a truncated or
//! hostile datagram can never take the monitor down.

use thiserror::Error;

pub mod query;
pub mod rcon;
pub mod wire;

pub use query::{RosterSnapshot, ServerInfo};
pub use rcon::ConsolePacket;
pub use wire::{read_cstring, ByteReader};

/// Reasons a received buffer could not be decoded
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("offset {offset} is outside the {len}-byte buffer")]
    OutOfBounds { offset: usize, len: usize },

    #[error("string starting at offset {offset} has no terminator")]
    MissingTerminator { offset: usize },

    #[error("needed {needed} bytes at offset {offset}, only {available} left")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("unexpected header {0:#010x}")]
    BadHeader(u32),

    #[error("split responses are not supported")]
    SplitResponse,

    #[error("unexpected opcode {found:#04x}, expected {expected:#04x}")]
    UnexpectedOpcode { expected: u8, found: u8 },

    #[error("declared packet size {0} is invalid")]
    BadPacketSize(i32),
}
