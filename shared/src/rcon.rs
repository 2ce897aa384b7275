//! Remote console protocol (TCP) packet framing
//!
//! ```text
//! size(i32) | request id(i32) | type(i32) | body | 00 | 00
//! ```
//!
//! `size` counts every byte after itself, so the smallest packet (empty body) has size 10
//! and occupies 14 bytes on the wire.

use crate::wire::ByteReader;
use crate::WireError;
use bytes::BufMut;

pub const SERVERDATA_AUTH: i32 = 3;
pub const SERVERDATA_EXECCOMMAND: i32 = 2;
pub const SERVERDATA_AUTH_RESPONSE: i32 = 2;
pub const SERVERDATA_RESPONSE_VALUE: i32 = 0;

/// Request id the server puts in an auth response when the password was wrong
pub const AUTH_FAILED_ID: i32 = -1;

/// Bytes following the size field besides the body: id, type and two terminators
const FIXED_FIELDS: usize = 10;

/// Wire length of a packet with an empty body, e.g. an auth response
pub const EMPTY_PACKET_LEN: usize = 4 + FIXED_FIELDS;

/// A single console packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolePacket {
    pub request_id: i32,
    pub kind: i32,
    pub body: String,
}

impl ConsolePacket {
    pub fn new(request_id: i32, kind: i32, body: impl Into<String>) -> Self {
        Self {
            request_id,
            kind,
            body: body.into(),
        }
    }

    pub fn auth(request_id: i32, password: &str) -> Self {
        Self::new(request_id, SERVERDATA_AUTH, password)
    }

    pub fn exec(request_id: i32, command: &str) -> Self {
        Self::new(request_id, SERVERDATA_EXECCOMMAND, command)
    }

    /// Serializes the packet into its wire form
    pub fn encode(&self) -> Vec<u8> {
        let body = self.body.as_bytes();
        let size = (FIXED_FIELDS + body.len()) as i32;

        let mut buf = Vec::with_capacity(4 + FIXED_FIELDS + body.len());
        buf.put_i32_le(size);
        buf.put_i32_le(self.request_id);
        buf.put_i32_le(self.kind);
        buf.put_slice(body);
        buf.put_u16(0);
        buf
    }

    /// Parses one packet from the start of `buf`
    ///
    /// Returns the packet and the number of bytes it occupied.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), WireError> {
        let mut reader = ByteReader::new(buf);
        let size = reader.read_i32_le()?;
        if size < FIXED_FIELDS as i32 {
            return Err(WireError::BadPacketSize(size));
        }
        let body_len = size as usize - FIXED_FIELDS;

        let request_id = reader.read_i32_le()?;
        let kind = reader.read_i32_le()?;
        if reader.remaining() < body_len + 2 {
            return Err(WireError::Truncated {
                offset: reader.position(),
                needed: body_len + 2,
                available: reader.remaining(),
            });
        }
        let start = reader.position();
        let body = String::from_utf8_lossy(&buf[start..start + body_len]).into_owned();

        Ok((
            Self {
                request_id,
                kind,
                body,
            },
            4 + size as usize,
        ))
    }

    /// True when this is an auth response accepting the request `request_id`
    pub fn accepts_auth(&self, request_id: i32) -> bool {
        self.kind == SERVERDATA_AUTH_RESPONSE && self.request_id == request_id
    }
}
