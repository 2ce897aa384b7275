//! Server query protocol (UDP)
//!
//! Requests are single datagrams starting with the `FF FF FF FF` header followed by an
//! opcode. Servers may answer a request with a challenge (`0x41`) carrying a 4-byte token
//! that has to be echoed back in a repeated request before the real reply is sent.
//!
//! ```text
//! player request:  FF FF FF FF | 55 | challenge(4)
//! player reply:    FF FF FF FF | 44 | count(1) | { index(1) name\0 score(i32) time(f32) }*
//! info request:    FF FF FF FF | 54 | "Source Engine Query\0" | challenge(4)
//! info reply:      FF FF FF FF | 49 | protocol(1) | name\0 map\0 folder\0 game\0
//!                  | app id(2) | players(1) | max players(1) | bots(1) | ...
//! ```

use crate::wire::ByteReader;
use crate::WireError;
use bytes::BufMut;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub const HEADER: u32 = 0xFFFF_FFFF;
pub const SPLIT_HEADER: u32 = 0xFFFF_FFFE;

pub const A2S_PLAYER: u8 = 0x55;
pub const A2S_INFO: u8 = 0x54;
pub const S2C_CHALLENGE: u8 = 0x41;
pub const S2A_PLAYER: u8 = 0x44;
pub const S2A_INFO: u8 = 0x49;

/// Placeholder sent until the server hands out a real challenge
pub const NO_CHALLENGE: [u8; 4] = [0xFF; 4];

/// Largest datagram a reply is expected to fit in
pub const MAX_PACKET_SIZE: usize = 1500;

const INFO_PAYLOAD: &[u8] = b"Source Engine Query\0";

/// Connected players by display name with their session duration
///
/// Ordered so that join/leave events come out in a stable order.
pub type RosterSnapshot = BTreeMap<String, Duration>;

/// Server metadata from an info reply
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub map: String,
    pub players: u8,
    pub max_players: u8,
    pub bots: u8,
}

/// A reply is either the requested data or a challenge to repeat the request with
#[derive(Debug, Clone, PartialEq)]
pub enum Reply<T> {
    Challenge([u8; 4]),
    Data(T),
}

/// Builds a player-list request carrying `challenge`
pub fn player_request(challenge: [u8; 4]) -> [u8; 9] {
    let mut request = [0u8; 9];
    request[..4].copy_from_slice(&HEADER.to_le_bytes());
    request[4] = A2S_PLAYER;
    request[5..].copy_from_slice(&challenge);
    request
}

/// Builds an info request carrying `challenge`
pub fn info_request(challenge: [u8; 4]) -> Vec<u8> {
    let mut request = Vec::with_capacity(5 + INFO_PAYLOAD.len() + 4);
    request.put_u32_le(HEADER);
    request.put_u8(A2S_INFO);
    request.put_slice(INFO_PAYLOAD);
    request.put_slice(&challenge);
    request
}

/// Reads the 4-byte header and returns the opcode that follows it
fn read_opcode(reader: &mut ByteReader<'_>) -> Result<u8, WireError> {
    match reader.read_u32_le()? {
        HEADER => reader.read_u8(),
        SPLIT_HEADER => Err(WireError::SplitResponse),
        other => Err(WireError::BadHeader(other)),
    }
}

/// Converts the float seconds of a player record, clamping garbage to zero
pub fn seconds_to_duration(seconds: f32) -> Duration {
    Duration::try_from_secs_f32(seconds).unwrap_or(Duration::ZERO)
}

/// Parses a reply to a player-list request
///
/// Players with blank names (still connecting) are left out of the snapshot.
/// Any truncated record fails the whole reply; no partial roster is returned.
pub fn parse_player_reply(buf: &[u8]) -> Result<Reply<RosterSnapshot>, WireError> {
    let mut reader = ByteReader::new(buf);
    match read_opcode(&mut reader)? {
        S2C_CHALLENGE => Ok(Reply::Challenge(reader.read_bytes()?)),
        S2A_PLAYER => parse_players(&mut reader).map(Reply::Data),
        found => Err(WireError::UnexpectedOpcode {
            expected: S2A_PLAYER,
            found,
        }),
    }
}

fn parse_players(reader: &mut ByteReader<'_>) -> Result<RosterSnapshot, WireError> {
    let count = reader.read_u8()?;
    let mut roster = RosterSnapshot::new();

    for _ in 0..count {
        let _index = reader.read_u8()?;
        let name = reader.read_cstring()?;
        let _score = reader.read_i32_le()?;
        let seconds = reader.read_f32_le()?;

        if name.trim().is_empty() {
            continue;
        }
        roster.insert(name, seconds_to_duration(seconds));
    }

    Ok(roster)
}

/// Parses a reply to an info request
pub fn parse_info_reply(buf: &[u8]) -> Result<Reply<ServerInfo>, WireError> {
    let mut reader = ByteReader::new(buf);
    match read_opcode(&mut reader)? {
        S2C_CHALLENGE => Ok(Reply::Challenge(reader.read_bytes()?)),
        S2A_INFO => parse_info(&mut reader).map(Reply::Data),
        found => Err(WireError::UnexpectedOpcode {
            expected: S2A_INFO,
            found,
        }),
    }
}

fn parse_info(reader: &mut ByteReader<'_>) -> Result<ServerInfo, WireError> {
    let _protocol = reader.read_u8()?;
    let name = reader.read_cstring()?;
    let map = reader.read_cstring()?;
    let _folder = reader.read_cstring()?;
    let _game = reader.read_cstring()?;
    reader.skip(2)?; // app id

    Ok(ServerInfo {
        name,
        map,
        players: reader.read_u8()?,
        max_players: reader.read_u8()?,
        bots: reader.read_u8()?,
    })
}
