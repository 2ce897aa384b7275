//! UDP server-query client
//!
//! One call to [`QueryClient::query_server`] opens a fresh socket, asks for the player
//! list (answering a challenge if the server hands one out), then asks for the server
//! info on a best-effort basis. The socket is dropped when the call returns, whichever
//! way it returns.

use crate::error::QueryError;
use log::debug;
use shared::query::{
    self, Reply, MAX_PACKET_SIZE, NO_CHALLENGE, S2A_INFO, S2A_PLAYER, S2C_CHALLENGE,
};
use shared::{RosterSnapshot, ServerInfo, WireError};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::timeout;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Queries a single game server
#[derive(Debug, Clone)]
pub struct QueryClient {
    addr: String,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl QueryClient {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            addr: format!("{}:{}", host, port),
            connect_timeout: CONNECT_TIMEOUT,
            read_timeout: READ_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Fetches the current roster and, if the server answers, its info
    ///
    /// A failed info request does not fail the call: the roster is still returned,
    /// with `None` in place of the info.
    pub async fn query_server(&self) -> Result<(RosterSnapshot, Option<ServerInfo>), QueryError> {
        let socket = timeout(self.connect_timeout, self.connect())
            .await
            .map_err(|_| QueryError::Timeout("connecting"))??;

        let roster = self
            .request(
                &socket,
                |challenge| query::player_request(challenge).to_vec(),
                query::parse_player_reply,
                S2A_PLAYER,
            )
            .await?;

        let info = match self
            .request(&socket, query::info_request, query::parse_info_reply, S2A_INFO)
            .await
        {
            Ok(info) => Some(info),
            Err(e) => {
                debug!("Server info from {} unavailable: {}", self.addr, e);
                None
            }
        };

        Ok((roster, info))
    }

    async fn connect(&self) -> Result<UdpSocket, QueryError> {
        let target = lookup_host(&self.addr)
            .await
            .map_err(|_| QueryError::Resolve(self.addr.clone()))?
            .next()
            .ok_or_else(|| QueryError::Resolve(self.addr.clone()))?;

        let local: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(local).await?;
        socket.connect(target).await?;
        Ok(socket)
    }

    /// Sends `request` and waits for one datagram within the read timeout
    async fn exchange(
        &self,
        socket: &UdpSocket,
        request: &[u8],
        buf: &mut [u8],
    ) -> Result<usize, QueryError> {
        socket.send(request).await?;
        let len = timeout(self.read_timeout, socket.recv(buf))
            .await
            .map_err(|_| QueryError::Timeout("waiting for a reply"))??;
        Ok(len)
    }

    /// Runs one request, repeating it once with the server's challenge if asked to
    async fn request<T>(
        &self,
        socket: &UdpSocket,
        build: impl Fn([u8; 4]) -> Vec<u8>,
        parse: fn(&[u8]) -> Result<Reply<T>, WireError>,
        expected: u8,
    ) -> Result<T, QueryError> {
        let mut buf = [0u8; MAX_PACKET_SIZE];

        let len = self.exchange(socket, &build(NO_CHALLENGE), &mut buf).await?;
        let challenge = match parse(&buf[..len])? {
            Reply::Data(data) => return Ok(data),
            Reply::Challenge(challenge) => challenge,
        };

        let len = self.exchange(socket, &build(challenge), &mut buf).await?;
        match parse(&buf[..len])? {
            Reply::Data(data) => Ok(data),
            Reply::Challenge(_) => Err(WireError::UnexpectedOpcode {
                expected,
                found: S2C_CHALLENGE,
            }
            .into()),
        }
    }
}
