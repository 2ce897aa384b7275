//! TCP remote-console client
//!
//! Every command uses its own connection: connect, authenticate with the shared
//! password, send the command, close. Nothing is kept between commands.

use crate::error::ConsoleError;
use log::debug;
use rand::Rng;
use shared::rcon::EMPTY_PACKET_LEN;
use shared::{ByteReader, ConsolePacket};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
pub const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Below this many bytes the auth response is read a second time
const MIN_FIRST_READ: usize = 10;

/// Fresh correlation id, positive so it can't be confused with a rejection
pub fn next_request_id() -> i32 {
    rand::thread_rng().gen_range(1..=i32::MAX)
}

/// Sends commands to a server's remote console
#[derive(Debug, Clone)]
pub struct ConsoleClient {
    addr: String,
    password: String,
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl ConsoleClient {
    pub fn new(host: &str, port: u16, password: &str) -> Self {
        Self {
            addr: format!("{}:{}", host, port),
            password: password.to_string(),
            connect_timeout: CONNECT_TIMEOUT,
            io_timeout: IO_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, connect: Duration, io: Duration) -> Self {
        self.connect_timeout = connect;
        self.io_timeout = io;
        self
    }

    /// Broadcasts `text` to everyone on the server
    pub async fn say(&self, text: &str) -> Result<(), ConsoleError> {
        self.exec(&format!("say {}", text)).await
    }

    /// Authenticates and runs `command`
    ///
    /// The command's own response is not waited for.
    pub async fn exec(&self, command: &str) -> Result<(), ConsoleError> {
        let mut stream = timeout(self.connect_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| ConsoleError::Timeout("connecting"))??;

        let request_id = next_request_id();
        self.write_packet(&mut stream, &ConsolePacket::auth(request_id, &self.password))
            .await?;

        let response = self.read_auth_response(&mut stream).await?;
        if !response.accepts_auth(request_id) {
            debug!(
                "Auth response id {} type {} for request {}",
                response.request_id, response.kind, request_id
            );
            return Err(ConsoleError::AuthRejected);
        }

        self.write_packet(&mut stream, &ConsolePacket::exec(next_request_id(), command))
            .await?;
        if let Err(e) = stream.shutdown().await {
            debug!("Closing console connection to {}: {}", self.addr, e);
        }
        Ok(())
    }

    async fn write_packet(
        &self,
        stream: &mut TcpStream,
        packet: &ConsolePacket,
    ) -> Result<(), ConsoleError> {
        timeout(self.io_timeout, stream.write_all(&packet.encode()))
            .await
            .map_err(|_| ConsoleError::Timeout("sending"))??;
        Ok(())
    }

    async fn read_some(
        &self,
        stream: &mut TcpStream,
        buf: &mut [u8],
    ) -> Result<usize, ConsoleError> {
        let n = timeout(self.io_timeout, stream.read(buf))
            .await
            .map_err(|_| ConsoleError::Timeout("waiting for auth response"))??;
        Ok(n)
    }

    /// Reads the 14-byte auth response, allowing it to arrive in two pieces
    async fn read_auth_response(
        &self,
        stream: &mut TcpStream,
    ) -> Result<ConsolePacket, ConsoleError> {
        let mut buf = [0u8; EMPTY_PACKET_LEN];
        let mut size = self.read_some(stream, &mut buf).await?;
        if size < MIN_FIRST_READ {
            size += self.read_some(stream, &mut buf[size..]).await?;
        }
        if size != EMPTY_PACKET_LEN {
            return Err(ConsoleError::ShortResponse(size));
        }

        // Only id and type matter; the size field may announce a body we never read
        let mut reader = ByteReader::at(&buf, 4)?;
        let request_id = reader.read_i32_le()?;
        let kind = reader.read_i32_le()?;
        Ok(ConsolePacket::new(request_id, kind, ""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::rcon::{
        AUTH_FAILED_ID, SERVERDATA_AUTH, SERVERDATA_AUTH_RESPONSE, SERVERDATA_EXECCOMMAND,
        SERVERDATA_RESPONSE_VALUE,
    };
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use tokio_test::{assert_err, assert_ok};

    #[derive(Clone, Copy)]
    enum Answer {
        Accept,
        AcceptSplit,
        Truncated,
        Reject,
        WrongType,
        Hangup,
    }

    async fn read_packet(stream: &mut TcpStream) -> Option<ConsolePacket> {
        let mut size = [0u8; 4];
        stream.read_exact(&mut size).await.ok()?;
        let mut rest = vec![0u8; i32::from_le_bytes(size) as usize];
        stream.read_exact(&mut rest).await.ok()?;

        let mut whole = size.to_vec();
        whole.extend(rest);
        ConsolePacket::decode(&whole).ok().map(|(packet, _)| packet)
    }

    /// Accepts one connection, answers the auth request, returns what the client sent
    async fn fake_console(
        password: &'static str,
        answer: Answer,
    ) -> (u16, JoinHandle<Vec<ConsolePacket>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream.set_nodelay(true).unwrap();
            let mut received = Vec::new();

            let auth = read_packet(&mut stream).await.unwrap();
            let id = if auth.body == password { auth.request_id } else { AUTH_FAILED_ID };
            received.push(auth);

            let reply = match answer {
                Answer::Accept | Answer::AcceptSplit | Answer::Truncated => {
                    ConsolePacket::new(id, SERVERDATA_AUTH_RESPONSE, "")
                }
                Answer::Reject => {
                    ConsolePacket::new(AUTH_FAILED_ID, SERVERDATA_AUTH_RESPONSE, "")
                }
                Answer::WrongType => ConsolePacket::new(id, SERVERDATA_RESPONSE_VALUE, ""),
                Answer::Hangup => return received,
            };
            let bytes = reply.encode();

            match answer {
                Answer::AcceptSplit => {
                    stream.write_all(&bytes[..6]).await.unwrap();
                    stream.flush().await.unwrap();
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    stream.write_all(&bytes[6..]).await.unwrap();
                }
                Answer::Truncated => {
                    // 12 of 14 bytes, rest never comes
                    stream.write_all(&bytes[..12]).await.unwrap();
                    stream.flush().await.unwrap();
                }
                _ => stream.write_all(&bytes).await.unwrap(),
            }

            if let Some(command) = read_packet(&mut stream).await {
                received.push(command);
            }
            received
        });

        (port, handle)
    }

    fn client(port: u16, password: &str) -> ConsoleClient {
        ConsoleClient::new("127.0.0.1", port, password)
            .with_timeouts(Duration::from_secs(1), Duration::from_millis(500))
    }

    #[tokio::test]
    async fn test_say_authenticates_then_sends_command() {
        let (port, server) = fake_console("secret", Answer::Accept).await;

        assert_ok!(client(port, "secret").say("Welcome, Alice!").await);

        let received = server.await.unwrap();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].kind, SERVERDATA_AUTH);
        assert_eq!(received[0].body, "secret");
        assert!(received[0].request_id > 0);
        assert_eq!(received[1].kind, SERVERDATA_EXECCOMMAND);
        assert_eq!(received[1].body, "say Welcome, Alice!");
    }

    #[tokio::test]
    async fn test_split_auth_response() {
        let (port, server) = fake_console("secret", Answer::AcceptSplit).await;

        assert_ok!(client(port, "secret").exec("status").await);
        assert_eq!(server.await.unwrap()[1].body, "status");
    }

    #[tokio::test]
    async fn test_wrong_password_is_rejected() {
        let (port, server) = fake_console("secret", Answer::Accept).await;

        let err = assert_err!(client(port, "guess").say("hi").await);
        assert!(matches!(err, ConsoleError::AuthRejected));

        // No command follows a rejected login
        assert_eq!(server.await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejection_and_wrong_type() {
        let (port, _server) = fake_console("secret", Answer::Reject).await;
        let err = assert_err!(client(port, "secret").say("hi").await);
        assert!(matches!(err, ConsoleError::AuthRejected));

        let (port, _server) = fake_console("secret", Answer::WrongType).await;
        let err = assert_err!(client(port, "secret").say("hi").await);
        assert!(matches!(err, ConsoleError::AuthRejected));
    }

    #[tokio::test]
    async fn test_hangup_is_short_response() {
        let (port, _server) = fake_console("secret", Answer::Hangup).await;

        let err = assert_err!(client(port, "secret").say("hi").await);
        assert!(matches!(err, ConsoleError::ShortResponse(0)));
    }

    #[tokio::test]
    async fn test_long_first_read_is_not_continued() {
        let (port, server) = fake_console("secret", Answer::Truncated).await;

        let err = assert_err!(client(port, "secret").say("hi").await);
        assert!(matches!(err, ConsoleError::ShortResponse(12)));

        // Only the login reached the console
        assert_eq!(server.await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = assert_err!(client(port, "secret").say("hi").await);
        assert!(matches!(err, ConsoleError::Io(_)));
    }

    #[test]
    fn test_request_ids_are_positive() {
        for _ in 0..1000 {
            assert!(next_request_id() > 0);
        }
    }
}
