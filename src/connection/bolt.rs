//! Bolt connection: handshake, HELLO/LOGON and framed message I/O.

use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::net::TcpStream;

use super::handshake::{client_handshake, default_proposals};
use super::{AuthToken, Transport};
use crate::chunk::{ChunkReader, ChunkWriter};
use crate::error::BoltError;
use crate::message::decode::decode_server_message;
use crate::message::encode::encode_client_message;
use crate::message::{ClientMessage, ServerMessage};
use crate::packstream::{Dict, PackValue};

/// A framed Bolt connection over an async byte stream.
pub struct BoltConnection<S> {
    reader: ChunkReader<ReadHalf<S>>,
    writer: ChunkWriter<WriteHalf<S>>,
    version: (u8, u8),
    server_agent: Option<String>,
}

impl BoltConnection<TcpStream> {
    /// Connects over TCP and performs the handshake. The returned connection
    /// is ready for [`hello`](Self::hello).
    pub async fn connect(addr: SocketAddr, max_message_size: usize) -> Result<Self, BoltError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Self::handshake(stream, max_message_size).await
    }
}

impl<S> BoltConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Performs the client handshake on an already open stream.
    pub async fn handshake(mut stream: S, max_message_size: usize) -> Result<Self, BoltError> {
        let version = client_handshake(&mut stream, &default_proposals()).await?;
        tracing::debug!(major = version.0, minor = version.1, "negotiated protocol version");

        let (rh, wh) = tokio::io::split(stream);
        Ok(Self {
            reader: ChunkReader::with_limit(rh, max_message_size),
            writer: ChunkWriter::new(wh),
            version,
            server_agent: None,
        })
    }

    /// Server identification from the HELLO reply.
    pub fn server_agent(&self) -> Option<&str> {
        self.server_agent.as_deref()
    }

    /// Initializes the connection and authenticates.
    ///
    /// Before protocol 5.1 the credentials ride in HELLO; from 5.1 on they go
    /// in a separate LOGON.
    pub async fn hello(&mut self, user_agent: &str, auth: &AuthToken) -> Result<Dict, BoltError> {
        let mut extra = Dict::from([("user_agent".to_string(), PackValue::from(user_agent))]);
        if self.version >= (5, 3) {
            extra.insert(
                "bolt_agent".to_string(),
                PackValue::Dict(Dict::from([("product".to_string(), PackValue::from(user_agent))])),
            );
        }
        let separate_logon = self.version >= (5, 1);
        if !separate_logon {
            extra.extend(auth.to_dict());
        }

        let metadata = self.request(&ClientMessage::Hello { extra }).await?;
        self.server_agent = metadata
            .get("server")
            .and_then(PackValue::as_str)
            .map(String::from);

        if separate_logon {
            self.request(&ClientMessage::Logon { auth: auth.to_dict() }).await?;
        }
        tracing::debug!(
            server = self.server_agent.as_deref().unwrap_or("unknown"),
            scheme = auth.scheme(),
            "authenticated"
        );
        Ok(metadata)
    }

    /// Sends one handshake-phase message and expects SUCCESS.
    async fn request(&mut self, msg: &ClientMessage) -> Result<Dict, BoltError> {
        self.send(msg)?;
        self.flush().await?;
        match self.recv().await? {
            ServerMessage::Success { metadata } => Ok(metadata),
            ServerMessage::Failure { metadata } => Err(BoltError::Authentication(
                metadata
                    .get("message")
                    .and_then(PackValue::as_str)
                    .unwrap_or("authentication failed")
                    .to_string(),
            )),
            other => Err(BoltError::protocol(format!(
                "expected SUCCESS after {}, got {}",
                msg.name(),
                other.name()
            ))),
        }
    }
}

#[async_trait]
impl<S> Transport for BoltConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn version(&self) -> (u8, u8) {
        self.version
    }

    fn send(&mut self, msg: &ClientMessage) -> Result<(), BoltError> {
        let mut buf = BytesMut::new();
        encode_client_message(&mut buf, msg, self.version);
        self.writer.write_message(&buf);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), BoltError> {
        self.writer.flush().await
    }

    async fn recv(&mut self) -> Result<ServerMessage, BoltError> {
        let data = self.reader.read_message().await?;
        decode_server_message(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::DEFAULT_MAX_MESSAGE_SIZE;
    use crate::testing::Peer;
    use tokio::io::duplex;

    #[tokio::test]
    async fn hello_then_logon_on_five_four() {
        let (client, server) = duplex(4096);
        let peer = tokio::spawn(async move {
            let mut peer = Peer::accept(server, (5, 4)).await;
            let hello = peer.expect().await;
            peer.success(&[("server", PackValue::from("Neo4j/5.20.0"))]).await;
            let logon = peer.expect().await;
            peer.success(&[]).await;
            (hello, logon)
        });

        let mut conn = BoltConnection::handshake(client, DEFAULT_MAX_MESSAGE_SIZE).await.unwrap();
        assert_eq!(conn.version(), (5, 4));
        conn.hello("boltq-test", &AuthToken::basic("neo4j", "pw")).await.unwrap();
        assert_eq!(conn.server_agent(), Some("Neo4j/5.20.0"));

        let (hello, logon) = peer.await.unwrap();
        let ClientMessage::Hello { extra } = hello else {
            panic!("expected HELLO, got {hello:?}");
        };
        assert_eq!(extra["user_agent"].as_str(), Some("boltq-test"));
        assert!(extra.contains_key("bolt_agent"));
        assert!(!extra.contains_key("credentials"));
        let ClientMessage::Logon { auth } = logon else {
            panic!("expected LOGON, got {logon:?}");
        };
        assert_eq!(auth["principal"].as_str(), Some("neo4j"));
    }

    #[tokio::test]
    async fn credentials_ride_in_hello_before_five_one() {
        let (client, server) = duplex(4096);
        let peer = tokio::spawn(async move {
            let mut peer = Peer::accept(server, (4, 4)).await;
            let hello = peer.expect().await;
            peer.success(&[]).await;
            hello
        });

        let mut conn = BoltConnection::handshake(client, DEFAULT_MAX_MESSAGE_SIZE).await.unwrap();
        conn.hello("boltq-test", &AuthToken::basic("memgraph", "pw")).await.unwrap();

        let ClientMessage::Hello { extra } = peer.await.unwrap() else {
            panic!("expected HELLO");
        };
        assert_eq!(extra["scheme"].as_str(), Some("basic"));
        assert_eq!(extra["credentials"].as_str(), Some("pw"));
        assert!(!extra.contains_key("bolt_agent"));
    }

    #[tokio::test]
    async fn rejected_credentials_are_an_authentication_error() {
        let (client, server) = duplex(4096);
        tokio::spawn(async move {
            let mut peer = Peer::accept(server, (5, 4)).await;
            peer.expect().await;
            peer.success(&[]).await;
            peer.expect().await;
            peer.failure("Neo.ClientError.Security.Unauthorized", "bad credentials").await;
        });

        let mut conn = BoltConnection::handshake(client, DEFAULT_MAX_MESSAGE_SIZE).await.unwrap();
        let err = conn.hello("boltq-test", &AuthToken::basic("neo4j", "nope")).await.unwrap_err();
        assert!(matches!(err, BoltError::Authentication(ref m) if m == "bad credentials"));
        assert!(err.is_fatal());
    }
}
