//! Test doubles: an in-memory scripted transport and a duplex peer that
//! speaks the real handshake and chunked codec.

use std::collections::VecDeque;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

use crate::chunk::{ChunkReader, ChunkWriter};
use crate::connection::Transport;
use crate::error::BoltError;
use crate::message::decode::decode_client_message;
use crate::message::encode::encode_server_message;
use crate::message::{ClientMessage, ServerMessage};
use crate::packstream::{Dict, PackValue};

pub(crate) enum Step {
    Reply(ServerMessage),
    /// Never answers; used to trigger read timeouts.
    Stall,
    /// Connection drops.
    Drop,
}

/// Replays canned server messages and records what the client wrote.
pub(crate) struct ScriptedTransport {
    version: (u8, u8),
    script: VecDeque<Step>,
    sent: Vec<ClientMessage>,
    flushed: usize,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = ServerMessage>) -> Self {
        Self {
            version: (5, 4),
            script: replies.into_iter().map(Step::Reply).collect(),
            sent: Vec::new(),
            flushed: 0,
        }
    }

    pub fn with_version(mut self, version: (u8, u8)) -> Self {
        self.version = version;
        self
    }

    pub fn push(&mut self, step: Step) {
        self.script.push_back(step);
    }

    pub fn reply(&mut self, msg: ServerMessage) {
        self.push(Step::Reply(msg));
    }

    /// Messages that reached the server, in order.
    pub fn written(&self) -> &[ClientMessage] {
        &self.sent[..self.flushed]
    }

    /// Names of the written messages, e.g. `["RUN", "PULL"]`.
    pub fn written_names(&self) -> Vec<&'static str> {
        self.written().iter().map(ClientMessage::name).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn version(&self) -> (u8, u8) {
        self.version
    }

    fn send(&mut self, msg: &ClientMessage) -> Result<(), BoltError> {
        self.sent.push(msg.clone());
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), BoltError> {
        self.flushed = self.sent.len();
        Ok(())
    }

    async fn recv(&mut self) -> Result<ServerMessage, BoltError> {
        match self.script.pop_front() {
            Some(Step::Reply(msg)) => Ok(msg),
            Some(Step::Stall) => std::future::pending().await,
            Some(Step::Drop) => Err(std::io::Error::from(std::io::ErrorKind::ConnectionReset).into()),
            None => Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into()),
        }
    }
}

// -- Canned server messages --

pub(crate) fn success(entries: &[(&str, PackValue)]) -> ServerMessage {
    ServerMessage::Success {
        metadata: entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    }
}

/// RUN acknowledgement announcing the result columns.
pub(crate) fn fields(names: &[&str]) -> ServerMessage {
    success(&[
        (
            "fields",
            PackValue::List(names.iter().map(|n| PackValue::from(*n)).collect()),
        ),
        ("t_first", PackValue::Integer(1)),
    ])
}

pub(crate) fn record(values: Vec<PackValue>) -> ServerMessage {
    ServerMessage::Record { data: values }
}

pub(crate) fn failure(code: &str, message: &str) -> ServerMessage {
    ServerMessage::Failure {
        metadata: Dict::from([
            ("code".to_string(), PackValue::from(code)),
            ("message".to_string(), PackValue::from(message)),
        ]),
    }
}

/// Server side of a duplex pipe, for end-to-end tests.
pub(crate) struct Peer<S> {
    reader: ChunkReader<ReadHalf<S>>,
    writer: ChunkWriter<WriteHalf<S>>,
}

impl<S> Peer<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Reads the client preamble and agrees to `version`.
    pub async fn accept(mut stream: S, (major, minor): (u8, u8)) -> Self {
        let mut preamble = [0u8; 20];
        stream.read_exact(&mut preamble).await.unwrap();
        stream.write_all(&[0, 0, minor, major]).await.unwrap();
        let (rh, wh) = tokio::io::split(stream);
        Self {
            reader: ChunkReader::new(rh),
            writer: ChunkWriter::new(wh),
        }
    }

    pub async fn expect(&mut self) -> ClientMessage {
        let data = self.reader.read_message().await.unwrap();
        decode_client_message(&data).unwrap()
    }

    pub async fn reply(&mut self, msg: ServerMessage) {
        let mut buf = BytesMut::new();
        encode_server_message(&mut buf, &msg);
        self.writer.write_message(&buf);
        self.writer.flush().await.unwrap();
    }

    pub async fn success(&mut self, entries: &[(&str, PackValue)]) {
        self.reply(success(entries)).await;
    }

    pub async fn failure(&mut self, code: &str, message: &str) {
        self.reply(failure(code, message)).await;
    }
}
