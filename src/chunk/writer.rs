//! Writes chunked messages to an async byte stream.

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::MAX_CHUNK_SIZE;
use crate::error::BoltError;

/// Frames messages into an outbound buffer and writes them on flush.
///
/// Several messages queued before one [`flush`](Self::flush) go out in a
/// single write, which is how pipelined commands reach the server together.
/// Flushing is cancel-safe: unwritten bytes stay queued.
pub struct ChunkWriter<W> {
    writer: W,
    buf: BytesMut,
    max_chunk_size: usize,
}

impl<W: AsyncWrite + Unpin> ChunkWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buf: BytesMut::new(),
            max_chunk_size: MAX_CHUNK_SIZE,
        }
    }

    /// Queues one message, split into chunks and terminated.
    pub fn write_message(&mut self, data: &[u8]) {
        for chunk in data.chunks(self.max_chunk_size) {
            self.buf.put_u16(chunk.len() as u16);
            self.buf.put_slice(chunk);
        }
        self.buf.put_u16(0);
    }

    /// Bytes queued but not yet written.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Writes every queued byte and flushes the stream.
    pub async fn flush(&mut self) -> Result<(), BoltError> {
        while !self.buf.is_empty() {
            if self.writer.write_buf(&mut self.buf).await? == 0 {
                return Err(std::io::Error::from(std::io::ErrorKind::WriteZero).into());
            }
        }
        self.writer.flush().await?;
        Ok(())
    }
}
