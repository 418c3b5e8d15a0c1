//! Reads chunked messages from an async byte stream.

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::{DEFAULT_MAX_MESSAGE_SIZE, MAX_CHUNK_SIZE};
use crate::error::BoltError;

/// Reads chunked messages from an `AsyncRead` stream.
///
/// Each message is one or more chunks (2-byte big-endian length followed by
/// that many bytes) terminated by an empty chunk. A message with no chunks at
/// all is a NOOP keep-alive and is skipped.
///
/// [`read_message`](Self::read_message) is cancel-safe: bytes received before
/// the future is dropped stay buffered and are used by the next call.
pub struct ChunkReader<R> {
    reader: R,
    buf: BytesMut,
    max_message_size: usize,
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_limit(reader, DEFAULT_MAX_MESSAGE_SIZE)
    }

    /// Creates a reader that rejects messages larger than `max_message_size`.
    pub fn with_limit(reader: R, max_message_size: usize) -> Self {
        Self {
            reader,
            buf: BytesMut::with_capacity(MAX_CHUNK_SIZE),
            max_message_size,
        }
    }

    /// Reads the next complete, non-empty message.
    pub async fn read_message(&mut self) -> Result<BytesMut, BoltError> {
        loop {
            if let Some(message) = self.take_message()? {
                if message.is_empty() {
                    tracing::trace!("NOOP keep-alive");
                    continue;
                }
                return Ok(message);
            }
            if self.reader.read_buf(&mut self.buf).await? == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed mid-message",
                )
                .into());
            }
        }
    }

    /// Removes one complete message from the buffer, if one has arrived.
    fn take_message(&mut self) -> Result<Option<BytesMut>, BoltError> {
        let mut end = 0;
        let mut size = 0;
        loop {
            let Some(header) = self.buf.get(end..end + 2) else {
                return Ok(None);
            };
            let chunk_len = usize::from(u16::from_be_bytes([header[0], header[1]]));
            end += 2;
            if chunk_len == 0 {
                break;
            }
            size += chunk_len;
            if size > self.max_message_size {
                return Err(BoltError::protocol(format!(
                    "inbound message exceeds {} bytes",
                    self.max_message_size
                )));
            }
            if self.buf.len() < end + chunk_len {
                return Ok(None);
            }
            end += chunk_len;
        }

        let mut frame = self.buf.split_to(end);
        let mut message = BytesMut::with_capacity(size);
        while frame.len() > 2 {
            let chunk_len = usize::from(frame.get_u16());
            message.extend_from_slice(&frame[..chunk_len]);
            frame.advance(chunk_len);
        }
        Ok(Some(message))
    }
}
