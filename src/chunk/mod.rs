//! Message framing: 2-byte length-prefixed chunks, `0x0000`-terminated.

pub mod reader;
pub mod writer;

pub use reader::ChunkReader;
pub use writer::ChunkWriter;

/// Largest payload one chunk can carry.
pub const MAX_CHUNK_SIZE: usize = 65535;

/// Default upper bound for one de-chunked inbound message (16 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;
