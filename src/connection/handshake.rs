//! Client side of the Bolt handshake: magic preamble and version negotiation.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::BoltError;

/// Bolt magic preamble bytes.
pub const BOLT_MAGIC: [u8; 4] = [0x60, 0x60, 0xB0, 0x17];

/// Oldest protocol major version a session can drive.
pub const MIN_MAJOR: u8 = 3;

/// Builds the version proposals sent by this client.
///
/// Each 4-byte slot is `[0, range, minor, major]`; `range` counts the earlier
/// minor versions also accepted.
pub fn default_proposals() -> [u8; 16] {
    let mut proposals = [0u8; 16];
    // 5.4 down to 5.0
    proposals[1..4].copy_from_slice(&[4, 4, 5]);
    // 4.4 down to 4.0
    proposals[5..8].copy_from_slice(&[4, 4, 4]);
    // 3.0
    proposals[11] = 3;
    proposals
}

/// Returns whether `version` falls inside one of the proposal slots.
pub fn offered(proposals: &[u8; 16], (major, minor): (u8, u8)) -> bool {
    proposals.chunks_exact(4).any(|slot| {
        let (range, top_minor, top_major) = (slot[1], slot[2], slot[3]);
        top_major != 0
            && top_major == major
            && minor <= top_minor
            && minor >= top_minor.saturating_sub(range)
    })
}

/// Interprets the server's 4-byte reply.
pub fn parse_response(response: [u8; 4], proposals: &[u8; 16]) -> Result<(u8, u8), BoltError> {
    if &response == b"HTTP" {
        return Err(BoltError::protocol(
            "server answered the handshake with HTTP; check the port",
        ));
    }
    let version = (response[3], response[2]);
    if version == (0, 0) {
        return Err(BoltError::protocol("server rejected all proposed versions"));
    }
    if version.0 < MIN_MAJOR {
        return Err(BoltError::protocol(format!(
            "protocol {}.{} is older than {MIN_MAJOR}.0",
            version.0, version.1
        )));
    }
    if !offered(proposals, version) {
        return Err(BoltError::protocol(format!(
            "server chose protocol {}.{}, which was not proposed",
            version.0, version.1
        )));
    }
    Ok(version)
}

/// Sends magic + proposals and reads the negotiated version.
pub async fn client_handshake<S>(stream: &mut S, proposals: &[u8; 16]) -> Result<(u8, u8), BoltError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(&BOLT_MAGIC).await?;
    stream.write_all(proposals).await?;
    stream.flush().await?;

    let mut response = [0u8; 4];
    stream.read_exact(&mut response).await?;
    parse_response(response, proposals)
}
