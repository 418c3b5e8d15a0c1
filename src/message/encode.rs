//! Encode messages to PackStream bytes.

use bytes::BytesMut;

use super::{sig, ClientMessage, ServerMessage};
use crate::packstream::encode as ps;
use crate::packstream::Dict;

/// Encodes a client message for the negotiated protocol `version`.
///
/// Protocol 3 has no PULL metadata (PULL_ALL), so PULL is sent without
/// fields there.
pub fn encode_client_message(buf: &mut BytesMut, msg: &ClientMessage, version: (u8, u8)) {
    match msg {
        ClientMessage::Hello { extra } => single_dict(buf, sig::HELLO, extra),
        ClientMessage::Logon { auth } => single_dict(buf, sig::LOGON, auth),
        ClientMessage::Goodbye => ps::encode_struct_header(buf, sig::GOODBYE, 0),
        ClientMessage::Reset => ps::encode_struct_header(buf, sig::RESET, 0),
        ClientMessage::Run { query, parameters, extra } => {
            ps::encode_struct_header(buf, sig::RUN, 3);
            ps::encode_string(buf, query);
            ps::encode_dict(buf, parameters);
            ps::encode_dict(buf, extra);
        }
        ClientMessage::Pull { extra } if version.0 >= 4 => single_dict(buf, sig::PULL, extra),
        ClientMessage::Pull { .. } => ps::encode_struct_header(buf, sig::PULL, 0),
    }
}

/// Encodes a server message. Used by peers and test servers.
pub fn encode_server_message(buf: &mut BytesMut, msg: &ServerMessage) {
    match msg {
        ServerMessage::Success { metadata } => single_dict(buf, sig::SUCCESS, metadata),
        ServerMessage::Failure { metadata } => single_dict(buf, sig::FAILURE, metadata),
        ServerMessage::Record { data } => {
            ps::encode_struct_header(buf, sig::RECORD, 1);
            ps::encode_list(buf, data);
        }
        ServerMessage::Ignored => ps::encode_struct_header(buf, sig::IGNORED, 0),
    }
}

fn single_dict(buf: &mut BytesMut, signature: u8, dict: &Dict) {
    ps::encode_struct_header(buf, signature, 1);
    ps::encode_dict(buf, dict);
}
