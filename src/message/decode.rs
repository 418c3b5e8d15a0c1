//! Decode messages from PackStream bytes.

use super::{sig, ClientMessage, ServerMessage};
use crate::error::BoltError;
use crate::packstream::{decode_value, Dict, PackStruct, PackValue};

/// Decodes a server message. Unknown signatures are protocol violations.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, BoltError> {
    let PackStruct { tag, fields } = read_struct(data)?;
    let mut fields = fields.into_iter();
    match tag {
        sig::SUCCESS => Ok(ServerMessage::Success {
            metadata: dict_or_empty("SUCCESS", fields.next())?,
        }),
        sig::RECORD => match fields.next() {
            Some(PackValue::List(data)) => Ok(ServerMessage::Record { data }),
            other => Err(malformed("RECORD", "a field list", other.as_ref())),
        },
        sig::FAILURE => Ok(ServerMessage::Failure {
            metadata: dict_or_empty("FAILURE", fields.next())?,
        }),
        sig::IGNORED => Ok(ServerMessage::Ignored),
        _ => Err(BoltError::protocol(format!(
            "unknown server message signature 0x{tag:02X}"
        ))),
    }
}

/// Decodes a client message. Used by peers and test servers.
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, BoltError> {
    let PackStruct { tag, fields } = read_struct(data)?;
    let mut fields = fields.into_iter();
    match tag {
        sig::HELLO => Ok(ClientMessage::Hello {
            extra: require_dict("HELLO", fields.next())?,
        }),
        sig::LOGON => Ok(ClientMessage::Logon {
            auth: require_dict("LOGON", fields.next())?,
        }),
        sig::GOODBYE => Ok(ClientMessage::Goodbye),
        sig::RESET => Ok(ClientMessage::Reset),
        sig::RUN => {
            let query = match fields.next() {
                Some(PackValue::String(q)) => q,
                other => return Err(malformed("RUN", "a query string", other.as_ref())),
            };
            Ok(ClientMessage::Run {
                query,
                parameters: require_dict("RUN", fields.next())?,
                extra: dict_or_empty("RUN", fields.next())?,
            })
        }
        // Protocol 3 PULL_ALL has no fields.
        sig::PULL => match fields.next() {
            None => Ok(ClientMessage::pull_all()),
            some => Ok(ClientMessage::Pull {
                extra: require_dict("PULL", some)?,
            }),
        },
        _ => Err(BoltError::protocol(format!(
            "unknown client message signature 0x{tag:02X}"
        ))),
    }
}

fn read_struct(data: &[u8]) -> Result<PackStruct, BoltError> {
    let mut buf = data;
    match decode_value(&mut buf)? {
        PackValue::Struct(s) => Ok(s),
        other => Err(BoltError::protocol(format!(
            "message must be a structure, got {}",
            other.kind()
        ))),
    }
}

fn malformed(msg: &str, expected: &str, got: Option<&PackValue>) -> BoltError {
    BoltError::protocol(format!(
        "{msg} expects {expected}, got {}",
        got.map_or("nothing", PackValue::kind)
    ))
}

fn require_dict(msg: &str, v: Option<PackValue>) -> Result<Dict, BoltError> {
    match v {
        Some(PackValue::Dict(d)) => Ok(d),
        other => Err(malformed(msg, "a dict", other.as_ref())),
    }
}

fn dict_or_empty(msg: &str, v: Option<PackValue>) -> Result<Dict, BoltError> {
    match v {
        None => Ok(Dict::new()),
        some => require_dict(msg, some),
    }
}
