//! PackStream decoding: bytes → `PackValue`.

use bytes::Buf;

use super::marker;
use super::{Dict, PackStruct, PackValue};
use crate::error::BoltError;

/// Deepest container nesting accepted from the wire.
pub const MAX_DEPTH: usize = 256;

/// Decodes a single wire value from the buffer.
///
/// Structures are returned uninterpreted; any tag is accepted here.
pub fn decode_value(buf: &mut impl Buf) -> Result<PackValue, BoltError> {
    decode_nested(buf, 0)
}

fn decode_nested(buf: &mut impl Buf, depth: usize) -> Result<PackValue, BoltError> {
    if depth > MAX_DEPTH {
        return Err(BoltError::protocol(format!(
            "value nested deeper than {MAX_DEPTH} levels"
        )));
    }
    let m = take_u8(buf)?;
    match m {
        marker::NULL => Ok(PackValue::Null),
        marker::FALSE => Ok(PackValue::Boolean(false)),
        marker::TRUE => Ok(PackValue::Boolean(true)),
        marker::FLOAT_64 => {
            need(buf, 8)?;
            Ok(PackValue::Float(buf.get_f64()))
        }

        marker::INT_8 => {
            need(buf, 1)?;
            Ok(PackValue::Integer(i64::from(buf.get_i8())))
        }
        marker::INT_16 => {
            need(buf, 2)?;
            Ok(PackValue::Integer(i64::from(buf.get_i16())))
        }
        marker::INT_32 => {
            need(buf, 4)?;
            Ok(PackValue::Integer(i64::from(buf.get_i32())))
        }
        marker::INT_64 => {
            need(buf, 8)?;
            Ok(PackValue::Integer(buf.get_i64()))
        }

        marker::BYTES_8 | marker::BYTES_16 | marker::BYTES_32 => {
            let len = read_len(buf, m - marker::BYTES_8)?;
            Ok(PackValue::Bytes(take_bytes(buf, len)?))
        }
        marker::STRING_8 | marker::STRING_16 | marker::STRING_32 => {
            let len = read_len(buf, m - marker::STRING_8)?;
            decode_string(buf, len)
        }
        marker::LIST_8 | marker::LIST_16 | marker::LIST_32 => {
            let len = read_len(buf, m - marker::LIST_8)?;
            decode_list(buf, len, depth)
        }
        marker::DICT_8 | marker::DICT_16 | marker::DICT_32 => {
            let len = read_len(buf, m - marker::DICT_8)?;
            decode_dict(buf, len, depth)
        }

        // TINY_INT: 0x00..=0x7F and 0xF0..=0xFF
        0x00..=0x7F | 0xF0..=0xFF => Ok(PackValue::Integer(i64::from(m as i8))),

        _ => {
            let size = usize::from(m & 0x0F);
            match m & 0xF0 {
                marker::TINY_STRING => decode_string(buf, size),
                marker::TINY_LIST => decode_list(buf, size, depth),
                marker::TINY_DICT => decode_dict(buf, size, depth),
                marker::TINY_STRUCT => {
                    let tag = take_u8(buf)?;
                    decode_struct(buf, tag, size, depth)
                }
                _ => Err(BoltError::protocol(format!(
                    "unknown PackStream marker: 0x{m:02X}"
                ))),
            }
        }
    }
}

/// Reads an 8, 16 or 32-bit length header; `width` is 0, 1 or 2.
fn read_len(buf: &mut impl Buf, width: u8) -> Result<usize, BoltError> {
    match width {
        0 => {
            need(buf, 1)?;
            Ok(usize::from(buf.get_u8()))
        }
        1 => {
            need(buf, 2)?;
            Ok(usize::from(buf.get_u16()))
        }
        _ => {
            need(buf, 4)?;
            Ok(buf.get_u32() as usize)
        }
    }
}

fn take_u8(buf: &mut impl Buf) -> Result<u8, BoltError> {
    need(buf, 1)?;
    Ok(buf.get_u8())
}

fn need(buf: &impl Buf, n: usize) -> Result<(), BoltError> {
    if buf.remaining() < n {
        return Err(BoltError::protocol(format!(
            "truncated value: need {n} bytes, {} remaining",
            buf.remaining()
        )));
    }
    Ok(())
}

fn take_bytes(buf: &mut impl Buf, len: usize) -> Result<Vec<u8>, BoltError> {
    need(buf, len)?;
    let mut data = vec![0u8; len];
    buf.copy_to_slice(&mut data);
    Ok(data)
}

fn decode_string(buf: &mut impl Buf, len: usize) -> Result<PackValue, BoltError> {
    let data = take_bytes(buf, len)?;
    String::from_utf8(data)
        .map(PackValue::String)
        .map_err(|e| BoltError::protocol(format!("invalid UTF-8 string: {e}")))
}

fn decode_list(buf: &mut impl Buf, len: usize, depth: usize) -> Result<PackValue, BoltError> {
    // Cap the pre-allocation: the length header is untrusted.
    let mut items = Vec::with_capacity(len.min(buf.remaining()));
    for _ in 0..len {
        items.push(decode_nested(buf, depth + 1)?);
    }
    Ok(PackValue::List(items))
}

fn decode_dict(buf: &mut impl Buf, len: usize, depth: usize) -> Result<PackValue, BoltError> {
    let mut dict = Dict::with_capacity(len.min(buf.remaining()));
    for _ in 0..len {
        let key = match decode_nested(buf, depth + 1)? {
            PackValue::String(s) => s,
            other => {
                return Err(BoltError::protocol(format!(
                    "dict key must be a string, got {}",
                    other.kind()
                )));
            }
        };
        let value = decode_nested(buf, depth + 1)?;
        dict.insert(key, value);
    }
    Ok(PackValue::Dict(dict))
}

fn decode_struct(
    buf: &mut impl Buf,
    tag: u8,
    field_count: usize,
    depth: usize,
) -> Result<PackValue, BoltError> {
    let mut fields = Vec::with_capacity(field_count);
    for _ in 0..field_count {
        fields.push(decode_nested(buf, depth + 1)?);
    }
    Ok(PackValue::Struct(PackStruct { tag, fields }))
}
