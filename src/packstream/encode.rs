//! PackStream encoding: `PackValue` → bytes.

use bytes::{BufMut, BytesMut};

use super::marker::{self, Family};
use super::{Dict, PackStruct, PackValue};

/// Encodes a wire value into the buffer.
pub fn encode_value(buf: &mut BytesMut, value: &PackValue) {
    match value {
        PackValue::Null => buf.put_u8(marker::NULL),
        PackValue::Boolean(b) => buf.put_u8(if *b { marker::TRUE } else { marker::FALSE }),
        PackValue::Integer(i) => encode_int(buf, *i),
        PackValue::Float(f) => {
            buf.put_u8(marker::FLOAT_64);
            buf.put_f64(*f);
        }
        PackValue::Bytes(b) => encode_bytes(buf, b),
        PackValue::String(s) => encode_string(buf, s),
        PackValue::List(items) => encode_list(buf, items),
        PackValue::Dict(dict) => encode_dict(buf, dict),
        PackValue::Struct(s) => encode_struct(buf, s),
    }
}

/// Encodes an integer using the smallest representation that holds it.
pub fn encode_int(buf: &mut BytesMut, value: i64) {
    if (marker::TINY_INT_MIN..=marker::TINY_INT_MAX).contains(&value) {
        buf.put_i8(value as i8);
    } else if let Ok(v) = i8::try_from(value) {
        buf.put_u8(marker::INT_8);
        buf.put_i8(v);
    } else if let Ok(v) = i16::try_from(value) {
        buf.put_u8(marker::INT_16);
        buf.put_i16(v);
    } else if let Ok(v) = i32::try_from(value) {
        buf.put_u8(marker::INT_32);
        buf.put_i32(v);
    } else {
        buf.put_u8(marker::INT_64);
        buf.put_i64(value);
    }
}

/// Encodes a string; the size header counts UTF-8 bytes, not chars.
pub fn encode_string(buf: &mut BytesMut, value: &str) {
    encode_header(buf, Family::String, value.len());
    buf.put_slice(value.as_bytes());
}

pub fn encode_list(buf: &mut BytesMut, items: &[PackValue]) {
    encode_header(buf, Family::List, items.len());
    for item in items {
        encode_value(buf, item);
    }
}

pub fn encode_dict(buf: &mut BytesMut, dict: &Dict) {
    encode_header(buf, Family::Dict, dict.len());
    for (key, value) in dict {
        encode_string(buf, key);
        encode_value(buf, value);
    }
}

/// Encodes a structure header (tiny struct marker + tag) followed by its fields.
pub fn encode_struct(buf: &mut BytesMut, s: &PackStruct) {
    encode_struct_header(buf, s.tag, s.fields.len());
    for field in &s.fields {
        encode_value(buf, field);
    }
}

pub fn encode_struct_header(buf: &mut BytesMut, tag: u8, field_count: usize) {
    debug_assert!(
        field_count <= marker::MAX_STRUCT_FIELDS,
        "struct field count must be <= 15"
    );
    buf.put_u8(marker::TINY_STRUCT | field_count as u8);
    buf.put_u8(tag);
}

fn encode_bytes(buf: &mut BytesMut, value: &[u8]) {
    let len = value.len();
    if let Ok(n) = u8::try_from(len) {
        buf.put_u8(marker::BYTES_8);
        buf.put_u8(n);
    } else if let Ok(n) = u16::try_from(len) {
        buf.put_u8(marker::BYTES_16);
        buf.put_u16(n);
    } else {
        buf.put_u8(marker::BYTES_32);
        buf.put_u32(len as u32);
    }
    buf.put_slice(value);
}

fn encode_header(buf: &mut BytesMut, family: Family, len: usize) {
    let (tiny, m8, m16, m32) = family.markers();
    if len <= 15 {
        buf.put_u8(tiny | len as u8);
    } else if let Ok(n) = u8::try_from(len) {
        buf.put_u8(m8);
        buf.put_u8(n);
    } else if let Ok(n) = u16::try_from(len) {
        buf.put_u8(m16);
        buf.put_u16(n);
    } else {
        buf.put_u8(m32);
        buf.put_u32(len as u32);
    }
}
