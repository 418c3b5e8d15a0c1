//! PackStream binary encoding format for the Bolt protocol.
//!
//! PackStream is a big-endian presentation format for richly-typed data.
//! This codec stops at the wire tree: structures come out as a tag byte plus
//! their raw fields and are given meaning by [`crate::types`].

pub mod decode;
pub mod encode;
pub mod marker;

use std::collections::HashMap;

pub use decode::decode_value;
pub use encode::encode_value;

/// A PackStream dictionary. Keys are always strings on the wire.
pub type Dict = HashMap<String, PackValue>;

/// A value as it appears on the wire, before structure interpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum PackValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Bytes(Vec<u8>),
    String(String),
    List(Vec<PackValue>),
    Dict(Dict),
    Struct(PackStruct),
}

/// A tagged structure: tag byte and up to 15 fields.
#[derive(Debug, Clone, PartialEq)]
pub struct PackStruct {
    pub tag: u8,
    pub fields: Vec<PackValue>,
}

impl PackStruct {
    pub fn new(tag: u8, fields: Vec<PackValue>) -> Self {
        Self { tag, fields }
    }
}

impl PackValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Short name of the wire type, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Bytes(_) => "bytes",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
            Self::Struct(_) => "struct",
        }
    }
}

impl From<&str> for PackValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for PackValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for PackValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<bool> for PackValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}
