//! PackStream marker bytes.
//!
//! Tiny types pack their size into the low nibble of the marker; the
//! `TINY_*` constants are the high-nibble prefixes.

pub const NULL: u8 = 0xC0;
pub const FLOAT_64: u8 = 0xC1;
pub const FALSE: u8 = 0xC2;
pub const TRUE: u8 = 0xC3;

pub const INT_8: u8 = 0xC8;
pub const INT_16: u8 = 0xC9;
pub const INT_32: u8 = 0xCA;
pub const INT_64: u8 = 0xCB;

pub const BYTES_8: u8 = 0xCC;
pub const BYTES_16: u8 = 0xCD;
pub const BYTES_32: u8 = 0xCE;

pub const STRING_8: u8 = 0xD0;
pub const STRING_16: u8 = 0xD1;
pub const STRING_32: u8 = 0xD2;

pub const LIST_8: u8 = 0xD4;
pub const LIST_16: u8 = 0xD5;
pub const LIST_32: u8 = 0xD6;

pub const DICT_8: u8 = 0xD8;
pub const DICT_16: u8 = 0xD9;
pub const DICT_32: u8 = 0xDA;

pub const TINY_STRING: u8 = 0x80;
pub const TINY_LIST: u8 = 0x90;
pub const TINY_DICT: u8 = 0xA0;
pub const TINY_STRUCT: u8 = 0xB0;

/// Single-byte integers cover -16..=127.
pub const TINY_INT_MIN: i64 = -16;
pub const TINY_INT_MAX: i64 = 127;

/// Largest field count a tiny struct header can express.
pub const MAX_STRUCT_FIELDS: usize = 15;

/// Size-prefixed container family, used to pick the header width.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Family {
    String,
    List,
    Dict,
}

impl Family {
    /// Marker bytes for (tiny nibble, 8-bit, 16-bit, 32-bit) headers.
    pub(crate) fn markers(self) -> (u8, u8, u8, u8) {
        match self {
            Self::String => (TINY_STRING, STRING_8, STRING_16, STRING_32),
            Self::List => (TINY_LIST, LIST_8, LIST_16, LIST_32),
            Self::Dict => (TINY_DICT, DICT_8, DICT_16, DICT_32),
        }
    }
}
