// ABOUTME: Wire-level constants and small value types for replay streams.
// ABOUTME: Tag bytes map directly to the structured value encoding.

use serde::Serialize;

/// Tag bytes for structured values.
pub mod tag {
    /// Count-prefixed byte string.
    pub const BYTES: u8 = 0x02;
    /// List: two fixed bytes, a count, then that many values.
    pub const LIST: u8 = 0x04;
    /// Map: a count, then (key count byte, value) pairs.
    pub const MAP: u8 = 0x05;
    /// One raw byte.
    pub const U8: u8 = 0x06;
    /// Little-endian 32-bit integer.
    pub const I32: u8 = 0x07;
    /// Variable-length signed integer.
    pub const VAR_INT: u8 = 0x09;

    /// The two bytes that always follow a list tag.
    pub const LIST_PREFIX: [u8; 2] = [0x01, 0x00];
}

/// The closed set of structured value tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Bytes,
    List,
    Map,
    U8,
    I32,
    VarInt,
}

impl Tag {
    /// Look up a tag byte. Returns `None` for bytes outside the known set.
    #[inline]
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            tag::BYTES => Some(Tag::Bytes),
            tag::LIST => Some(Tag::List),
            tag::MAP => Some(Tag::Map),
            tag::U8 => Some(Tag::U8),
            tag::I32 => Some(Tag::I32),
            tag::VAR_INT => Some(Tag::VarInt),
            _ => None,
        }
    }

    /// The byte this tag is written as.
    #[inline]
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        match self {
            Tag::Bytes => tag::BYTES,
            Tag::List => tag::LIST,
            Tag::Map => tag::MAP,
            Tag::U8 => tag::U8,
            Tag::I32 => tag::I32,
            Tag::VarInt => tag::VAR_INT,
        }
    }
}

/// Byte order for fixed-width integer reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// A map coordinate decoded from two 20-bit fixed-point fields.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Frames per second of game time.
pub const FRAMES_PER_SECOND: u32 = 16;

/// Default resource limits for structured value decoding.
pub mod limits {
    /// Maximum list/map nesting depth
    pub const MAX_DEPTH: usize = 64;

    /// Maximum elements in a single list or map
    pub const MAX_CONTAINER_SIZE: usize = 1_000_000;
}
