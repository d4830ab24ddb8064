// ABOUTME: Bit-level reader and tagged-value decoder for bit-packed game replay streams.
// ABOUTME: Exposes the buffer, fixed-format readers, structured value decoder and encoder.

//! # replay-bitstream
//!
//! Reads the bit-packed data files extracted from game replay archives.
//!
//! The [`ReplayBuffer`] tracks a byte offset plus a sub-byte bit offset, so
//! reads of any width can start mid-byte and cross byte boundaries. On top of
//! it sit the fixed encodings used throughout replay data: variable-length
//! integers, frame timestamps, fixed-point coordinates, bitmasks, object
//! fields and recursively tagged structured values.
//!
//! ## Quick Start
//!
//! ```rust
//! use replay_bitstream::{ReplayBuffer, Value};
//!
//! let data = [0x06, 0x2a, 0x09, 0x03];
//! let mut buffer = ReplayBuffer::new(&data);
//!
//! assert_eq!(buffer.read_data_struct().unwrap(), Value::U8(42));
//! assert_eq!(buffer.read_data_struct().unwrap(), Value::VarInt(-1));
//! assert!(buffer.is_empty());
//! ```
//!
//! ## Bit Order
//!
//! Bits are consumed from the least significant end of each byte:
//!
//! ```rust
//! use replay_bitstream::ReplayBuffer;
//!
//! let data = [0b1010_0110];
//! let mut buffer = ReplayBuffer::new(&data);
//! assert_eq!(buffer.shift(3).unwrap(), 0b110);
//! assert_eq!(buffer.shift(5).unwrap(), 0b10100);
//! ```
//!
//! ## Errors
//!
//! Every read checks that enough bits remain before changing any state, so a
//! failed read leaves the buffer where it was. Nothing is retried or
//! recovered internally; the caller decides whether to abandon the stream.

#![allow(clippy::missing_errors_doc)]

pub mod buffer;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod formats;
pub mod header;
pub mod shift;
pub mod types;
pub mod value;

// Re-export commonly used items at the crate root
pub use buffer::ReplayBuffer;
pub use decoder::{Decoder, DecoderConfig, DuplicateKeyMode};
pub use encoder::Encoder;
pub use error::{Error, Result};
pub use header::{ReplayHeader, HEADER_MAGIC};
pub use shift::{TransitionState, TRANSITIONS};
pub use types::{limits, tag, Coordinate, Endian, Tag, FRAMES_PER_SECOND};
pub use value::{Value, ValueMap};

use std::io::Write;

/// Decode one structured value from the start of `data`.
///
/// # Example
///
/// ```rust
/// use replay_bitstream::decode_value;
///
/// let bytes = [0x02, 0x08, b'Z', b'e', b'r', b'g'];
/// let value = decode_value(&bytes).unwrap();
/// assert_eq!(value.as_str(), Some("Zerg"));
/// ```
pub fn decode_value(data: &[u8]) -> Result<Value> {
    ReplayBuffer::new(data).read_data_struct()
}

/// Decode one structured value from the start of `data` with custom configuration.
pub fn decode_value_with_config(data: &[u8], config: DecoderConfig) -> Result<Value> {
    ReplayBuffer::new(data).read_data_struct_with_config(config)
}

/// Encode a structured value to bytes.
///
/// # Example
///
/// ```rust
/// use replay_bitstream::{encode_value, Value};
///
/// let bytes = encode_value(&Value::U8(42)).unwrap();
/// assert_eq!(bytes, vec![0x06, 0x2a]);
/// ```
pub fn encode_value(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_value_to_writer(&mut buf, value)?;
    Ok(buf)
}

/// Encode a structured value to a writer.
pub fn encode_value_to_writer<W: Write>(writer: W, value: &Value) -> Result<()> {
    let mut encoder = Encoder::new(writer);
    encoder.write_value(value)?;
    encoder.finish()
}
