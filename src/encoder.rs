// ABOUTME: Byte-aligned encoder for the replay stream's fixed encodings.
// ABOUTME: Writes counts, variable ints, timestamps, object fields and tagged values.

use std::io::Write;

use crate::error::{Error, Result};
use crate::types::{tag, Endian};
use crate::value::Value;

/// Largest value a doubled count byte can carry.
const MAX_COUNT: usize = 0x7F;

/// Largest timestamp: 6 leading bits plus three extra bytes.
const MAX_TIMESTAMP: u32 = (1 << 30) - 1;

/// An encoder that writes replay stream encodings to a writer.
///
/// Everything is written byte-aligned; the bit-level reader decodes it from
/// any position.
pub struct Encoder<W: Write> {
    writer: W,
}

impl<W: Write> Encoder<W> {
    /// Create a new encoder that writes to the given writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Consume the encoder and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Get a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Write a single byte.
    #[inline]
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.writer.write_all(&[byte])?;
        Ok(())
    }

    /// Write raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        Ok(())
    }

    pub fn write_short(&mut self, value: u16, endian: Endian) -> Result<()> {
        match endian {
            Endian::Little => self.write_bytes(&value.to_le_bytes()),
            Endian::Big => self.write_bytes(&value.to_be_bytes()),
        }
    }

    pub fn write_int(&mut self, value: u32, endian: Endian) -> Result<()> {
        match endian {
            Endian::Little => self.write_bytes(&value.to_le_bytes()),
            Endian::Big => self.write_bytes(&value.to_be_bytes()),
        }
    }

    /// Write a count, stored doubled in one byte.
    #[allow(clippy::cast_possible_truncation)] // bounded by MAX_COUNT
    pub fn write_count(&mut self, count: usize) -> Result<()> {
        if count > MAX_COUNT {
            return Err(Error::InvalidData(format!("count {count} exceeds {MAX_COUNT}")));
        }
        self.write_byte((count as u8) << 1)
    }

    /// Write a variable-length signed integer: sign in bit 0, magnitude
    /// above it, in little-endian base-128 groups.
    #[allow(clippy::cast_possible_truncation)]
    pub fn write_variable_int(&mut self, value: i64) -> Result<()> {
        if value == i64::MIN {
            return Err(Error::InvalidData("variable int magnitude exceeds 63 bits".into()));
        }
        let mut raw = (value.unsigned_abs() << 1) | u64::from(value < 0);
        loop {
            let group = (raw & 0x7F) as u8;
            raw >>= 7;
            if raw == 0 {
                return self.write_byte(group);
            }
            self.write_byte(group | 0x80)?;
        }
    }

    /// Write a count-prefixed string.
    pub fn write_string(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_count(bytes.len())?;
        self.write_bytes(bytes)
    }

    /// Write a frame timestamp in its shortest form.
    #[allow(clippy::cast_possible_truncation)]
    pub fn write_timestamp(&mut self, frames: u32) -> Result<()> {
        match frames {
            0..=0x3F => self.write_byte((frames as u8) << 2),
            0x40..=0x3FFF => {
                self.write_byte(((frames >> 8) as u8) << 2 | 1)?;
                self.write_byte(frames as u8)
            }
            0x4000..=0x3F_FFFF => {
                self.write_byte(((frames >> 16) as u8) << 2 | 2)?;
                self.write_short(frames as u16, Endian::Little)
            }
            0x40_0000..=MAX_TIMESTAMP => {
                self.write_byte(((frames >> 24) as u8) << 2 | 3)?;
                self.write_short((frames >> 8) as u16, Endian::Little)?;
                self.write_byte(frames as u8)
            }
            _ => Err(Error::InvalidData(format!(
                "timestamp {frames} exceeds {MAX_TIMESTAMP}"
            ))),
        }
    }

    /// Write a big-endian object type with an optional modifier byte.
    pub fn write_object_type(&mut self, object_type: u16, modifier: Option<u8>) -> Result<()> {
        self.write_short(object_type, Endian::Big)?;
        match modifier {
            Some(byte) => self.write_byte(byte),
            None => Ok(()),
        }
    }

    /// Write a big-endian object id.
    pub fn write_object_id(&mut self, object_id: u32) -> Result<()> {
        self.write_int(object_id, Endian::Big)
    }

    /// Write a tagged structured value.
    #[allow(clippy::cast_sign_loss)]
    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Bytes(b) => {
                self.write_byte(tag::BYTES)?;
                self.write_string(b)
            }
            Value::List(items) => {
                self.write_byte(tag::LIST)?;
                self.write_bytes(&tag::LIST_PREFIX)?;
                self.write_count(items.len())?;
                for item in items {
                    self.write_value(item)?;
                }
                Ok(())
            }
            Value::Map(map) => {
                self.write_byte(tag::MAP)?;
                self.write_count(map.len())?;
                for (key, val) in map.iter() {
                    self.write_count(usize::from(key))?;
                    self.write_value(val)?;
                }
                Ok(())
            }
            Value::U8(n) => {
                self.write_byte(tag::U8)?;
                self.write_byte(*n)
            }
            Value::I32(n) => {
                self.write_byte(tag::I32)?;
                self.write_int(*n as u32, Endian::Little)
            }
            Value::VarInt(n) => {
                self.write_byte(tag::VAR_INT)?;
                self.write_variable_int(*n)
            }
        }
    }

    /// Flush the underlying writer.
    pub fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
