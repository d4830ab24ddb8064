// ABOUTME: Recursive decoder for tagged structured values.
// ABOUTME: Dispatches on a closed tag set and enforces depth and size limits.

use tracing::{debug, trace};

use crate::buffer::ReplayBuffer;
use crate::error::{Error, Result};
use crate::types::{limits, Endian, Tag};
use crate::value::{Value, ValueMap};

/// How to handle duplicate keys in maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateKeyMode {
    /// Raise an error on duplicate keys
    Error,
    /// Keep the first value, ignore subsequent duplicates
    KeepFirst,
    /// Overwrite earlier values; the key keeps its first position
    #[default]
    KeepLast,
}

/// Configuration options for structured value decoding.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// How to handle duplicate map keys (default: KeepLast)
    pub duplicate_key_mode: DuplicateKeyMode,
    /// Maximum list/map nesting depth
    pub max_depth: usize,
    /// Maximum elements in a list or entries in a map
    pub max_container_size: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            duplicate_key_mode: DuplicateKeyMode::default(),
            max_depth: limits::MAX_DEPTH,
            max_container_size: limits::MAX_CONTAINER_SIZE,
        }
    }
}

/// Decodes one structured value at a time from a borrowed buffer.
pub struct Decoder<'b, 'a> {
    buffer: &'b mut ReplayBuffer<'a>,
    config: DecoderConfig,
}

impl<'b, 'a> Decoder<'b, 'a> {
    /// Create a decoder with the default configuration.
    pub fn new(buffer: &'b mut ReplayBuffer<'a>) -> Self {
        Self::with_config(buffer, DecoderConfig::default())
    }

    /// Create a decoder with custom configuration.
    pub fn with_config(buffer: &'b mut ReplayBuffer<'a>, config: DecoderConfig) -> Self {
        Self { buffer, config }
    }

    #[must_use]
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// The buffer being decoded.
    pub fn buffer(&mut self) -> &mut ReplayBuffer<'a> {
        &mut *self.buffer
    }

    /// Decode the next structured value.
    pub fn decode_value(&mut self) -> Result<Value> {
        self.decode_at_depth(0)
    }

    fn decode_at_depth(&mut self, depth: usize) -> Result<Value> {
        let offset = self.buffer.tell();
        let byte = self.buffer.read_byte()?;
        let Some(tag) = Tag::from_byte(byte) else {
            debug!(tag = byte, offset, "unrecognized data structure tag");
            return Err(Error::UnrecognizedTag(byte));
        };
        trace!(?tag, offset, depth, "decoding data structure");

        match tag {
            Tag::Bytes => {
                let bytes = self.buffer.read_string(None)?;
                Ok(Value::Bytes(bytes.into_owned()))
            }
            Tag::List => self.decode_list(depth),
            Tag::Map => self.decode_map(depth),
            Tag::U8 => Ok(Value::U8(self.buffer.read_byte()?)),
            #[allow(clippy::cast_possible_wrap)]
            Tag::I32 => Ok(Value::I32(self.buffer.read_int(Endian::Little)? as i32)),
            Tag::VarInt => Ok(Value::VarInt(self.buffer.read_variable_int()?)),
        }
    }

    fn enter_container(&self, depth: usize) -> Result<()> {
        if depth >= self.config.max_depth {
            debug!(depth, max_depth = self.config.max_depth, "structure nesting too deep");
            return Err(Error::MaxDepthExceeded);
        }
        Ok(())
    }

    fn read_container_count(&mut self) -> Result<usize> {
        let count = usize::from(self.buffer.read_count()?);
        if count > self.config.max_container_size {
            debug!(count, max = self.config.max_container_size, "container too large");
            return Err(Error::MaxContainerSizeExceeded);
        }
        Ok(count)
    }

    fn decode_list(&mut self, depth: usize) -> Result<Value> {
        self.enter_container(depth)?;

        // Every list carries two fixed bytes (01 00) before its count.
        if self.buffer.left() < 2 {
            return Err(Error::EndOfStream {
                requested: 16,
                available: self.buffer.bits_left(),
            });
        }
        self.buffer.skip(2)?;

        let count = self.read_container_count()?;
        let mut list = Vec::with_capacity(count);
        for _ in 0..count {
            list.push(self.decode_at_depth(depth + 1)?);
        }
        Ok(Value::List(list))
    }

    fn decode_map(&mut self, depth: usize) -> Result<Value> {
        self.enter_container(depth)?;

        let count = self.read_container_count()?;
        let mut map = ValueMap::with_capacity(count);
        for _ in 0..count {
            let key = self.buffer.read_count()?;
            let value = self.decode_at_depth(depth + 1)?;
            if map.contains_key(key) {
                match self.config.duplicate_key_mode {
                    DuplicateKeyMode::Error => return Err(Error::DuplicateKey(key)),
                    DuplicateKeyMode::KeepFirst => continue,
                    DuplicateKeyMode::KeepLast => {}
                }
            }
            map.insert(key, value);
        }
        Ok(Value::Map(map))
    }
}

impl<'a> ReplayBuffer<'a> {
    /// Decode one structured value with the default configuration.
    pub fn read_data_struct(&mut self) -> Result<Value> {
        Decoder::new(self).decode_value()
    }

    /// Decode one structured value with custom configuration.
    pub fn read_data_struct_with_config(&mut self, config: DecoderConfig) -> Result<Value> {
        Decoder::with_config(self, config).decode_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(data: &[u8]) -> Result<Value> {
        ReplayBuffer::new(data).read_data_struct()
    }

    #[test]
    fn test_decode_scalars() {
        assert_eq!(decode(&[0x06, 0x2a]).unwrap(), Value::U8(42));
        assert_eq!(
            decode(&[0x07, 0x78, 0x56, 0x34, 0x12]).unwrap(),
            Value::I32(0x1234_5678)
        );
        assert_eq!(decode(&[0x07, 0xff, 0xff, 0xff, 0xff]).unwrap(), Value::I32(-1));
        assert_eq!(decode(&[0x09, 0x03]).unwrap(), Value::VarInt(-1));
    }

    #[test]
    fn test_decode_bytes() {
        let value = decode(&[0x02, 0x08, b'T', b'e', b'r', b'r']).unwrap();
        assert_eq!(value.as_str(), Some("Terr"));
    }

    #[test]
    fn test_decode_list() {
        let data = [0x04, 0x01, 0x00, 0x04, 0x06, 0x05, 0x09, 0x14];
        let value = decode(&data).unwrap();
        assert_eq!(value, Value::List(vec![Value::U8(5), Value::VarInt(10)]));
    }

    #[test]
    fn test_decode_map_preserves_order() {
        // {3: 1, 1: "a"}
        let data = [0x05, 0x04, 0x06, 0x06, 0x01, 0x02, 0x02, 0x02, b'a'];
        let value = decode(&data).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec![3, 1]);
        assert_eq!(map.get(3), Some(&Value::U8(1)));
        assert_eq!(map.get(1).and_then(Value::as_str), Some("a"));
    }

    #[test]
    fn test_decode_nested() {
        // {0: [ {1: 7} ]}
        let data = [
            0x05, 0x02, // map, 1 entry
            0x00, // key 0
            0x04, 0x01, 0x00, 0x02, // list, 1 element
            0x05, 0x02, 0x02, 0x09, 0x0e, // map {1: varint 7}
        ];
        let value = decode(&data).unwrap();
        let inner = value.get_key(0).and_then(|l| l.get(0)).and_then(|m| m.get_key(1));
        assert_eq!(inner, Some(&Value::VarInt(7)));
    }

    #[test]
    fn test_duplicate_keys() {
        // {1: 10, 1: 20}
        let data = [0x05, 0x04, 0x02, 0x06, 0x0a, 0x02, 0x06, 0x14];

        let value = decode(&data).unwrap();
        assert_eq!(value.get_key(1), Some(&Value::U8(20)));
        assert_eq!(value.as_map().map(ValueMap::len), Some(1));

        let config = DecoderConfig {
            duplicate_key_mode: DuplicateKeyMode::KeepFirst,
            ..Default::default()
        };
        let value = ReplayBuffer::new(&data).read_data_struct_with_config(config).unwrap();
        assert_eq!(value.get_key(1), Some(&Value::U8(10)));

        let config = DecoderConfig {
            duplicate_key_mode: DuplicateKeyMode::Error,
            ..Default::default()
        };
        let err = ReplayBuffer::new(&data).read_data_struct_with_config(config);
        assert_eq!(err, Err(Error::DuplicateKey(1)));
    }

    #[test]
    fn test_unrecognized_tag() {
        assert_eq!(decode(&[0x03]), Err(Error::UnrecognizedTag(0x03)));
        // nested failures propagate
        assert_eq!(
            decode(&[0x04, 0x01, 0x00, 0x02, 0x08]),
            Err(Error::UnrecognizedTag(0x08))
        );
    }

    #[test]
    fn test_truncated() {
        assert!(decode(&[]).unwrap_err().is_eof());
        assert!(decode(&[0x02, 0x08, b'a']).unwrap_err().is_eof());
        assert!(decode(&[0x04, 0x01]).unwrap_err().is_eof());
        assert!(decode(&[0x07, 0x01, 0x02]).unwrap_err().is_eof());
    }

    #[test]
    fn test_max_depth() {
        // three nested lists
        let data = [
            0x04, 0x01, 0x00, 0x02, 0x04, 0x01, 0x00, 0x02, 0x04, 0x01, 0x00, 0x00,
        ];
        let config = DecoderConfig {
            max_depth: 2,
            ..Default::default()
        };
        let err = ReplayBuffer::new(&data).read_data_struct_with_config(config);
        assert_eq!(err, Err(Error::MaxDepthExceeded));

        let value = decode(&data).unwrap();
        assert_eq!(value.get(0).and_then(|v| v.get(0)), Some(&Value::List(vec![])));
    }

    #[test]
    fn test_max_container_size() {
        let data = [0x05, 0x06, 0x00, 0x06, 0x01];
        let config = DecoderConfig {
            max_container_size: 2,
            ..Default::default()
        };
        let err = ReplayBuffer::new(&data).read_data_struct_with_config(config);
        assert_eq!(err, Err(Error::MaxContainerSizeExceeded));
    }

    #[test]
    fn test_decoder_reads_consecutive_values() {
        let data = [0x06, 0x01, 0x09, 0x04, 0x06, 0x02];
        let mut buf = ReplayBuffer::new(&data);
        let mut decoder = Decoder::new(&mut buf);
        assert_eq!(decoder.decode_value().unwrap(), Value::U8(1));
        assert_eq!(decoder.decode_value().unwrap(), Value::VarInt(2));
        assert_eq!(decoder.decode_value().unwrap(), Value::U8(2));
        assert!(decoder.buffer().is_empty());
    }

    #[test]
    fn test_decode_unaligned() {
        // a 4-bit field, then tag 0x06 and value 0x2a straddling nibbles
        let data = [0x0f, 0x26, 0x0a];
        let mut buf = ReplayBuffer::new(&data);
        assert_eq!(buf.shift(4).unwrap(), 0x0f);
        assert_eq!(buf.read_data_struct().unwrap(), Value::U8(0x2a));
        assert_eq!(buf.bit_offset(), 4);
    }
}
