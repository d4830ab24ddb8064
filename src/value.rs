// ABOUTME: Dynamic value tree produced by the structured value decoder.
// ABOUTME: Maps keep first-insertion order and let later duplicate keys overwrite.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;

/// Validate bytes as UTF-8.
/// Uses simdutf8 for SIMD-accelerated validation when the feature is enabled.
#[cfg(feature = "simd-utf8")]
#[inline]
fn validate_utf8(bytes: &[u8]) -> Option<&str> {
    simdutf8::basic::from_utf8(bytes).ok()
}

#[cfg(not(feature = "simd-utf8"))]
#[inline]
fn validate_utf8(bytes: &[u8]) -> Option<&str> {
    std::str::from_utf8(bytes).ok()
}

/// A decoded structured value.
#[derive(Clone, PartialEq)]
pub enum Value {
    /// Count-prefixed byte string
    Bytes(Vec<u8>),
    /// Ordered list
    List(Vec<Value>),
    /// Map keyed by a small integer
    Map(ValueMap),
    /// One raw byte
    U8(u8),
    /// 32-bit integer
    I32(i32),
    /// Variable-length signed integer
    VarInt(i64),
}

impl Value {
    #[must_use]
    pub fn is_bytes(&self) -> bool {
        matches!(self, Value::Bytes(_))
    }

    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    #[must_use]
    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// Returns true for any of the integer variants.
    #[must_use]
    pub fn is_integer(&self) -> bool {
        matches!(self, Value::U8(_) | Value::I32(_) | Value::VarInt(_))
    }

    /// If this is an integer of any width, returns it as i64.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::U8(n) => Some(i64::from(*n)),
            Value::I32(n) => Some(i64::from(*n)),
            Value::VarInt(n) => Some(*n),
            _ => None,
        }
    }

    /// If this is a byte string, returns it.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// If this is a byte string holding valid UTF-8, returns it as text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(validate_utf8)
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Index into a list. Returns None if not a list or index out of bounds.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.as_list().and_then(|l| l.get(index))
    }

    /// Look up a map entry. Returns None if not a map or key not found.
    #[must_use]
    pub fn get_key(&self, key: u8) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(key))
    }
}

/// Map from small integer keys to values, in first-insertion order.
///
/// Inserting an existing key replaces its value in place, so the last write
/// wins while the key keeps its original position.
#[derive(Clone, PartialEq, Default)]
pub struct ValueMap {
    entries: Vec<(u8, Value)>,
}

impl ValueMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: u8) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    #[must_use]
    pub fn contains_key(&self, key: u8) -> bool {
        self.get(key).is_some()
    }

    /// Insert or overwrite. Returns the previous value for `key`, if any.
    pub fn insert(&mut self, key: u8, value: Value) -> Option<Value> {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(&mut slot.1, value));
        }
        self.entries.push((key, value));
        None
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &Value)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = u8> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl FromIterator<(u8, Value)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (u8, Value)>>(iter: I) -> Self {
        let mut map = ValueMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl IntoIterator for ValueMap {
    type Item = (u8, Value);
    type IntoIter = std::vec::IntoIter<(u8, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl fmt::Debug for ValueMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bytes(b) => match validate_utf8(b) {
                Some(s) => write!(f, "Bytes({s:?})"),
                None => write!(f, "Bytes({b:02x?})"),
            },
            Value::List(l) => f.debug_tuple("List").field(l).finish(),
            Value::Map(m) => f.debug_tuple("Map").field(m).finish(),
            Value::U8(n) => write!(f, "U8({n})"),
            Value::I32(n) => write!(f, "I32({n})"),
            Value::VarInt(n) => write!(f, "VarInt({n})"),
        }
    }
}

// Display is JSON-like; non-UTF-8 byte strings render as hex.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bytes(b) => match validate_utf8(b) {
                Some(s) => write!(f, "\"{}\"", s.escape_default()),
                None => write!(f, "0x{}", hex::encode(b)),
            },
            Value::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::U8(n) => write!(f, "{n}"),
            Value::I32(n) => write!(f, "{n}"),
            Value::VarInt(n) => write!(f, "{n}"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Bytes(b) => match validate_utf8(b) {
                Some(s) => serializer.serialize_str(s),
                None => serializer.serialize_bytes(b),
            },
            Value::List(l) => {
                let mut seq = serializer.serialize_seq(Some(l.len()))?;
                for item in l {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(m) => m.serialize(serializer),
            Value::U8(n) => serializer.serialize_u8(*n),
            Value::I32(n) => serializer.serialize_i32(*n),
            Value::VarInt(n) => serializer.serialize_i64(*n),
        }
    }
}

impl Serialize for ValueMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, val) in self.iter() {
            map.serialize_entry(&key, val)?;
        }
        map.end()
    }
}

impl From<u8> for Value {
    fn from(n: u8) -> Self {
        Value::U8(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::I32(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::VarInt(n)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Bytes(s.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Bytes(s.into_bytes())
    }
}

impl From<ValueMap> for Value {
    fn from(m: ValueMap) -> Self {
        Value::Map(m)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Value::List(iter.into_iter().collect())
    }
}
