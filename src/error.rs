// ABOUTME: Error types for replay stream reading, decoding and encoding.
// ABOUTME: Each variant carries a stable snake_case identifier for matching in tests.

use std::fmt;

/// The result type for replay stream operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or writing a replay stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A read would consume bits beyond the end of the buffer.
    EndOfStream {
        /// Bits the read asked for.
        requested: usize,
        /// Bits that were still unread.
        available: usize,
    },

    /// `shift` was asked for more bits than remain in the cached byte.
    /// This is a caller logic error, not truncated input.
    InvalidBitWidth { requested: u8, remaining: u8 },

    /// Structured value tag outside the known set.
    UnrecognizedTag(u8),

    /// Timestamp extra-byte count outside 0..=3.
    MalformedTimestamp(u8),

    /// Variable-length integer has more groups than fit in 64 bits.
    VarIntOverflow,

    /// Structured value nesting exceeds the configured depth.
    MaxDepthExceeded,

    /// Structured list or map exceeds the configured element count.
    MaxContainerSizeExceeded,

    /// Map key repeated while duplicate keys are configured as an error.
    DuplicateKey(u8),

    /// Replay header does not start with the archive user-data magic.
    InvalidMagic,

    /// Input or value has the wrong shape for the requested operation.
    InvalidData(String),

    /// Byte string is not valid UTF-8.
    InvalidUtf8,

    /// IO error during encoding.
    Io(String),
}

impl Error {
    /// Returns the stable error type name.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::EndOfStream { .. } => "end_of_stream",
            Error::InvalidBitWidth { .. } => "invalid_bit_width",
            Error::UnrecognizedTag(_) => "unrecognized_tag",
            Error::MalformedTimestamp(_) => "malformed_timestamp",
            Error::VarIntOverflow => "varint_overflow",
            Error::MaxDepthExceeded => "max_depth_exceeded",
            Error::MaxContainerSizeExceeded => "max_container_size_exceeded",
            Error::DuplicateKey(_) => "duplicate_key",
            Error::InvalidMagic => "invalid_magic",
            Error::InvalidData(_) => "invalid_data",
            Error::InvalidUtf8 => "invalid_utf8",
            Error::Io(_) => "io_error",
        }
    }

    /// True for errors caused by running out of input.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self, Error::EndOfStream { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EndOfStream { requested, available } => write!(
                f,
                "end of stream: requested {requested} bits, {available} remaining"
            ),
            Error::InvalidBitWidth { requested, remaining } => write!(
                f,
                "cannot shift off {requested} bits, only {remaining} bits remaining"
            ),
            Error::UnrecognizedTag(tag) => write!(f, "unrecognized data structure tag: 0x{tag:02x}"),
            Error::MalformedTimestamp(count) => {
                write!(f, "malformed timestamp: {count} extra bytes")
            }
            Error::VarIntOverflow => write!(f, "variable-length integer exceeds 64 bits"),
            Error::MaxDepthExceeded => write!(f, "maximum structure depth exceeded"),
            Error::MaxContainerSizeExceeded => write!(f, "maximum container size exceeded"),
            Error::DuplicateKey(key) => write!(f, "duplicate map key: {key}"),
            Error::InvalidMagic => write!(f, "missing replay header magic"),
            Error::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            Error::InvalidUtf8 => write!(f, "invalid UTF-8 sequence"),
            Error::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidUtf8
    }
}
