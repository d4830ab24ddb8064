// ABOUTME: Parser for the user-data header that precedes a replay archive.
// ABOUTME: Extracts game version numbers and the replay length in frames.

use serde::Serialize;
use tracing::debug;

use crate::buffer::ReplayBuffer;
use crate::error::{Error, Result};
use crate::types::{Endian, FRAMES_PER_SECOND};
use crate::value::Value;

/// Magic bytes of the archive user-data block.
pub const HEADER_MAGIC: [u8; 4] = *b"MPQ\x1b";

/// Map key holding the version numbers.
const VERSIONS_KEY: u8 = 1;
/// Map key holding the replay length in frames.
const FRAMES_KEY: u8 = 3;
/// Index of the build number within the version numbers.
const BUILD_INDEX: usize = 4;

/// Version and length information read from a replay's user-data header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayHeader {
    pub max_data_size: u32,
    pub header_offset: u32,
    pub data_size: u32,
    /// Version numbers ordered by key: [unknown, major, minor, patch, build, ...]
    pub versions: Vec<i64>,
    pub build: i64,
    /// `major.minor.patch.build`
    pub release_string: String,
    pub frames: i64,
    pub seconds: i64,
}

impl ReplayHeader {
    /// Parse the header from the start of a replay file.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut buffer = ReplayBuffer::new(data);
        if buffer.left() < HEADER_MAGIC.len()
            || *buffer.read_chars(HEADER_MAGIC.len())? != HEADER_MAGIC
        {
            return Err(Error::InvalidMagic);
        }

        let max_data_size = buffer.read_int(Endian::Little)?;
        let header_offset = buffer.read_int(Endian::Little)?;
        let data_size = buffer.read_int(Endian::Little)?;

        let header_data = buffer.read_data_struct()?;
        let versions = read_versions(&header_data)?;
        let Some(&build) = versions.get(BUILD_INDEX) else {
            return Err(Error::InvalidData(format!(
                "expected at least {} version numbers, got {}",
                BUILD_INDEX + 1,
                versions.len()
            )));
        };
        let release_string = versions[1..=BUILD_INDEX]
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(".");

        let frames = header_data
            .get_key(FRAMES_KEY)
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::InvalidData("header is missing the frame count".into()))?;
        let seconds = frames / i64::from(FRAMES_PER_SECOND);

        debug!(build, frames, %release_string, "parsed replay header");
        Ok(Self {
            max_data_size,
            header_offset,
            data_size,
            versions,
            build,
            release_string,
            frames,
            seconds,
        })
    }
}

fn read_versions(header_data: &Value) -> Result<Vec<i64>> {
    let versions = header_data
        .get_key(VERSIONS_KEY)
        .and_then(Value::as_map)
        .ok_or_else(|| Error::InvalidData("header is missing the version map".into()))?;

    let mut entries: Vec<_> = versions.iter().collect();
    entries.sort_by_key(|(key, _)| *key);
    entries
        .into_iter()
        .map(|(key, value)| {
            value
                .as_i64()
                .ok_or_else(|| Error::InvalidData(format!("version entry {key} is not an integer")))
        })
        .collect()
}
