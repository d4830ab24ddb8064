// ABOUTME: Fixed binary encodings layered on the bit-level buffer.
// ABOUTME: Variable ints, counts, strings, timestamps, coordinates, bitmasks and object fields.

use std::borrow::Cow;

use crate::buffer::ReplayBuffer;
use crate::error::{Error, Result};
use crate::types::{Coordinate, Endian};

/// (bit mask, value) for each of the 12 fractional bits of a coordinate,
/// most significant first. Bit `i` (1-indexed) is worth `1 / 2^i`.
const COORD_FRACTIONS: [(u16, f64); 12] = [
    (0x800, 0.5),
    (0x400, 0.25),
    (0x200, 0.125),
    (0x100, 0.062_5),
    (0x080, 0.031_25),
    (0x040, 0.015_625),
    (0x020, 0.007_812_5),
    (0x010, 0.003_906_25),
    (0x008, 0.001_953_125),
    (0x004, 0.000_976_562_5),
    (0x002, 0.000_488_281_25),
    (0x001, 0.000_244_140_625),
];

fn fixed_point_fraction(bits: u16) -> f64 {
    COORD_FRACTIONS
        .iter()
        .filter(|(mask, _)| bits & mask != 0)
        .map(|(_, quotient)| quotient)
        .sum()
}

impl<'a> ReplayBuffer<'a> {
    /// Read a count byte. Counts are stored doubled.
    pub fn read_count(&mut self) -> Result<u8> {
        Ok(self.read_byte()? / 2)
    }

    /// Read a variable-length signed integer.
    ///
    /// Base-128 groups, least significant first, bit 7 set on every byte but
    /// the last. Bit 0 of the assembled value is the sign; the rest is the
    /// magnitude.
    pub fn read_variable_int(&mut self) -> Result<i64> {
        let mut byte = self.read_byte()?;
        let mut value = u64::from(byte & 0x7F);
        let mut shift = 7u32;

        while byte & 0x80 != 0 {
            byte = self.read_byte()?;
            let group = u64::from(byte & 0x7F);
            if group != 0 {
                if shift >= 64 || (group << shift) >> shift != group {
                    return Err(Error::VarIntOverflow);
                }
                value |= group << shift;
            }
            shift = shift.saturating_add(7);
        }

        #[allow(clippy::cast_possible_wrap)] // value >> 1 fits in 63 bits
        let magnitude = (value >> 1) as i64;
        Ok(if value & 1 == 1 { -magnitude } else { magnitude })
    }

    /// Read a string. Without an explicit length a count byte comes first.
    pub fn read_string(&mut self, length: Option<usize>) -> Result<Cow<'a, [u8]>> {
        let length = match length {
            Some(length) => length,
            None => usize::from(self.read_count()?),
        };
        self.read_chars(length)
    }

    /// Read a frame timestamp.
    ///
    /// The low 2 bits of the first byte give the number of extra bytes, the
    /// high 6 bits are the most significant bits of the value. Three extra
    /// bytes are stored as a little-endian short followed by a byte.
    pub fn read_timestamp(&mut self) -> Result<u32> {
        let first = self.read_byte()?;
        let time = u32::from(first >> 2);
        match first & 0x03 {
            0 => Ok(time),
            1 => Ok(time << 8 | u32::from(self.read_byte()?)),
            2 => Ok(time << 16 | u32::from(self.read_short(Endian::Little)?)),
            3 => {
                let short = u32::from(self.read_short(Endian::Little)?);
                let byte = u32::from(self.read_byte()?);
                Ok(time << 24 | short << 8 | byte)
            }
            count => Err(Error::MalformedTimestamp(count)),
        }
    }

    fn read_coordinate_dimension(&mut self) -> Result<f64> {
        let coord = self.read(0, 20)?;
        let &[whole, high, low] = coord.as_slice() else {
            return Err(Error::InvalidData(format!(
                "coordinate read produced {} values",
                coord.len()
            )));
        };
        let fraction = u16::from(high) << 4 | u16::from(low);
        Ok(f64::from(whole) + fixed_point_fraction(fraction))
    }

    /// Read an (x, y) coordinate: two 20-bit fields of 8 integer and 12
    /// fractional bits.
    pub fn read_coordinate(&mut self) -> Result<Coordinate> {
        let x = self.read_coordinate_dimension()?;
        let y = self.read_coordinate_dimension()?;
        Ok(Coordinate::new(x, y))
    }

    /// Read a bitmask: a length byte (in bits) followed by that many bits.
    /// Index 0 is the first bit read.
    pub fn read_bitmask(&mut self) -> Result<Vec<bool>> {
        let length = usize::from(self.read_byte()?);
        let bytes = self.read(0, length)?;
        Ok((0..length)
            .map(|i| (bytes[i / 8] >> (i % 8)) & 1 == 1)
            .collect())
    }

    /// Read a big-endian object type, optionally followed by a modifier byte
    /// appended as the new low byte.
    pub fn read_object_type(&mut self, read_modifier: bool) -> Result<u32> {
        let object_type = u32::from(self.read_short(Endian::Big)?);
        if read_modifier {
            return Ok(object_type << 8 | u32::from(self.read_byte()?));
        }
        Ok(object_type)
    }

    /// Read a big-endian object id.
    pub fn read_object_id(&mut self) -> Result<u32> {
        self.read_int(Endian::Big)
    }
}
