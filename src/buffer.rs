// ABOUTME: Bit-addressable cursor over an in-memory replay stream.
// ABOUTME: Tracks byte offset plus sub-byte bit offset; reads straddle byte boundaries.

#![allow(clippy::cast_possible_truncation)]

use std::borrow::Cow;
use std::cmp::Ordering;
use std::io::SeekFrom;

use crate::error::{Error, Result};
use crate::shift::{transition, LO_MASKS};
use crate::types::Endian;

/// A cursor over a replay stream that supports reads of arbitrary bit width.
///
/// Bits are consumed starting from the least significant bit of each byte.
/// When the bit offset is non-zero the byte at `tell() - 1` is cached and the
/// next read continues from its unread high bits.
///
/// Every read checks availability before touching any state, so a read that
/// fails with [`Error::EndOfStream`] leaves the cursor where it was.
#[derive(Debug, Clone)]
pub struct ReplayBuffer<'a> {
    data: &'a [u8],
    pos: usize,
    /// Bits of `last_byte` already consumed, always in `0..8`.
    bit_shift: u8,
    last_byte: u8,
}

impl<'a> ReplayBuffer<'a> {
    /// Create a buffer positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            bit_shift: 0,
            last_byte: 0,
        }
    }

    /// Total length of the stream in bytes.
    #[must_use]
    pub fn length(&self) -> usize {
        self.data.len()
    }

    /// Current byte offset.
    #[must_use]
    pub fn tell(&self) -> usize {
        self.pos
    }

    /// Alias for [`tell`](Self::tell).
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.pos
    }

    /// Bytes not yet touched by a read.
    #[must_use]
    pub fn left(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True once every byte has been loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.left() == 0
    }

    /// Current sub-byte bit offset in `0..8`.
    #[must_use]
    pub fn bit_offset(&self) -> u8 {
        self.bit_shift
    }

    /// True when the next read starts on a byte boundary.
    #[must_use]
    pub fn is_aligned(&self) -> bool {
        self.bit_shift == 0
    }

    /// Unread bits, including the unread part of a cached byte.
    #[must_use]
    pub fn bits_left(&self) -> usize {
        let cached = if self.bit_shift == 0 {
            0
        } else {
            usize::from(8 - self.bit_shift)
        };
        self.left() * 8 + cached
    }

    /// The underlying bytes.
    #[must_use]
    pub fn get_ref(&self) -> &'a [u8] {
        self.data
    }

    // =========================================================================
    // Stream manipulation
    // =========================================================================

    /// Move the byte offset.
    ///
    /// With a bit offset in progress the byte before the new position is
    /// reloaded into the cache so the next bit read continues from it. Seeking
    /// to offset 0 has no preceding byte and clears the bit offset instead.
    pub fn seek(&mut self, position: SeekFrom) -> Result<usize> {
        let (base, delta) = match position {
            SeekFrom::Start(n) => (0i128, i128::from(n)),
            SeekFrom::Current(n) => (self.pos as i128, i128::from(n)),
            SeekFrom::End(n) => (self.data.len() as i128, i128::from(n)),
        };
        let target = base + delta;
        if target < 0 || target > self.data.len() as i128 {
            return Err(Error::InvalidData(format!(
                "seek to {target} outside stream of {} bytes",
                self.data.len()
            )));
        }

        self.pos = target as usize;
        if self.bit_shift != 0 {
            if self.pos == 0 {
                self.bit_shift = 0;
            } else {
                self.last_byte = self.data[self.pos - 1];
            }
        }
        Ok(self.pos)
    }

    /// Move the byte offset relative to the current position.
    pub fn skip(&mut self, amount: i64) -> Result<usize> {
        self.seek(SeekFrom::Current(amount))
    }

    /// Return to the start of the stream with no bit offset.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.bit_shift = 0;
    }

    /// Drop the unread bits of a partially consumed byte.
    pub fn align(&mut self) {
        self.bit_shift = 0;
    }

    /// Read `length` bytes as hex and put the cursor back where it was.
    pub fn peek(&mut self, length: usize) -> Result<String> {
        let saved = (self.pos, self.bit_shift, self.last_byte);
        let result = self.read_hex(length);
        (self.pos, self.bit_shift, self.last_byte) = saved;
        result
    }

    /// Raw bytes in `[start, end)` by absolute position. Does not move the
    /// cursor or look at the bit offset.
    pub fn read_range(&self, start: usize, end: usize) -> Result<&'a [u8]> {
        if start > end {
            return Err(Error::InvalidData(format!("range {start}..{end} is reversed")));
        }
        self.data.get(start..end).ok_or(Error::EndOfStream {
            requested: (end - start).saturating_mul(8),
            available: self.data.len().saturating_sub(start).saturating_mul(8),
        })
    }

    // =========================================================================
    // Core reading
    // =========================================================================

    /// `bytes * 8 + bits`, or end of stream when that cannot be represented.
    #[inline]
    fn bit_length(&self, bytes: usize, bits: usize) -> Result<usize> {
        bytes
            .checked_mul(8)
            .and_then(|n| n.checked_add(bits))
            .ok_or(Error::EndOfStream {
                requested: usize::MAX,
                available: self.bits_left(),
            })
    }

    #[inline]
    fn ensure_bits(&self, requested: usize) -> Result<()> {
        let available = self.bits_left();
        if requested > available {
            return Err(Error::EndOfStream { requested, available });
        }
        Ok(())
    }

    /// Next whole byte. Caller has already checked availability.
    #[inline]
    fn next_byte_unchecked(&mut self) -> u8 {
        let byte = self.data[self.pos];
        self.pos += 1;
        byte
    }

    /// Read `bits` bits (at most the unread bits of the current byte).
    ///
    /// Loads a fresh byte when none is cached. Requesting more bits than the
    /// cached byte has left is [`Error::InvalidBitWidth`].
    pub fn shift(&mut self, bits: u8) -> Result<u8> {
        let new_shift = self.bit_shift + bits.min(8);
        if bits > 8 || new_shift > 8 {
            return Err(Error::InvalidBitWidth {
                requested: bits,
                remaining: 8 - self.bit_shift,
            });
        }
        if bits == 0 {
            return Ok(0);
        }

        if self.bit_shift == 0 {
            if self.pos >= self.data.len() {
                return Err(Error::EndOfStream {
                    requested: usize::from(bits),
                    available: 0,
                });
            }
            self.last_byte = self.next_byte_unchecked();
        }

        let value = (self.last_byte >> self.bit_shift) & LO_MASKS[usize::from(bits)];
        self.bit_shift = if new_shift == 8 { 0 } else { new_shift };
        Ok(value)
    }

    /// Read `bytes * 8 + bits` bits.
    ///
    /// Returns one value per output byte. A byte-aligned read yields the whole
    /// bytes followed by the trailing partial byte. An unaligned read
    /// assembles each output byte from the unread high bits of one input byte
    /// and the bits of the next, using the precomputed transition for
    /// (current offset, final offset).
    pub fn read(&mut self, bytes: usize, bits: usize) -> Result<Vec<u8>> {
        let bit_count = self.bit_length(bytes, bits)?;
        if bit_count == 0 {
            return Ok(Vec::new());
        }
        self.ensure_bits(bit_count)?;

        let old = self.bit_shift;
        if bit_count <= usize::from(8 - old) {
            return Ok(vec![self.shift(bit_count as u8)?]);
        }

        let (whole, partial) = (bit_count / 8, (bit_count % 8) as u8);
        if old == 0 {
            let mut out = Vec::with_capacity(whole + 1);
            out.extend_from_slice(&self.data[self.pos..self.pos + whole]);
            self.pos += whole;
            if partial != 0 {
                out.push(self.shift(partial)?);
            }
            return Ok(out);
        }

        let new = (old + partial) % 8;
        let st = transition(old, new);

        let mut out = Vec::with_capacity(whole + 2);
        let mut remaining = bit_count - usize::from(st.old_shift_inv);
        let mut first = self.last_byte & st.hi_mask;
        let mut next = self.next_byte_unchecked();

        while remaining > 8 {
            let second = (next & st.lo_mask_inv) >> st.old_shift_inv;
            out.push(first | second);
            first = (next & st.hi_mask_inv) << old;
            remaining -= 8;
            next = self.next_byte_unchecked();
        }

        let last = next & st.last_mask;
        match st.adjustment.cmp(&0) {
            Ordering::Less => out.push((first >> st.adjustment.unsigned_abs()) | last),
            Ordering::Greater => {
                out.push(last & st.adjustment_mask);
                out.push(first | (last >> st.adjustment));
            }
            Ordering::Equal => out.push(first | last),
        }

        self.last_byte = next;
        self.bit_shift = new;
        Ok(out)
    }

    // =========================================================================
    // Basic reading
    // =========================================================================

    /// Read one byte.
    pub fn read_byte(&mut self) -> Result<u8> {
        if self.bit_shift == 0 {
            self.ensure_bits(8)?;
            return Ok(self.next_byte_unchecked());
        }
        Ok(self.read(1, 0)?[0])
    }

    /// Read `length` bytes. Borrows from the stream when byte-aligned.
    pub fn read_chars(&mut self, length: usize) -> Result<Cow<'a, [u8]>> {
        if self.bit_shift == 0 {
            self.ensure_bits(self.bit_length(length, 0)?)?;
            let chars = &self.data[self.pos..self.pos + length];
            self.pos += length;
            return Ok(Cow::Borrowed(chars));
        }
        Ok(Cow::Owned(self.read(length, 0)?))
    }

    /// Read exactly `N` bytes into an array.
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let chars = self.read_chars(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&chars);
        Ok(out)
    }

    /// Read an unsigned 16-bit integer.
    pub fn read_short(&mut self, endian: Endian) -> Result<u16> {
        let raw = self.read_array::<2>()?;
        Ok(match endian {
            Endian::Little => u16::from_le_bytes(raw),
            Endian::Big => u16::from_be_bytes(raw),
        })
    }

    /// Read an unsigned 32-bit integer.
    pub fn read_int(&mut self, endian: Endian) -> Result<u32> {
        let raw = self.read_array::<4>()?;
        Ok(match endian {
            Endian::Little => u32::from_le_bytes(raw),
            Endian::Big => u32::from_be_bytes(raw),
        })
    }

    /// Read `length` bytes rendered as lowercase hex.
    pub fn read_hex(&mut self, length: usize) -> Result<String> {
        Ok(hex::encode(self.read_chars(length)?))
    }
}
