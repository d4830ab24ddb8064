// ABOUTME: Property tests for the bit-level buffer and the fixed encodings.
// ABOUTME: Covers shift/read equivalence, cursor invariants, peek and encoder round trips.

use proptest::prelude::*;
use replay_bitstream::{Encoder, ReplayBuffer, Value, ValueMap};
use std::io::SeekFrom;

fn encode_with(f: impl FnOnce(&mut Encoder<&mut Vec<u8>>)) -> Vec<u8> {
    let mut buf = Vec::new();
    f(&mut Encoder::new(&mut buf));
    buf
}

/// Operations applied to a buffer when checking cursor invariants.
#[derive(Debug, Clone)]
enum Op {
    Shift(u8),
    Read(usize, usize),
    ReadByte,
    Seek(u64),
    SeekCurrent(i64),
    SeekEnd(i64),
    Skip(i64),
    Align,
    Reset,
    Peek(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u8..=8).prop_map(Op::Shift),
        (0usize..4, 0usize..16).prop_map(|(b, k)| Op::Read(b, k)),
        Just(Op::ReadByte),
        (0u64..40).prop_map(Op::Seek),
        (-12i64..12).prop_map(Op::SeekCurrent),
        (-40i64..4).prop_map(Op::SeekEnd),
        (-8i64..8).prop_map(Op::Skip),
        Just(Op::Align),
        Just(Op::Reset),
        (0usize..4).prop_map(Op::Peek),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        prop::collection::vec(any::<u8>(), 0..20).prop_map(Value::Bytes),
        any::<u8>().prop_map(Value::U8),
        any::<i32>().prop_map(Value::I32),
        (i64::MIN + 1..=i64::MAX).prop_map(Value::VarInt),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
            prop::collection::vec((0u8..128, inner), 0..6)
                .prop_map(|entries| Value::Map(entries.into_iter().collect::<ValueMap>())),
        ]
    })
}

proptest! {
    #[test]
    fn shift_matches_manual_mask(byte in any::<u8>(), offset in 0u8..8, width in 1u8..=8) {
        prop_assume!(width <= 8 - offset);
        let data = [byte];
        let mut buf = ReplayBuffer::new(&data);
        if offset > 0 {
            buf.shift(offset).unwrap();
        }
        let expected = (u16::from(byte) >> offset) & ((1u16 << width) - 1);
        prop_assert_eq!(u16::from(buf.shift(width).unwrap()), expected);
        prop_assert_eq!(buf.bit_offset(), (offset + width) % 8);
    }

    #[test]
    fn aligned_read_matches_shifts(
        data in prop::collection::vec(any::<u8>(), 1..32),
        bytes in 0usize..32,
        bits in 0usize..8,
    ) {
        prop_assume!(bytes * 8 + bits <= data.len() * 8);

        let mut bulk = ReplayBuffer::new(&data);
        let read = bulk.read(bytes, bits).unwrap();

        let mut single = ReplayBuffer::new(&data);
        let mut expected = Vec::new();
        for _ in 0..bytes {
            expected.push(single.shift(8).unwrap());
        }
        if bits > 0 {
            expected.push(single.shift(bits as u8).unwrap());
        }

        prop_assert_eq!(read, expected);
        prop_assert_eq!(bulk.tell(), single.tell());
        prop_assert_eq!(bulk.bit_offset(), single.bit_offset());
    }

    #[test]
    fn read_consumes_exactly_requested_bits(
        data in prop::collection::vec(any::<u8>(), 2..16),
        offset in 0u8..8,
        bit_count in 0usize..64,
    ) {
        let mut buf = ReplayBuffer::new(&data);
        if offset > 0 {
            buf.shift(offset).unwrap();
        }
        let before = buf.bits_left();
        prop_assume!(bit_count <= before);

        let out = buf.read(0, bit_count).unwrap();
        prop_assert_eq!(buf.bits_left(), before - bit_count);
        prop_assert_eq!(out.len(), bit_count.div_ceil(8));
    }

    #[test]
    fn read_past_end_fails_without_moving(
        data in prop::collection::vec(any::<u8>(), 0..8),
        offset in 0u8..8,
        extra in 1usize..16,
    ) {
        let mut buf = ReplayBuffer::new(&data);
        if offset > 0 && !data.is_empty() {
            buf.shift(offset).unwrap();
        }
        let (tell, bit_offset) = (buf.tell(), buf.bit_offset());
        let err = buf.read(0, buf.bits_left() + extra).unwrap_err();
        prop_assert!(err.is_eof());
        prop_assert_eq!(buf.tell(), tell);
        prop_assert_eq!(buf.bit_offset(), bit_offset);
    }

    #[test]
    fn cursor_invariants_hold(
        data in prop::collection::vec(any::<u8>(), 0..32),
        ops in prop::collection::vec(arb_op(), 0..40),
    ) {
        let mut buf = ReplayBuffer::new(&data);
        for op in ops {
            let _ = match op {
                Op::Shift(n) => buf.shift(n).map(|_| ()),
                Op::Read(b, k) => buf.read(b, k).map(|_| ()),
                Op::ReadByte => buf.read_byte().map(|_| ()),
                Op::Seek(n) => buf.seek(SeekFrom::Start(n)).map(|_| ()),
                Op::SeekCurrent(n) => buf.seek(SeekFrom::Current(n)).map(|_| ()),
                Op::SeekEnd(n) => buf.seek(SeekFrom::End(n)).map(|_| ()),
                Op::Skip(n) => buf.skip(n).map(|_| ()),
                Op::Align => {
                    buf.align();
                    Ok(())
                }
                Op::Reset => {
                    buf.reset();
                    Ok(())
                }
                Op::Peek(n) => buf.peek(n).map(|_| ()),
            };
            prop_assert!(buf.bit_offset() < 8);
            prop_assert!(buf.tell() <= buf.length());
            let offset = buf.bit_offset();
            if offset != 0 {
                prop_assert!(buf.tell() > 0);
                // the cached byte is always the one before the cursor
                let mut lookahead = buf.clone();
                prop_assert_eq!(
                    lookahead.shift(8 - offset).unwrap(),
                    data[buf.tell() - 1] >> offset
                );
            }
        }
    }

    #[test]
    fn relative_seek_reloads_cached_byte(
        data in prop::collection::vec(any::<u8>(), 2..24),
        offset in 1u8..8,
        target_seed in any::<usize>(),
        from_end in any::<bool>(),
    ) {
        let mut buf = ReplayBuffer::new(&data);
        buf.shift(offset).unwrap();
        let target = 1 + target_seed % data.len();

        let position = if from_end {
            SeekFrom::End(target as i64 - data.len() as i64)
        } else {
            SeekFrom::Current(target as i64 - buf.tell() as i64)
        };
        prop_assert_eq!(buf.seek(position).unwrap(), target);
        prop_assert_eq!(buf.bit_offset(), offset);
        prop_assert_eq!(buf.shift(8 - offset).unwrap(), data[target - 1] >> offset);
        prop_assert_eq!(buf.tell(), target);
    }

    #[test]
    fn peek_is_invisible(
        data in prop::collection::vec(any::<u8>(), 1..16),
        offset in 0u8..8,
        peek_len in 0usize..8,
        bit_count in 0usize..32,
    ) {
        let mut plain = ReplayBuffer::new(&data);
        if offset > 0 {
            plain.shift(offset).unwrap();
        }
        let mut peeked = plain.clone();
        let _ = peeked.peek(peek_len);

        prop_assert_eq!(peeked.tell(), plain.tell());
        prop_assert_eq!(peeked.read(0, bit_count), plain.read(0, bit_count));
        prop_assert_eq!(peeked.bit_offset(), plain.bit_offset());
    }

    #[test]
    fn variable_int_roundtrip(value in -1_000_000i64..=1_000_000) {
        let bytes = encode_with(|e| e.write_variable_int(value).unwrap());
        let mut buf = ReplayBuffer::new(&bytes);
        prop_assert_eq!(buf.read_variable_int().unwrap(), value);
        prop_assert!(buf.is_empty());
    }

    #[test]
    fn variable_int_roundtrip_full_range(value in i64::MIN + 1..=i64::MAX) {
        let bytes = encode_with(|e| e.write_variable_int(value).unwrap());
        prop_assert_eq!(ReplayBuffer::new(&bytes).read_variable_int().unwrap(), value);
    }

    #[test]
    fn timestamp_roundtrip(frames in 0u32..(1 << 30)) {
        let bytes = encode_with(|e| e.write_timestamp(frames).unwrap());
        let mut buf = ReplayBuffer::new(&bytes);
        prop_assert_eq!(buf.read_timestamp().unwrap(), frames);
        prop_assert!(buf.is_empty());
    }

    #[test]
    fn structured_value_roundtrip(value in arb_value()) {
        let bytes = replay_bitstream::encode_value(&value).unwrap();
        let mut buf = ReplayBuffer::new(&bytes);
        prop_assert_eq!(buf.read_data_struct().unwrap(), value);
        prop_assert!(buf.is_empty());
    }

    #[test]
    fn bitmask_index_zero_is_first_bit(data in prop::collection::vec(any::<u8>(), 0..8), extra in 0usize..8) {
        let length = (data.len() * 8).saturating_sub(extra);
        let mut bytes = vec![length as u8];
        bytes.extend_from_slice(&data);

        let mask = ReplayBuffer::new(&bytes).read_bitmask().unwrap();
        prop_assert_eq!(mask.len(), length);

        let mut bits = ReplayBuffer::new(&data);
        for (i, flag) in mask.iter().enumerate() {
            prop_assert_eq!(*flag, bits.shift(1).unwrap() == 1, "bit {}", i);
        }
    }

    #[test]
    fn coordinate_is_fixed_point(
        x in 0u32..(1 << 20),
        top in 0u8..16,
        mid in any::<u8>(),
        tail in any::<u8>(),
    ) {
        // x is byte-aligned; y starts at bit offset 4 with `top` in the high
        // nibble of byte 2, then `mid` and `tail`
        let bytes = [
            (x >> 12) as u8,
            (x >> 4) as u8,
            ((x & 0x0f) as u8) | (top << 4),
            mid,
            tail,
        ];
        let mut buf = ReplayBuffer::new(&bytes);
        let coord = buf.read_coordinate().unwrap();
        prop_assert_eq!(coord.x, f64::from(x) / 4096.0);

        // offset 4 -> 0 assembly: full middle byte, then partial low nibble
        // first, then the byte combining the carried bits with the tail
        let whole = (top << 4) | (mid >> 4);
        let high = tail & 0x0f;
        let low = ((mid & 0x0f) << 4) | (tail >> 4);
        let fraction = (u16::from(high) << 4) | u16::from(low);
        prop_assert_eq!(coord.y, f64::from(whole) + f64::from(fraction) / 4096.0);
        prop_assert!(buf.is_empty());
        prop_assert!(buf.is_aligned());
    }
}
