// ABOUTME: Precomputed mask and shift tables for unaligned bit reads.
// ABOUTME: Built at compile time and shared read-only by every buffer.

/// Low-bit masks indexed by bit width: `LO_MASKS[n]` keeps the low `n` bits.
pub(crate) const LO_MASKS: [u8; 9] = [0x00, 0x01, 0x03, 0x07, 0x0F, 0x1F, 0x3F, 0x7F, 0xFF];

/// Masks and shifts for a cross-byte read that starts at bit offset `old`
/// and ends at bit offset `new`.
///
/// Bits are consumed from the low end of each byte. During an unaligned read
/// the unread high bits of the current byte are carried forward in the high
/// positions of the output byte and topped up with bits from the next byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionState {
    /// `8 - old`: unread bits left in the cached byte.
    pub old_shift_inv: u8,
    /// Low `old` bits.
    pub lo_mask: u8,
    /// High `old` bits.
    pub lo_mask_inv: u8,
    /// High `8 - old` bits: the unread part of the cached byte.
    pub hi_mask: u8,
    /// Low `8 - old` bits: carried forward from each middle byte.
    pub hi_mask_inv: u8,
    /// Bits taken from the final byte.
    pub last_mask: u8,
    /// Signed correction applied when assembling the final output byte.
    pub adjustment: i8,
    /// Low `adjustment` bits; zero when the adjustment is not positive.
    pub adjustment_mask: u8,
}

impl TransitionState {
    const EMPTY: Self = Self {
        old_shift_inv: 0,
        lo_mask: 0,
        lo_mask_inv: 0,
        hi_mask: 0,
        hi_mask_inv: 0,
        last_mask: 0,
        adjustment: 0,
        adjustment_mask: 0,
    };

    /// Compute the entry for a read from bit offset `old` to bit offset `new`.
    #[must_use]
    pub const fn new(old: u8, new: u8) -> Self {
        let old_shift_inv = 8 - old;
        let lo_mask = LO_MASKS[old as usize];
        let lo_mask_inv = !LO_MASKS[old_shift_inv as usize];
        let hi_mask = 0xFF ^ lo_mask;
        let hi_mask_inv = 0xFF ^ lo_mask_inv;

        // new == 0 means the final byte was consumed completely
        let (last_mask, adjustment) = if new == 0 {
            (0xFF, (8 - old) as i8)
        } else {
            (LO_MASKS[new as usize], new as i8 - old as i8)
        };
        let adjustment_mask = if adjustment > 0 {
            LO_MASKS[adjustment as usize]
        } else {
            0
        };

        Self {
            old_shift_inv,
            lo_mask,
            lo_mask_inv,
            hi_mask,
            hi_mask_inv,
            last_mask,
            adjustment,
            adjustment_mask,
        }
    }
}

/// All 64 transitions, indexed `[old][new]`.
pub type TransitionTable = [[TransitionState; 8]; 8];

const fn build_table() -> TransitionTable {
    let mut table = [[TransitionState::EMPTY; 8]; 8];
    let mut old = 0;
    while old < 8 {
        let mut new = 0;
        while new < 8 {
            table[old][new] = TransitionState::new(old as u8, new as u8);
            new += 1;
        }
        old += 1;
    }
    table
}

/// The shared transition table.
pub static TRANSITIONS: TransitionTable = build_table();

/// Look up the transition from bit offset `old` to bit offset `new`.
#[inline]
#[must_use]
pub fn transition(old: u8, new: u8) -> &'static TransitionState {
    &TRANSITIONS[usize::from(old & 7)][usize::from(new & 7)]
}
