//! Compact ("nBits") encoding of 256-bit difficulty targets.
//!
//! `bits = size << 24 | mantissa`, where the target is
//! `mantissa * 256^(size - 3)` and bit 23 of the mantissa is a sign flag.
//! Decoding reports the sign and overflow conditions instead of rejecting, so
//! callers decide which of them matter.

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedCompact {
    pub target: BigUint,
    pub negative: bool,
    pub overflow: bool,
}

impl DecodedCompact {
    /// A target usable for a difficulty comparison: not negative, no
    /// overflow, not zero.
    pub fn is_usable(&self) -> bool {
        !self.negative && !self.overflow && !self.target.is_zero()
    }
}

pub fn decode_compact(bits: u32) -> DecodedCompact {
    let size = bits >> 24;
    let mut word = bits & 0x007f_ffff;
    let target = if size <= 3 {
        word >>= 8 * (3 - size);
        BigUint::from(word)
    } else {
        // Wider shifts would not fit 256 bits; those are flagged as overflow
        // below and the value is truncated like fixed-width arithmetic.
        let shifted = BigUint::from(word) << (8 * (size - 3)) as usize;
        truncate_256(shifted)
    };
    let negative = word != 0 && (bits & 0x0080_0000) != 0;
    let overflow = word != 0
        && (size > 34 || (word > 0xff && size > 33) || (word > 0xffff && size > 32));
    DecodedCompact {
        target,
        negative,
        overflow,
    }
}

pub fn encode_compact(target: &BigUint) -> u32 {
    let mut size = ((target.bits() + 7) / 8) as u32;
    let mut compact: u32 = if size <= 3 {
        let low = target.to_u64().unwrap_or(0);
        (low << (8 * (3 - size))) as u32
    } else {
        let shifted: BigUint = target >> (8 * (size - 3)) as usize;
        shifted.to_u32().unwrap_or(0)
    };
    // The mantissa is signed; move a set top bit into the exponent.
    if compact & 0x0080_0000 != 0 {
        compact >>= 8;
        size += 1;
    }
    compact | (size << 24)
}

/// Drops everything above bit 255.
pub fn truncate_256(v: BigUint) -> BigUint {
    if v.bits() <= 256 {
        return v;
    }
    let mut le = v.to_bytes_le();
    le.truncate(32);
    BigUint::from_bytes_le(&le)
}
