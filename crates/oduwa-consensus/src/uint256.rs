use core::fmt;

use num_bigint::BigUint;

use crate::error::{ConsensusError, ErrorCode};

/// Opaque 256-bit value: block hashes, txids, proof hashes and difficulty limits.
///
/// Bytes are kept in little-endian order, the order they are serialized and
/// hashed in. Hex strings use the conventional reversed (big-endian) display.
/// `Ord` compares raw bytes (memcmp order), which is what the stake modifier
/// tie-break relies on; numeric comparisons go through [`Uint256::to_biguint`].
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uint256(pub [u8; 32]);

impl Uint256 {
    pub const ZERO: Uint256 = Uint256([0u8; 32]);

    /// Parses display hex at compile time. Only meant for `const` tables; a
    /// malformed literal fails the build.
    pub const fn from_hex_const(s: &str) -> Uint256 {
        let b = s.as_bytes();
        let start = if b.len() >= 2 && b[0] == b'0' && (b[1] == b'x' || b[1] == b'X') {
            2
        } else {
            0
        };
        let digits = b.len() - start;
        if digits > 64 {
            panic!("uint256 literal longer than 64 hex digits");
        }
        let mut out = [0u8; 32];
        let mut i = 0;
        // Walk from the least significant digit; digit i lands in byte i / 2.
        while i < digits {
            let c = b[b.len() - 1 - i];
            let v = match c {
                b'0'..=b'9' => c - b'0',
                b'a'..=b'f' => c - b'a' + 10,
                b'A'..=b'F' => c - b'A' + 10,
                _ => panic!("invalid hex digit in uint256 literal"),
            };
            if i % 2 == 0 {
                out[i / 2] |= v;
            } else {
                out[i / 2] |= v << 4;
            }
            i += 1;
        }
        Uint256(out)
    }

    pub fn from_hex(s: &str) -> Result<Uint256, ConsensusError> {
        let s = s.trim();
        let s = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if s.len() != 64 {
            return Err(ConsensusError::reject(
                ErrorCode::Parse,
                "uint256 hex must be 64 digits",
            ));
        }
        let mut be = hex::decode(s)
            .map_err(|_| ConsensusError::reject(ErrorCode::Parse, "uint256 hex invalid"))?;
        be.reverse();
        let mut out = [0u8; 32];
        out.copy_from_slice(&be);
        Ok(Uint256(out))
    }

    pub fn to_hex(&self) -> String {
        let mut be = self.0;
        be.reverse();
        hex::encode(be)
    }

    pub fn is_null(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_le(&self.0)
    }

    /// Truncates to the low 256 bits, as the fixed-width arithmetic does.
    pub fn from_biguint(v: &BigUint) -> Uint256 {
        let le = v.to_bytes_le();
        let mut out = [0u8; 32];
        let n = le.len().min(32);
        out[..n].copy_from_slice(&le[..n]);
        Uint256(out)
    }

    pub fn low_u64(&self) -> u64 {
        let mut w = [0u8; 8];
        w.copy_from_slice(&self.0[..8]);
        u64::from_le_bytes(w)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uint256({})", self.to_hex())
    }
}

impl From<[u8; 32]> for Uint256 {
    fn from(b: [u8; 32]) -> Self {
        Uint256(b)
    }
}
