use scrypt::{scrypt, Params};
use sha2::{Digest, Sha256};

use crate::error::ConsensusError;
use crate::uint256::Uint256;

/// SHA-256 applied twice.
pub fn hash256(b: &[u8]) -> Uint256 {
    let first = Sha256::digest(b);
    let second = Sha256::digest(first);
    let mut r = [0u8; 32];
    r.copy_from_slice(&second);
    Uint256(r)
}

/// scrypt(N=1024, r=1, p=1) keyed and salted with the input. Block identity
/// and proof-of-work hash.
pub fn scrypt_1024_1_1(b: &[u8]) -> Result<Uint256, ConsensusError> {
    let params = Params::new(10, 1, 1, 32)
        .map_err(|e| ConsensusError::Internal(format!("scrypt params: {e}")))?;
    let mut out = [0u8; 32];
    scrypt(b, b, &params, &mut out)
        .map_err(|e| ConsensusError::Internal(format!("scrypt output: {e}")))?;
    Ok(Uint256(out))
}
