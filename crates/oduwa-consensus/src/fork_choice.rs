use num_bigint::BigUint;
use num_traits::{One, Zero};
use tracing::warn;

use crate::chain::{BlockId, ChainIndex};
use crate::compact::decode_compact;
use crate::error::{ConsensusError, ErrorCode};
use crate::params::ConsensusParams;

// Expected number of hashes to meet the target:
//   work = floor(2^256 / (target + 1))
// Unusable encodings contribute no work.
pub fn block_proof(bits: u32) -> BigUint {
    let decoded = decode_compact(bits);
    if !decoded.is_usable() {
        return BigUint::zero();
    }
    let two256: BigUint = BigUint::one() << 256usize;
    two256 / (decoded.target + BigUint::one())
}

pub fn has_minimum_chain_work(chain: &ChainIndex, tip: BlockId, params: &ConsensusParams) -> bool {
    match chain.get(tip) {
        Some(entry) => entry.chain_work >= params.minimum_chain_work.to_biguint(),
        None => false,
    }
}

/// Refuses to unwind more than `max_reorganization_depth` blocks below the
/// current tip.
pub fn check_reorganization_depth(
    tip_height: u32,
    fork_height: u32,
    params: &ConsensusParams,
) -> Result<(), ConsensusError> {
    let depth = tip_height.saturating_sub(fork_height);
    if depth > params.max_reorganization_depth {
        warn!(
            tip_height,
            fork_height,
            max = params.max_reorganization_depth,
            "refusing deep reorganization"
        );
        return Err(ConsensusError::reject(
            ErrorCode::ReorgTooDeep,
            "reorganization deeper than allowed",
        ));
    }
    Ok(())
}
