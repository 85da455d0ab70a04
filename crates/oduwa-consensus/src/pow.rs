use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;

use crate::chain::{BlockId, ChainIndex, ProofType};
use crate::compact::{decode_compact, encode_compact};
use crate::error::{ConsensusError, ErrorCode};
use crate::params::{ConsensusParams, RETARGET_CLAMP_POLICY_HEIGHT};
use crate::uint256::Uint256;

/// Difficulty ceiling for a proof type. Takes the block time so the limit can
/// change over time; the current rules ignore it.
fn target_limit(_time: i64, params: &ConsensusParams, proof: ProofType) -> BigUint {
    match proof {
        ProofType::Stake => params.pos_limit.to_biguint(),
        ProofType::Work => params.pow_limit.to_biguint(),
    }
}

/// Most recent block of `proof` type at or before `from`. Stops at genesis, so
/// the result is genesis when no such block exists.
pub fn last_block_index(
    chain: &ChainIndex,
    from: Option<BlockId>,
    proof: ProofType,
) -> Option<BlockId> {
    let mut cur = from?;
    loop {
        let entry = chain.get(cur)?;
        match entry.prev {
            Some(prev) if entry.proof != proof => cur = prev,
            _ => return Some(cur),
        }
    }
}

/// Compact target the block after `last` must declare.
///
/// The two most recent blocks of the requested proof type drive an
/// exponential moving average toward the target spacing. `candidate_time` is
/// accepted for time-based limits and does not affect the current rules.
pub fn next_target_required(
    chain: &ChainIndex,
    last: Option<BlockId>,
    candidate_time: i64,
    params: &ConsensusParams,
    proof: ProofType,
) -> u32 {
    let genesis_target = encode_compact(&params.pow_limit.to_biguint());
    let Some(last_entry) = last.and_then(|id| chain.get(id)) else {
        return genesis_target;
    };
    let limit = target_limit(candidate_time, params, proof);

    let Some(prev) = last_block_index(chain, last, proof).and_then(|id| chain.get(id)) else {
        return encode_compact(&limit);
    };
    if prev.prev.is_none() {
        return encode_compact(&limit); // first block
    }
    let Some(prev_prev) = last_block_index(chain, prev.prev, proof).and_then(|id| chain.get(id))
    else {
        return encode_compact(&limit);
    };
    if prev_prev.prev.is_none() {
        return encode_compact(&limit); // second block
    }

    let height = last_entry.height;
    let target_spacing = params.target_spacing_at(height.saturating_add(1));
    let mut actual_spacing = prev.block_time() - prev_prev.block_time();

    // Historical chain continuity: below the policy height a negative spacing
    // is replaced by the target spacing before filtering.
    if height < RETARGET_CLAMP_POLICY_HEIGHT && actual_spacing < 0 {
        actual_spacing = target_spacing;
    }

    let interval = params.target_timespan / target_spacing;
    let numerator = (interval - 1) * target_spacing + actual_spacing + actual_spacing;
    let denominator = (interval + 1) * target_spacing;

    let prev_target = BigInt::from_biguint(Sign::Plus, decode_compact(prev.bits).target);
    let filtered = prev_target * BigInt::from(numerator) / BigInt::from(denominator);
    let limit_signed = BigInt::from_biguint(Sign::Plus, limit.clone());

    let new_target = if height < RETARGET_CLAMP_POLICY_HEIGHT {
        if filtered > limit_signed {
            limit
        } else {
            filtered.to_biguint().unwrap_or_default()
        }
    } else if filtered.sign() != Sign::Plus || filtered > limit_signed {
        limit
    } else {
        filtered.to_biguint().unwrap_or_default()
    };

    encode_compact(&new_target)
}

/// Whether `hash` satisfies the declared compact target.
pub fn check_proof_of_work(hash: &Uint256, bits: u32, params: &ConsensusParams) -> bool {
    pow_check(hash, bits, params).is_ok()
}

pub fn pow_check(hash: &Uint256, bits: u32, params: &ConsensusParams) -> Result<(), ConsensusError> {
    let decoded = decode_compact(bits);
    if decoded.negative
        || decoded.overflow
        || decoded.target.is_zero()
        || decoded.target > params.pow_limit.to_biguint()
    {
        return Err(ConsensusError::reject(
            ErrorCode::BadDiffBits,
            "target out of range",
        ));
    }
    if hash.to_biguint() > decoded.target {
        return Err(ConsensusError::reject(
            ErrorCode::HighHash,
            "proof of work above target",
        ));
    }
    Ok(())
}

/// Compares a header's declared bits with the retarget result.
pub fn check_declared_bits(
    chain: &ChainIndex,
    last: Option<BlockId>,
    candidate_time: i64,
    declared_bits: u32,
    params: &ConsensusParams,
    proof: ProofType,
) -> Result<(), ConsensusError> {
    let expected = next_target_required(chain, last, candidate_time, params, proof);
    if declared_bits != expected {
        return Err(ConsensusError::reject(
            ErrorCode::BadDiffBits,
            "incorrect difficulty bits",
        ));
    }
    Ok(())
}
