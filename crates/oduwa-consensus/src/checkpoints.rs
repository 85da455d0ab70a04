use tracing::warn;

use crate::chain::{BlockId, ChainIndex};
use crate::error::{ConsensusError, ErrorCode};
use crate::params::CheckpointData;
use crate::uint256::Uint256;

/// Heights without a checkpoint always pass.
pub fn check_against_checkpoints(height: u32, hash: &Uint256, data: &CheckpointData) -> bool {
    match data.checkpoints.get(&height) {
        Some(expected) if expected != hash => {
            warn!(height, %hash, %expected, "block does not match checkpoint");
            false
        }
        _ => true,
    }
}

pub fn checkpoint_check(
    height: u32,
    hash: &Uint256,
    data: &CheckpointData,
) -> Result<(), ConsensusError> {
    if !check_against_checkpoints(height, hash, data) {
        return Err(ConsensusError::reject(
            ErrorCode::CheckpointMismatch,
            "block hash differs from checkpoint",
        ));
    }
    Ok(())
}

/// Highest checkpoint whose block is already indexed.
pub fn last_checkpoint(chain: &ChainIndex, data: &CheckpointData) -> Option<BlockId> {
    data.checkpoints
        .values()
        .rev()
        .find_map(|hash| chain.lookup(hash))
}

/// Rough fraction of the chain `tip` has verified, from 0.0 to 1.0.
///
/// Transactions up to the last checkpoint count as cheap, later ones as five
/// times more expensive when `sigchecks` is set. Work still ahead is
/// extrapolated from `transactions_per_day` up to `now`.
pub fn guess_verification_progress(
    data: &CheckpointData,
    chain: &ChainIndex,
    tip: Option<BlockId>,
    now: i64,
    sigchecks: bool,
) -> f64 {
    let Some(tip) = tip.and_then(|id| chain.get(id)) else {
        return 0.0;
    };
    let factor = if sigchecks { 5.0 } else { 1.0 };
    let chain_tx = tip.chain_tx as f64;
    let last_tx = data.transactions_last_checkpoint as f64;

    let (before, after) = if tip.chain_tx <= data.transactions_last_checkpoint {
        let expensive_after =
            (now - data.time_last_checkpoint) as f64 / 86400.0 * data.transactions_per_day;
        (chain_tx, last_tx - chain_tx + expensive_after * factor)
    } else {
        let expensive_after =
            (now - tip.block_time()) as f64 / 86400.0 * data.transactions_per_day;
        (
            last_tx + (chain_tx - last_tx) * factor,
            expensive_after * factor,
        )
    };
    if before + after <= 0.0 {
        return 0.0;
    }
    before / (before + after)
}
