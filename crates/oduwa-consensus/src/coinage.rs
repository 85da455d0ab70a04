use num_bigint::BigUint;
use num_traits::ToPrimitive;

use crate::block::Block;
use crate::chain::ChainIndex;
use crate::coins::CoinsView;
use crate::error::{ConsensusError, ErrorCode};
use crate::params::{ConsensusParams, CENT, COIN};
use crate::tx::Transaction;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Seconds of age an output has accumulated between `begin` and `end`.
///
/// The first `stake_min_age` seconds do not count and the result never exceeds
/// `stake_max_age`, so very old outputs stop gaining weight.
pub fn coin_age_weight(begin: i64, end: i64, params: &ConsensusParams) -> i64 {
    end.saturating_sub(begin)
        .saturating_sub(params.stake_min_age)
        .clamp(0, params.stake_max_age)
}

/// Coin-days destroyed by `tx`. Inputs that cannot be resolved or are younger
/// than `stake_min_age` contribute nothing.
pub fn tx_coin_age(
    chain: &ChainIndex,
    coins: &impl CoinsView,
    tx: &Transaction,
    params: &ConsensusParams,
) -> Result<u64, ConsensusError> {
    if tx.is_coinbase() {
        return Ok(0);
    }

    let mut cent_seconds = BigUint::default();
    for txin in &tx.vin {
        let Some(prev) = coins.previous_tx(&txin.prevout.txid) else {
            continue;
        };
        if tx.time < prev.tx.time {
            return Err(ConsensusError::reject(
                ErrorCode::StakeTimeViolation,
                "transaction timestamp earlier than input",
            ));
        }
        let Ok(block) = prev.block(chain) else {
            continue;
        };
        if block.block_time() + params.stake_min_age > i64::from(tx.time) {
            continue;
        }
        let value = prev.output(txin.prevout.n)?.value.max(0) as u64;
        let weight = coin_age_weight(i64::from(prev.tx.time), i64::from(tx.time), params) as u64;
        cent_seconds += BigUint::from(value) * BigUint::from(weight) / BigUint::from(CENT as u64);
    }

    let coin_days = cent_seconds * BigUint::from(CENT as u64)
        / BigUint::from(COIN as u64)
        / BigUint::from(SECONDS_PER_DAY);
    coin_days
        .to_u64()
        .ok_or_else(|| ConsensusError::Internal("coin age exceeds u64".to_string()))
}

/// Total coin age spent by every transaction in `block`.
pub fn block_coin_age(
    chain: &ChainIndex,
    coins: &impl CoinsView,
    block: &Block,
    params: &ConsensusParams,
) -> Result<u64, ConsensusError> {
    block.vtx.iter().try_fold(0u64, |total, tx| {
        let age = tx_coin_age(chain, coins, tx, params)?;
        total
            .checked_add(age)
            .ok_or_else(|| ConsensusError::Internal("block coin age overflow".to_string()))
    })
}
