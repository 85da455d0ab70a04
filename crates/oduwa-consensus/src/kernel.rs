//! Proof-of-stake kernel test.
//!
//! A staker proves the right to mint by finding a timestamp at which
//! `hash(modifier, output coordinates, time)` falls under a target scaled by
//! the output's value and age. Timestamps are restricted by
//! `stake_timestamp_mask`, so the search space is one candidate per mask tick.

use std::collections::HashMap;

use num_bigint::BigUint;
use tracing::debug;

use crate::chain::{BlockId, BlockIndex, ChainIndex};
use crate::coinage::coin_age_weight;
use crate::coins::{CoinsView, PrevTx, SignatureVerifier, VERIFY_NONE};
use crate::compact::decode_compact;
use crate::error::{ConsensusError, ErrorCode};
use crate::params::{ConsensusParams, COIN};
use crate::tx::{OutPoint, Transaction};
use crate::uint256::Uint256;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Previous outputs resolved during one staking attempt, keyed by outpoint.
/// A cache is only valid for the tip it was filled against.
pub type StakeCache = HashMap<OutPoint, PrevTx>;

/// Everything the kernel hash commits to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KernelInput {
    pub stake_modifier: u64,
    pub block_from_time: u32,
    pub tx_prev_time: u32,
    pub prevout: OutPoint,
    pub time: u32,
}

impl KernelInput {
    pub fn to_bytes(&self) -> [u8; 56] {
        let mut out = [0u8; 56];
        out[0..8].copy_from_slice(&self.stake_modifier.to_le_bytes());
        out[8..12].copy_from_slice(&self.block_from_time.to_le_bytes());
        out[12..16].copy_from_slice(&self.tx_prev_time.to_le_bytes());
        out[16..48].copy_from_slice(self.prevout.txid.as_bytes());
        out[48..52].copy_from_slice(&self.prevout.n.to_le_bytes());
        out[52..56].copy_from_slice(&self.time.to_le_bytes());
        out
    }

    pub fn hash(&self) -> Uint256 {
        crate::hash::hash256(&self.to_bytes())
    }
}

/// A kernel that met its target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernelProof {
    pub hash: Uint256,
    pub time: u32,
}

fn reject(code: ErrorCode, msg: &'static str) -> ConsensusError {
    ConsensusError::reject(code, msg)
}

fn prev_entry(chain: &ChainIndex, prev: BlockId) -> Result<&BlockIndex, ConsensusError> {
    chain
        .get(prev)
        .ok_or_else(|| ConsensusError::Internal("kernel checked against unindexed tip".into()))
}

pub fn check_coinstake_timestamp(
    block_time: i64,
    tx_time: i64,
    params: &ConsensusParams,
) -> Result<(), ConsensusError> {
    if block_time != tx_time {
        return Err(reject(
            ErrorCode::CoinstakeTimestampMismatch,
            "coinstake time differs from block time",
        ));
    }
    if tx_time & i64::from(params.stake_timestamp_mask) != 0 {
        return Err(reject(
            ErrorCode::TimestampMaskViolation,
            "coinstake time off mask boundary",
        ));
    }
    Ok(())
}

pub fn check_stake_block_timestamp(
    block_time: i64,
    params: &ConsensusParams,
) -> Result<(), ConsensusError> {
    check_coinstake_timestamp(block_time, block_time, params)
}

/// Coinbase and coinstake outputs must be buried `coinbase_maturity` blocks
/// below the candidate.
fn check_maturity(
    prev: &BlockIndex,
    block_from: &BlockIndex,
    tx_prev: &Transaction,
    params: &ConsensusParams,
) -> Result<(), ConsensusError> {
    if !(tx_prev.is_coinbase() || tx_prev.is_coinstake()) {
        return Ok(());
    }
    let depth = i64::from(prev.height) + 1 - i64::from(block_from.height);
    if depth < i64::from(params.coinbase_maturity) {
        return Err(reject(
            ErrorCode::InsufficientMaturity,
            "staked output not mature",
        ));
    }
    Ok(())
}

/// Runs the kernel test for spending `prevout` of `tx_prev` in a block on top
/// of `prev` at `time`.
///
/// Mask, ordering, age and maturity are checked before anything is hashed.
/// On success the kernel hash is returned as the block's proof hash.
pub fn check_stake_kernel_hash(
    chain: &ChainIndex,
    prev: BlockId,
    bits: u32,
    tx_prev: &PrevTx,
    prevout: &OutPoint,
    time: u32,
    params: &ConsensusParams,
) -> Result<KernelProof, ConsensusError> {
    if time & params.stake_timestamp_mask != 0 {
        return Err(reject(
            ErrorCode::TimestampMaskViolation,
            "kernel time off mask boundary",
        ));
    }
    let prev = prev_entry(chain, prev)?;
    let tx_prev_time = tx_prev.tx.time;
    if time < tx_prev_time {
        return Err(reject(
            ErrorCode::StakeTimeViolation,
            "kernel time earlier than previous transaction",
        ));
    }
    let block_from = tx_prev.block(chain)?;
    if block_from.block_time() + params.stake_min_age > i64::from(time) {
        return Err(reject(ErrorCode::StakeTooYoung, "staked output below min age"));
    }
    check_maturity(prev, block_from, &tx_prev.tx, params)?;

    let value = tx_prev.output(prevout.n)?.value.max(0) as u64;
    let decoded = decode_compact(bits);
    if !decoded.is_usable() {
        return Err(reject(ErrorCode::BadDiffBits, "unusable stake target"));
    }
    let weight = coin_age_weight(i64::from(tx_prev_time), i64::from(time), params) as u64;
    let target = decoded.target * BigUint::from(value) * BigUint::from(weight)
        / BigUint::from(COIN as u64)
        / BigUint::from(SECONDS_PER_DAY);

    let input = KernelInput {
        stake_modifier: prev.stake_modifier,
        block_from_time: block_from.time,
        tx_prev_time,
        prevout: *prevout,
        time,
    };
    let hash = input.hash();
    if hash.to_biguint() > target {
        return Err(reject(ErrorCode::KernelHashTooHigh, "kernel hash above target"));
    }

    debug!(
        height = prev.height + 1,
        modifier = format_args!("{:016x}", input.stake_modifier),
        prevout = %prevout.txid,
        n = prevout.n,
        time,
        hash = %hash,
        "kernel accepted"
    );
    Ok(KernelProof { hash, time })
}

/// Resolves `prevout` into `cache`, checking maturity once for the whole
/// search. Already cached outputs are left alone.
pub fn cache_kernel(
    cache: &mut StakeCache,
    chain: &ChainIndex,
    prev: BlockId,
    prevout: &OutPoint,
    coins: &impl CoinsView,
    params: &ConsensusParams,
) -> Result<(), ConsensusError> {
    if cache.contains_key(prevout) {
        return Ok(());
    }
    let tx_prev = coins.resolve(prevout)?;
    tx_prev.output(prevout.n)?;
    let block_from = tx_prev.block(chain)?;
    check_maturity(prev_entry(chain, prev)?, block_from, &tx_prev.tx, params)?;
    cache.insert(*prevout, tx_prev);
    Ok(())
}

/// Kernel test for `prevout` at `time`, using and filling `cache` when given.
#[allow(clippy::too_many_arguments)]
pub fn check_kernel_with(
    chain: &ChainIndex,
    prev: BlockId,
    bits: u32,
    time: u32,
    prevout: &OutPoint,
    coins: &impl CoinsView,
    cache: Option<&mut StakeCache>,
    params: &ConsensusParams,
) -> Result<KernelProof, ConsensusError> {
    match cache {
        Some(cache) => {
            cache_kernel(cache, chain, prev, prevout, coins, params)?;
            let tx_prev = cache.get(prevout).ok_or_else(|| {
                ConsensusError::Internal("stake cache lost a resolved output".into())
            })?;
            check_stake_kernel_hash(chain, prev, bits, tx_prev, prevout, time, params)
        }
        None => {
            let tx_prev = coins.resolve(prevout)?;
            check_stake_kernel_hash(chain, prev, bits, &tx_prev, prevout, time, params)
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn check_kernel(
    chain: &ChainIndex,
    prev: BlockId,
    bits: u32,
    time: u32,
    prevout: &OutPoint,
    coins: &impl CoinsView,
    cache: Option<&mut StakeCache>,
    params: &ConsensusParams,
) -> bool {
    check_kernel_with(chain, prev, bits, time, prevout, coins, cache, params).is_ok()
}

/// Block-level check of a coinstake: the spent output must exist, the
/// signature must authorize spending it, and its kernel must meet the target
/// at the transaction's own time.
pub fn check_proof_of_stake(
    chain: &ChainIndex,
    prev: BlockId,
    tx: &Transaction,
    bits: u32,
    coins: &impl CoinsView,
    verifier: &impl SignatureVerifier,
    params: &ConsensusParams,
) -> Result<KernelProof, ConsensusError> {
    if !tx.is_coinstake() {
        return Err(reject(ErrorCode::NotCoinstake, "not a coinstake"));
    }
    let txin = &tx.vin[0];
    let tx_prev = coins.resolve(&txin.prevout)?;
    if !verifier.verify_signature(&tx_prev.tx, tx, 0, VERIFY_NONE, 0) {
        return Err(reject(
            ErrorCode::InvalidSignature,
            "coinstake signature does not verify",
        ));
    }
    check_stake_kernel_hash(chain, prev, bits, &tx_prev, &txin.prevout, tx.time, params)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KernelState {
    Pending,
    Accepted(KernelProof),
    Rejected(ErrorCode),
}

/// One staking attempt for one output on one tip.
///
/// Each candidate time either accepts, leaves the search pending (the failure
/// depends on the time), or ends it (the output can never stake on this tip).
#[derive(Debug)]
pub struct KernelSearch {
    prev: BlockId,
    bits: u32,
    prevout: OutPoint,
    cache: StakeCache,
    state: KernelState,
}

impl KernelSearch {
    pub fn new(prev: BlockId, bits: u32, prevout: OutPoint) -> Self {
        Self {
            prev,
            bits,
            prevout,
            cache: StakeCache::new(),
            state: KernelState::Pending,
        }
    }

    pub fn state(&self) -> &KernelState {
        &self.state
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self.state, KernelState::Pending)
    }

    /// Tries `time`. Calls after the search finished return the final state.
    pub fn try_time(
        &mut self,
        chain: &ChainIndex,
        coins: &impl CoinsView,
        time: u32,
        params: &ConsensusParams,
    ) -> Result<&KernelState, ConsensusError> {
        if self.is_finished() {
            return Ok(&self.state);
        }
        let outcome = check_kernel_with(
            chain,
            self.prev,
            self.bits,
            time,
            &self.prevout,
            coins,
            Some(&mut self.cache),
            params,
        );
        match outcome {
            Ok(proof) => self.state = KernelState::Accepted(proof),
            Err(ConsensusError::Reject { code, .. }) => {
                if !is_time_dependent(code) {
                    self.state = KernelState::Rejected(code);
                }
            }
            Err(e) => return Err(e),
        }
        Ok(&self.state)
    }

    /// Walks mask-aligned times from `from` to `to` inclusive until the search
    /// finishes.
    pub fn search(
        &mut self,
        chain: &ChainIndex,
        coins: &impl CoinsView,
        from: u32,
        to: u32,
        params: &ConsensusParams,
    ) -> Result<&KernelState, ConsensusError> {
        let step = params.stake_timestamp_mask + 1;
        let mask = params.stake_timestamp_mask;
        let Some(first) = from.checked_add(mask) else {
            return Ok(&self.state);
        };
        let mut time = first & !mask;
        while time <= to && !self.is_finished() {
            self.try_time(chain, coins, time, params)?;
            match time.checked_add(step) {
                Some(next) => time = next,
                None => break,
            }
        }
        Ok(&self.state)
    }
}

fn is_time_dependent(code: ErrorCode) -> bool {
    matches!(
        code,
        ErrorCode::TimestampMaskViolation
            | ErrorCode::KernelHashTooHigh
            | ErrorCode::StakeTooYoung
            | ErrorCode::StakeTimeViolation
    )
}
