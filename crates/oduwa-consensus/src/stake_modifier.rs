//! Stake modifier generation.
//!
//! The modifier scrambles the kernel hash so a staker cannot precompute future
//! proofs when the output is confirmed. A new modifier is generated once per
//! `modifier_interval`: 64 blocks are picked from a trailing window split into
//! 64 sections, and each contributes its entropy bit.

use std::collections::HashSet;

use num_bigint::BigUint;
use tracing::{debug, error};

use crate::chain::{BlockId, BlockIndex, ChainIndex};
use crate::error::ConsensusError;
use crate::hash::hash256;
use crate::params::{ConsensusParams, MODIFIER_INTERVAL_RATIO};
use crate::uint256::Uint256;

const SECTIONS: i64 = 64;

pub const FLAG_PROOF_OF_STAKE: u32 = 1 << 0;
pub const FLAG_STAKE_ENTROPY: u32 = 1 << 1;
pub const FLAG_STAKE_MODIFIER: u32 = 1 << 2;

/// Length of selection section `section` (0..64). Sections grow from
/// `interval * 63 / (63 + 63 * (RATIO - 1))` up to `interval`.
pub fn selection_interval_section(section: i64, params: &ConsensusParams) -> i64 {
    params.modifier_interval * 63 / (63 + ((63 - section) * (MODIFIER_INTERVAL_RATIO - 1)))
}

/// Total length of the trailing window the 64 rounds sample from.
pub fn selection_interval(params: &ConsensusParams) -> i64 {
    (0..SECTIONS)
        .map(|section| selection_interval_section(section, params))
        .sum()
}

fn internal(msg: impl Into<String>) -> ConsensusError {
    ConsensusError::Internal(msg.into())
}

/// Most recent generated modifier at or before `from`, with its block time.
fn last_stake_modifier(
    chain: &ChainIndex,
    from: BlockId,
) -> Result<(u64, i64), ConsensusError> {
    let mut entry = chain
        .get(from)
        .ok_or_else(|| internal("modifier walk started outside the index"))?;
    while !entry.generated_stake_modifier {
        let Some(prev) = entry.prev.and_then(|id| chain.get(id)) else {
            break;
        };
        entry = prev;
    }
    if !entry.generated_stake_modifier {
        return Err(internal("no stake modifier generated at genesis"));
    }
    Ok((entry.stake_modifier, entry.block_time()))
}

fn selection_hash(entry: &BlockIndex, prev_modifier: u64) -> BigUint {
    let mut buf = Vec::with_capacity(40);
    buf.extend_from_slice(entry.hash_proof.as_bytes());
    buf.extend_from_slice(&prev_modifier.to_le_bytes());
    let hash = hash256(&buf).to_biguint();
    // Stake blocks are favoured over work blocks.
    if entry.is_proof_of_stake() {
        hash >> 32usize
    } else {
        hash
    }
}

/// Lowest selection hash among candidates up to `stop`. The first unselected
/// candidate is always eligible even when it lies past `stop`.
fn select_block<'a>(
    chain: &'a ChainIndex,
    sorted: &[(i64, Uint256)],
    selected: &HashSet<Uint256>,
    stop: i64,
    prev_modifier: u64,
) -> Result<&'a BlockIndex, ConsensusError> {
    let mut best: Option<(BigUint, &BlockIndex)> = None;
    for (_, hash) in sorted {
        let entry = chain
            .lookup_entry(hash)
            .ok_or_else(|| internal(format!("selection candidate {hash} not indexed")))?;
        if best.is_some() && entry.block_time() > stop {
            break;
        }
        if selected.contains(&entry.hash) {
            continue;
        }
        let h = selection_hash(entry, prev_modifier);
        if best.as_ref().map_or(true, |(best_hash, _)| h < *best_hash) {
            best = Some((h, entry));
        }
    }
    best.map(|(_, entry)| entry)
        .ok_or_else(|| internal("no block available for stake modifier selection"))
}

/// Modifier for the block following `prev`, and whether it is freshly
/// generated. Without a previous block the modifier is 0.
///
/// Blocks must be processed in height order: the result depends on the
/// modifiers already stored on the ancestors of `prev`.
pub fn compute_next_stake_modifier(
    chain: &ChainIndex,
    prev: Option<BlockId>,
    params: &ConsensusParams,
) -> Result<(u64, bool), ConsensusError> {
    let Some(prev_id) = prev else {
        return Ok((0, true));
    };
    let prev_entry = chain
        .get(prev_id)
        .ok_or_else(|| internal("previous block not indexed"))?;

    let interval = params.modifier_interval;
    let (modifier, modifier_time) = last_stake_modifier(chain, prev_id)?;
    if modifier_time / interval >= prev_entry.block_time() / interval {
        return Ok((modifier, false));
    }

    let selection_start =
        (prev_entry.block_time() / interval) * interval - selection_interval(params);
    let mut sorted: Vec<(i64, Uint256)> = chain
        .ancestors(prev_id)
        .take_while(|(_, e)| e.block_time() >= selection_start)
        .map(|(_, e)| (e.block_time(), e.hash))
        .collect();
    sorted.sort();

    let rounds = sorted.len().min(SECTIONS as usize);
    let mut new_modifier: u64 = 0;
    let mut stop = selection_start;
    let mut selected = HashSet::with_capacity(rounds);
    for round in 0..rounds {
        stop += selection_interval_section(round as i64, params);
        let entry = select_block(chain, &sorted, &selected, stop, modifier)?;
        new_modifier |= entry.stake_entropy_bit() << round;
        selected.insert(entry.hash);
    }

    debug!(
        height = prev_entry.height + 1,
        modifier = format_args!("{new_modifier:016x}"),
        selected = rounds,
        "generated stake modifier"
    );
    Ok((new_modifier, true))
}

/// Rolling checksum over the modifier history, for the block `entry`.
pub fn stake_modifier_checksum(chain: &ChainIndex, entry: &BlockIndex) -> u32 {
    let prev_checksum = entry
        .prev
        .and_then(|id| chain.get(id))
        .map_or(0, |p| p.stake_modifier_checksum);

    let mut flags = 0u32;
    if entry.is_proof_of_stake() {
        flags |= FLAG_PROOF_OF_STAKE;
    }
    if entry.stake_entropy_bit() != 0 {
        flags |= FLAG_STAKE_ENTROPY;
    }
    if entry.generated_stake_modifier {
        flags |= FLAG_STAKE_MODIFIER;
    }

    let mut buf = Vec::with_capacity(48);
    buf.extend_from_slice(&prev_checksum.to_le_bytes());
    buf.extend_from_slice(&flags.to_le_bytes());
    buf.extend_from_slice(entry.hash_proof.as_bytes());
    buf.extend_from_slice(&entry.stake_modifier.to_le_bytes());
    let digest = hash256(&buf);
    // Top 32 bits of the numeric value.
    let b = digest.as_bytes();
    u32::from_le_bytes([b[28], b[29], b[30], b[31]])
}

/// Compares a checksum against the hard-coded table. Heights without an entry
/// always pass.
pub fn check_stake_modifier_checkpoints(
    height: u32,
    checksum: u32,
    params: &ConsensusParams,
) -> Result<(), ConsensusError> {
    match params.stake_modifier_checkpoints.get(&height) {
        Some(&expected) if expected != checksum => {
            error!(
                height,
                checksum = format_args!("{checksum:08x}"),
                expected = format_args!("{expected:08x}"),
                "stake modifier checksum diverged"
            );
            Err(internal(format!(
                "stake modifier checksum {checksum:08x} at height {height}, expected {expected:08x}"
            )))
        }
        _ => Ok(()),
    }
}
