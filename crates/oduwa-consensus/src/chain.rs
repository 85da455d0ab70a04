//! Append-only arena of validated block index entries.
//!
//! Entries refer to their parent by [`BlockId`]; the arena owns every entry
//! and the link is only ever used for lookups.

use std::collections::HashMap;

use num_bigint::BigUint;

use crate::error::{ConsensusError, ErrorCode};
use crate::fork_choice::block_proof;
use crate::uint256::Uint256;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(usize);

impl BlockId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProofType {
    Work,
    Stake,
}

pub const MEDIAN_TIME_SPAN: usize = 11;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockIndex {
    pub hash: Uint256,
    pub prev: Option<BlockId>,
    pub height: u32,
    pub version: i32,
    pub time: u32,
    pub bits: u32,
    pub proof: ProofType,
    /// PoW hash for work blocks, kernel hash for stake blocks.
    pub hash_proof: Uint256,
    pub stake_modifier: u64,
    pub generated_stake_modifier: bool,
    pub stake_modifier_checksum: u32,
    /// Transactions from genesis up to and including this block.
    pub chain_tx: u64,
    /// Filled in by [`ChainIndex::insert`].
    pub chain_work: BigUint,
}

impl BlockIndex {
    pub fn new(hash: Uint256, height: u32, time: u32, bits: u32, proof: ProofType) -> Self {
        Self {
            hash,
            prev: None,
            height,
            version: 1,
            time,
            bits,
            proof,
            hash_proof: hash,
            stake_modifier: 0,
            generated_stake_modifier: false,
            stake_modifier_checksum: 0,
            chain_tx: 0,
            chain_work: BigUint::default(),
        }
    }

    pub fn block_time(&self) -> i64 {
        self.time as i64
    }

    pub fn is_proof_of_stake(&self) -> bool {
        self.proof == ProofType::Stake
    }

    pub fn is_proof_of_work(&self) -> bool {
        self.proof == ProofType::Work
    }

    /// Entropy bit this block contributes when picked for a stake modifier.
    pub fn stake_entropy_bit(&self) -> u64 {
        self.hash.low_u64() & 1
    }
}

#[derive(Clone, Debug, Default)]
pub struct ChainIndex {
    entries: Vec<BlockIndex>,
    by_hash: HashMap<Uint256, BlockId>,
}

impl ChainIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry. Its `prev` must already be indexed (or be `None` for
    /// the genesis entry) and its height must follow the parent's.
    pub fn insert(&mut self, mut entry: BlockIndex) -> Result<BlockId, ConsensusError> {
        if self.by_hash.contains_key(&entry.hash) {
            return Err(ConsensusError::reject(
                ErrorCode::ChainLinkInvalid,
                "block already indexed",
            ));
        }
        let parent_work = match entry.prev {
            Some(prev) => {
                let parent = self.get(prev).ok_or(ConsensusError::reject(
                    ErrorCode::ChainLinkInvalid,
                    "parent not indexed",
                ))?;
                if parent.height.checked_add(1) != Some(entry.height) {
                    return Err(ConsensusError::reject(
                        ErrorCode::ChainLinkInvalid,
                        "height does not follow parent",
                    ));
                }
                parent.chain_work.clone()
            }
            None => {
                if entry.height != 0 {
                    return Err(ConsensusError::reject(
                        ErrorCode::ChainLinkInvalid,
                        "parentless entry above height 0",
                    ));
                }
                BigUint::default()
            }
        };
        entry.chain_work = parent_work + block_proof(entry.bits);

        let id = BlockId(self.entries.len());
        self.by_hash.insert(entry.hash, id);
        self.entries.push(entry);
        Ok(id)
    }

    pub fn get(&self, id: BlockId) -> Option<&BlockIndex> {
        self.entries.get(id.0)
    }

    pub fn lookup(&self, hash: &Uint256) -> Option<BlockId> {
        self.by_hash.get(hash).copied()
    }

    pub fn lookup_entry(&self, hash: &Uint256) -> Option<&BlockIndex> {
        self.lookup(hash).and_then(|id| self.get(id))
    }

    pub fn prev(&self, id: BlockId) -> Option<BlockId> {
        self.get(id).and_then(|e| e.prev)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recently appended entry.
    pub fn last(&self) -> Option<BlockId> {
        self.entries.len().checked_sub(1).map(BlockId)
    }

    /// Walks `id` and its ancestors back to genesis.
    pub fn ancestors(&self, id: BlockId) -> Ancestors<'_> {
        Ancestors {
            chain: self,
            next: self.get(id).map(|_| id),
        }
    }

    pub fn ancestor(&self, id: BlockId, height: u32) -> Option<BlockId> {
        let start = self.get(id)?;
        if height > start.height {
            return None;
        }
        self.ancestors(id)
            .find(|(_, e)| e.height == height)
            .map(|(aid, _)| aid)
    }

    /// Median of the last [`MEDIAN_TIME_SPAN`] block times ending at `id`.
    pub fn median_time_past(&self, id: BlockId) -> i64 {
        let mut times: Vec<i64> = self
            .ancestors(id)
            .take(MEDIAN_TIME_SPAN)
            .map(|(_, e)| e.block_time())
            .collect();
        if times.is_empty() {
            return 0;
        }
        times.sort_unstable();
        times[times.len() / 2]
    }
}

pub struct Ancestors<'a> {
    chain: &'a ChainIndex,
    next: Option<BlockId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = (BlockId, &'a BlockIndex);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let entry = self.chain.get(id)?;
        self.next = entry.prev;
        Some((id, entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash256;

    fn entry(seed: u32, prev: Option<BlockId>, height: u32, time: u32) -> BlockIndex {
        let mut e = BlockIndex::new(
            hash256(&seed.to_le_bytes()),
            height,
            time,
            0x1e0f_ffff,
            ProofType::Work,
        );
        e.prev = prev;
        e
    }

    #[test]
    fn insert_links_and_accumulates_work() {
        let mut chain = ChainIndex::new();
        let g = chain.insert(entry(0, None, 0, 100)).expect("genesis");
        let b1 = chain.insert(entry(1, Some(g), 1, 160)).expect("b1");
        assert_eq!(chain.prev(b1), Some(g));
        let w0 = chain.get(g).expect("g").chain_work.clone();
        let w1 = chain.get(b1).expect("b1").chain_work.clone();
        assert_eq!(w1, &w0 + &w0);
        assert_eq!(chain.lookup(&hash256(&1u32.to_le_bytes())), Some(b1));
    }

    #[test]
    fn insert_rejects_bad_links() {
        let mut chain = ChainIndex::new();
        let err = chain.insert(entry(0, None, 3, 100)).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ChainLinkInvalid));

        let g = chain.insert(entry(0, None, 0, 100)).expect("genesis");
        let err = chain.insert(entry(1, Some(g), 2, 100)).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ChainLinkInvalid));

        let err = chain.insert(entry(0, Some(g), 1, 100)).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ChainLinkInvalid));
    }

    #[test]
    fn ancestor_and_median_time() {
        let mut chain = ChainIndex::new();
        let mut prev = None;
        let mut ids = Vec::new();
        for i in 0..15u32 {
            let id = chain
                .insert(entry(i, prev, i, 1000 + i * 10))
                .expect("insert");
            ids.push(id);
            prev = Some(id);
        }
        let tip = ids[14];
        assert_eq!(chain.ancestor(tip, 3), Some(ids[3]));
        assert_eq!(chain.ancestor(tip, 15), None);
        // last 11 times are 1040..=1140, median 1090
        assert_eq!(chain.median_time_past(tip), 1090);
        assert_eq!(chain.ancestors(tip).count(), 15);
    }
}
