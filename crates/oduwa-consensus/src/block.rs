use crate::error::{ConsensusError, ErrorCode};
use crate::hash::scrypt_1024_1_1;
use crate::merkle::block_merkle_root;
use crate::tx::Transaction;
use crate::uint256::Uint256;

pub const BLOCK_HEADER_BYTES: usize = 80;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub version: i32,
    pub prev_block: Uint256,
    pub merkle_root: Uint256,
    pub time: u32,
    pub bits: u32,
    pub nonce: u32,
}

impl BlockHeader {
    pub fn to_bytes(&self) -> [u8; BLOCK_HEADER_BYTES] {
        let mut out = [0u8; BLOCK_HEADER_BYTES];
        out[0..4].copy_from_slice(&self.version.to_le_bytes());
        out[4..36].copy_from_slice(self.prev_block.as_bytes());
        out[36..68].copy_from_slice(self.merkle_root.as_bytes());
        out[68..72].copy_from_slice(&self.time.to_le_bytes());
        out[72..76].copy_from_slice(&self.bits.to_le_bytes());
        out[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        out
    }

    pub fn from_bytes(b: &[u8]) -> Result<BlockHeader, ConsensusError> {
        if b.len() != BLOCK_HEADER_BYTES {
            return Err(ConsensusError::reject(
                ErrorCode::Parse,
                "block header length mismatch",
            ));
        }
        let word = |at: usize| u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]]);
        let mut prev_block = [0u8; 32];
        prev_block.copy_from_slice(&b[4..36]);
        let mut merkle_root = [0u8; 32];
        merkle_root.copy_from_slice(&b[36..68]);
        Ok(BlockHeader {
            version: word(0) as i32,
            prev_block: Uint256(prev_block),
            merkle_root: Uint256(merkle_root),
            time: word(68),
            bits: word(72),
            nonce: word(76),
        })
    }

    /// Block identity hash, which is also the proof-of-work hash.
    pub fn hash(&self) -> Result<Uint256, ConsensusError> {
        scrypt_1024_1_1(&self.to_bytes())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub vtx: Vec<Transaction>,
    pub signature: Vec<u8>,
}

impl Block {
    pub fn hash(&self) -> Result<Uint256, ConsensusError> {
        self.header.hash()
    }

    pub fn is_proof_of_stake(&self) -> bool {
        self.vtx.len() > 1 && self.vtx[1].is_coinstake()
    }

    pub fn is_proof_of_work(&self) -> bool {
        !self.is_proof_of_stake()
    }

    /// Merkle root over the block's txids and whether the tree was mutated
    /// by a duplicated trailing pair.
    pub fn compute_merkle_root(&self) -> (Uint256, bool) {
        let txids: Vec<Uint256> = self.vtx.iter().map(Transaction::txid).collect();
        block_merkle_root(&txids)
    }
}
