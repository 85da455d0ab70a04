//! Collaborators the stake rules consult for previous outputs and signatures.

use std::collections::HashMap;

use crate::chain::{BlockIndex, ChainIndex};
use crate::error::{ConsensusError, ErrorCode};
use crate::tx::{OutPoint, Transaction, TxOut};
use crate::uint256::Uint256;

/// SCRIPT_VERIFY_NONE
pub const VERIFY_NONE: u32 = 0;

/// A confirmed transaction and the hash of the block that contains it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrevTx {
    pub block_hash: Uint256,
    pub tx: Transaction,
}

impl PrevTx {
    pub fn output(&self, n: u32) -> Result<&TxOut, ConsensusError> {
        self.tx.vout.get(n as usize).ok_or(ConsensusError::reject(
            ErrorCode::MissingPrevout,
            "output index out of range",
        ))
    }

    /// The containing block's index entry.
    pub fn block<'a>(&self, chain: &'a ChainIndex) -> Result<&'a BlockIndex, ConsensusError> {
        chain.lookup_entry(&self.block_hash).ok_or(ConsensusError::reject(
            ErrorCode::PrevoutBlockUnknown,
            "block containing previous output not indexed",
        ))
    }
}

/// Resolves confirmed transactions by txid.
pub trait CoinsView {
    fn previous_tx(&self, txid: &Uint256) -> Option<PrevTx>;

    fn resolve(&self, prevout: &OutPoint) -> Result<PrevTx, ConsensusError> {
        self.previous_tx(&prevout.txid).ok_or(ConsensusError::reject(
            ErrorCode::MissingPrevout,
            "previous transaction not found",
        ))
    }
}

impl CoinsView for HashMap<Uint256, PrevTx> {
    fn previous_tx(&self, txid: &Uint256) -> Option<PrevTx> {
        self.get(txid).cloned()
    }
}

/// Script-level check that `tx_to`'s input `n_in` may spend its output in
/// `tx_from`.
pub trait SignatureVerifier {
    fn verify_signature(
        &self,
        tx_from: &Transaction,
        tx_to: &Transaction,
        n_in: u32,
        flags: u32,
        hash_type: i32,
    ) -> bool;
}
