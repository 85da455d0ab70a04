pub mod block;
pub mod chain;
pub mod chainparams;
pub mod checkpoints;
pub mod coinage;
pub mod coins;
pub mod compact;
mod compactsize;
pub mod error;
pub mod fork_choice;
pub mod genesis;
pub mod hash;
pub mod kernel;
pub mod merkle;
pub mod params;
pub mod pow;
pub mod stake_modifier;
pub mod tx;
pub mod uint256;
pub mod versionbits;

pub use block::{Block, BlockHeader, BLOCK_HEADER_BYTES};
pub use chain::{BlockId, BlockIndex, ChainIndex, ProofType};
pub use chainparams::{active, select_params, select_params_by_name, select_regtest, RegtestParams};
pub use checkpoints::{check_against_checkpoints, guess_verification_progress, last_checkpoint};
pub use coinage::{block_coin_age, coin_age_weight, tx_coin_age};
pub use coins::{CoinsView, PrevTx, SignatureVerifier};
pub use compact::{decode_compact, encode_compact};
pub use error::{ConfigError, ConsensusError, ErrorCode};
pub use kernel::{
    check_kernel, check_proof_of_stake, check_stake_kernel_hash, KernelProof, KernelSearch,
    KernelState, StakeCache,
};
pub use params::{ChainParams, ConsensusParams, DeploymentPos, Network};
pub use pow::{check_proof_of_work, next_target_required};
pub use stake_modifier::compute_next_stake_modifier;
pub use tx::{OutPoint, Transaction, TxIn, TxOut};
pub use uint256::Uint256;

#[cfg(test)]
mod kernel_tests;
#[cfg(test)]
mod versionbits_tests;
