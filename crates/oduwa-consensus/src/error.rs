use core::fmt;

use thiserror::Error;

use crate::params::Network;

/// Reason codes for blocks the consensus rules refuse to accept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    CheckpointMismatch,
    BadDiffBits,
    HighHash,
    KernelHashTooHigh,
    StakeTooYoung,
    StakeTimeViolation,
    TimestampMaskViolation,
    CoinstakeTimestampMismatch,
    InvalidSignature,
    InsufficientMaturity,
    MissingPrevout,
    PrevoutBlockUnknown,
    NotCoinstake,
    ReorgTooDeep,
    ChainLinkInvalid,
    Parse,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::CheckpointMismatch => "REJECT_CHECKPOINT_MISMATCH",
            ErrorCode::BadDiffBits => "REJECT_BAD_DIFFBITS",
            ErrorCode::HighHash => "REJECT_HIGH_HASH",
            ErrorCode::KernelHashTooHigh => "REJECT_KERNEL_HASH_TOO_HIGH",
            ErrorCode::StakeTooYoung => "REJECT_STAKE_TOO_YOUNG",
            ErrorCode::StakeTimeViolation => "REJECT_STAKE_TIME_VIOLATION",
            ErrorCode::TimestampMaskViolation => "REJECT_TIMESTAMP_MASK_VIOLATION",
            ErrorCode::CoinstakeTimestampMismatch => "REJECT_COINSTAKE_TIMESTAMP_MISMATCH",
            ErrorCode::InvalidSignature => "REJECT_INVALID_SIGNATURE",
            ErrorCode::InsufficientMaturity => "REJECT_INSUFFICIENT_MATURITY",
            ErrorCode::MissingPrevout => "REJECT_MISSING_PREVOUT",
            ErrorCode::PrevoutBlockUnknown => "REJECT_PREVOUT_BLOCK_UNKNOWN",
            ErrorCode::NotCoinstake => "REJECT_NOT_COINSTAKE",
            ErrorCode::ReorgTooDeep => "REJECT_REORG_TOO_DEEP",
            ErrorCode::ChainLinkInvalid => "REJECT_CHAIN_LINK_INVALID",
            ErrorCode::Parse => "REJECT_PARSE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a failed consensus check.
///
/// `Reject` is local to one block's evaluation: the block is not accepted and
/// the node carries on. `Internal` means two nodes computed different values
/// for the same history and further blocks on that branch are suspect.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConsensusError {
    #[error("{}", display_reject(.code, .msg))]
    Reject { code: ErrorCode, msg: &'static str },
    #[error("internal inconsistency: {0}")]
    Internal(String),
}

fn display_reject(code: &ErrorCode, msg: &str) -> String {
    if msg.is_empty() {
        code.as_str().to_string()
    } else {
        format!("{}: {}", code.as_str(), msg)
    }
}

impl ConsensusError {
    pub fn reject(code: ErrorCode, msg: &'static str) -> Self {
        ConsensusError::Reject { code, msg }
    }

    /// Reason code for rejects, `None` for internal inconsistencies.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ConsensusError::Reject { code, .. } => Some(*code),
            ConsensusError::Internal(_) => None,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, ConsensusError::Internal(_))
    }
}

/// Startup configuration failures. These are fatal for the process.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown network: {0}")]
    UnknownNetwork(String),
    #[error("chain parameters already selected for {active}, refusing {requested}")]
    AlreadySelected { active: Network, requested: Network },
    #[error("deployment patching is only available on regtest, not {0}")]
    NotRegtest(Network),
}
