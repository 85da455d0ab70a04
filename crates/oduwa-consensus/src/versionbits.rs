//! Version-bits deployments and block-version super-majority.
//!
//! Deployment state only changes at window boundaries and is driven by the
//! median time past of the last block of each window.

use crate::chain::{BlockId, ChainIndex};
use crate::params::{ConsensusParams, Deployment, DeploymentPos};

pub const VERSIONBITS_TOP_BITS: i32 = 0x2000_0000;
pub const VERSIONBITS_TOP_MASK: u32 = 0xe000_0000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThresholdState {
    Defined,
    Started,
    LockedIn,
    Active,
    Failed,
}

impl ThresholdState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdState::Defined => "DEFINED",
            ThresholdState::Started => "STARTED",
            ThresholdState::LockedIn => "LOCKED_IN",
            ThresholdState::Active => "ACTIVE",
            ThresholdState::Failed => "FAILED",
        }
    }
}

/// Whether `version` signals readiness for deployment `d`.
pub fn version_signals(version: i32, d: &Deployment) -> bool {
    (version as u32 & VERSIONBITS_TOP_MASK) == VERSIONBITS_TOP_BITS as u32
        && (version as u32 >> d.bit) & 1 == 1
}

fn next_state(
    prev: ThresholdState,
    median_time: i64,
    signal_count: u32,
    d: &Deployment,
    threshold: u32,
) -> ThresholdState {
    match prev {
        ThresholdState::Defined => {
            if median_time >= d.timeout {
                ThresholdState::Failed
            } else if median_time >= d.start_time {
                ThresholdState::Started
            } else {
                ThresholdState::Defined
            }
        }
        ThresholdState::Started => {
            // Timeout wins over a window that also reached the threshold.
            if median_time >= d.timeout {
                ThresholdState::Failed
            } else if signal_count >= threshold {
                ThresholdState::LockedIn
            } else {
                ThresholdState::Started
            }
        }
        ThresholdState::LockedIn => ThresholdState::Active,
        ThresholdState::Active => ThresholdState::Active,
        ThresholdState::Failed => ThresholdState::Failed,
    }
}

fn window_signal_count(chain: &ChainIndex, last: BlockId, window: u32, d: &Deployment) -> u32 {
    chain
        .ancestors(last)
        .take(window as usize)
        .filter(|(_, e)| version_signals(e.version, d))
        .count() as u32
}

/// State of deployment `pos` for the block after `prev`.
pub fn deployment_state(
    chain: &ChainIndex,
    prev: Option<BlockId>,
    params: &ConsensusParams,
    pos: DeploymentPos,
) -> ThresholdState {
    let d = params.deployment(pos);
    let window = params.miner_confirmation_window;
    let threshold = params.rule_change_activation_threshold;

    // Every block of a window shares the state computed at the end of the
    // previous window.
    let mut cursor = prev.and_then(|id| {
        let height = chain.get(id)?.height;
        chain.ancestor(id, height.checked_sub((height + 1) % window)?)
    });

    let mut boundaries = Vec::new();
    let mut state = ThresholdState::Defined;
    while let Some(id) = cursor {
        if chain.median_time_past(id) < d.start_time {
            break;
        }
        boundaries.push(id);
        cursor = chain
            .get(id)
            .and_then(|e| e.height.checked_sub(window))
            .and_then(|h| chain.ancestor(id, h));
    }

    while let Some(id) = boundaries.pop() {
        let mtp = chain.median_time_past(id);
        let signals = if state == ThresholdState::Started {
            window_signal_count(chain, id, window, d)
        } else {
            0
        };
        state = next_state(state, mtp, signals, d, threshold);
    }
    state
}

/// Version for a new block on top of `prev`: the top bits plus every
/// deployment that is started or locked in.
pub fn compute_block_version(
    chain: &ChainIndex,
    prev: Option<BlockId>,
    params: &ConsensusParams,
) -> i32 {
    let mut version = VERSIONBITS_TOP_BITS;
    for pos in DeploymentPos::ALL {
        match deployment_state(chain, prev, params, pos) {
            ThresholdState::Started | ThresholdState::LockedIn => {
                version |= 1 << params.deployment(pos).bit;
            }
            _ => {}
        }
    }
    version
}

/// Whether at least `required` of the last `window` blocks ending at `start`
/// have a version of `min_version` or above.
pub fn is_super_majority(
    min_version: i32,
    chain: &ChainIndex,
    start: Option<BlockId>,
    required: u32,
    window: u32,
) -> bool {
    let Some(start) = start else {
        return required == 0;
    };
    let found = chain
        .ancestors(start)
        .take(window as usize)
        .filter(|(_, e)| e.version >= min_version)
        .count();
    found >= required as usize
}
