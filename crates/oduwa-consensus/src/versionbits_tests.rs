use crate::chain::{BlockId, BlockIndex, ChainIndex, ProofType};
use crate::hash::hash256;
use crate::params::{ChainParams, ConsensusParams, DeploymentPos, Network};
use crate::versionbits::{
    compute_block_version, deployment_state, is_super_majority, version_signals, ThresholdState,
    VERSIONBITS_TOP_BITS,
};

const SIGNAL: i32 = VERSIONBITS_TOP_BITS | (1 << 28);

fn params(start_time: i64, timeout: i64) -> ConsensusParams {
    let mut p = ChainParams::for_network(Network::Regtest).consensus;
    p.deployments[DeploymentPos::TestDummy.index()].start_time = start_time;
    p.deployments[DeploymentPos::TestDummy.index()].timeout = timeout;
    p
}

/// `len` blocks 600 s apart with versions chosen per height.
fn build(len: u32, version: impl Fn(u32) -> i32) -> (ChainIndex, Vec<BlockId>) {
    let mut chain = ChainIndex::new();
    let mut ids: Vec<BlockId> = Vec::new();
    for h in 0..len {
        let mut e = BlockIndex::new(
            hash256(&h.to_le_bytes()),
            h,
            1_000_000 + h * 600,
            0x207f_ffff,
            ProofType::Work,
        );
        e.version = version(h);
        e.prev = ids.last().copied();
        ids.push(chain.insert(e).expect("insert"));
    }
    (chain, ids)
}

fn state_after(
    chain: &ChainIndex,
    ids: &[BlockId],
    height: usize,
    p: &ConsensusParams,
) -> ThresholdState {
    deployment_state(chain, Some(ids[height]), p, DeploymentPos::TestDummy)
}

#[test]
fn signal_requires_top_bits() {
    let d = params(0, i64::MAX).deployments[0];
    assert!(version_signals(SIGNAL, &d));
    assert!(!version_signals(VERSIONBITS_TOP_BITS, &d));
    assert!(!version_signals(1 << 28, &d));
    assert!(!version_signals(0x6000_0000 | (1 << 28), &d));
}

#[test]
fn full_signalling_locks_in_then_activates() {
    let p = params(0, i64::MAX);
    let (chain, ids) = build(433, |_| SIGNAL);
    assert_eq!(
        deployment_state(&chain, None, &p, DeploymentPos::TestDummy),
        ThresholdState::Defined
    );
    assert_eq!(state_after(&chain, &ids, 142, &p), ThresholdState::Defined);
    assert_eq!(state_after(&chain, &ids, 143, &p), ThresholdState::Started);
    assert_eq!(state_after(&chain, &ids, 286, &p), ThresholdState::Started);
    assert_eq!(state_after(&chain, &ids, 287, &p), ThresholdState::LockedIn);
    assert_eq!(state_after(&chain, &ids, 431, &p), ThresholdState::Active);
    assert_eq!(ThresholdState::LockedIn.as_str(), "LOCKED_IN");
}

#[test]
fn threshold_is_inclusive() {
    let p = params(0, i64::MAX);
    // Window 144..=287 carries exactly 108 signals.
    let (chain, ids) = build(289, |h| if (144..252).contains(&h) { SIGNAL } else { 1 });
    assert_eq!(state_after(&chain, &ids, 287, &p), ThresholdState::LockedIn);

    let (chain, ids) = build(289, |h| if (144..251).contains(&h) { SIGNAL } else { 1 });
    assert_eq!(state_after(&chain, &ids, 287, &p), ThresholdState::Started);
}

#[test]
fn timeout_wins_over_lock_in() {
    // MTP at height 143 is 1_082_800, at 287 it is 1_169_200.
    let p = params(0, 1_100_000);
    let (chain, ids) = build(289, |_| SIGNAL);
    assert_eq!(state_after(&chain, &ids, 143, &p), ThresholdState::Started);
    assert_eq!(state_after(&chain, &ids, 287, &p), ThresholdState::Failed);
}

#[test]
fn future_start_stays_defined() {
    let p = params(2_000_000, i64::MAX);
    let (chain, ids) = build(289, |_| SIGNAL);
    assert_eq!(state_after(&chain, &ids, 287, &p), ThresholdState::Defined);
}

#[test]
fn block_version_signals_started_deployments() {
    let p = params(0, i64::MAX);
    let (chain, ids) = build(150, |_| 1);
    assert_eq!(compute_block_version(&chain, Some(ids[10]), &p), VERSIONBITS_TOP_BITS);
    assert_eq!(compute_block_version(&chain, Some(ids[143]), &p), SIGNAL);
}

#[test]
fn super_majority_counts_the_window() {
    let (chain, ids) = build(100, |h| if h >= 40 { 3 } else { 2 });
    let tip = Some(ids[99]);
    assert!(is_super_majority(3, &chain, tip, 60, 100));
    assert!(!is_super_majority(3, &chain, tip, 61, 100));
    assert!(is_super_majority(2, &chain, tip, 100, 100));
    assert!(!is_super_majority(3, &chain, None, 1, 100));
}
