use std::collections::HashMap;

use crate::chain::{BlockId, BlockIndex, ChainIndex, ProofType};
use crate::coins::{PrevTx, SignatureVerifier};
use crate::error::ErrorCode;
use crate::kernel::{
    cache_kernel, check_coinstake_timestamp, check_kernel, check_proof_of_stake,
    check_stake_block_timestamp, check_stake_kernel_hash, KernelInput, KernelSearch, KernelState,
    StakeCache,
};
use crate::params::{ChainParams, ConsensusParams, Network, COIN};
use crate::tx::{OutPoint, Transaction, TxIn, TxOut};
use crate::uint256::Uint256;

const T0: u32 = 1_600_000_000;
const DAY: u32 = 24 * 60 * 60;
/// Target near 2^256: any kernel with a day of weight passes.
const EASY_BITS: u32 = 0x2100_ffff;
/// Target 1: scaled to zero for small, young outputs.
const HARD_BITS: u32 = 0x0300_0001;

struct Fixture {
    params: ConsensusParams,
    chain: ChainIndex,
    tip: BlockId,
    coins: HashMap<Uint256, PrevTx>,
    funding: OutPoint,
    coinbase: OutPoint,
}

struct Verifier(bool);

impl SignatureVerifier for Verifier {
    fn verify_signature(&self, _: &Transaction, _: &Transaction, n_in: u32, _: u32, _: i32) -> bool {
        assert_eq!(n_in, 0);
        self.0
    }
}

fn payment(time: u32, prevout: OutPoint, value: i64) -> Transaction {
    Transaction {
        version: 1,
        time,
        vin: vec![TxIn {
            prevout,
            script_sig: vec![0x00],
            sequence: u32::MAX,
        }],
        vout: vec![TxOut {
            value,
            script_pubkey: vec![0x51],
        }],
        lock_time: 0,
    }
}

fn coinstake(time: u32, prevout: OutPoint) -> Transaction {
    let mut tx = payment(time, prevout, 0);
    tx.vout = vec![
        TxOut {
            value: 0,
            script_pubkey: Vec::new(),
        },
        TxOut {
            value: 100 * COIN,
            script_pubkey: vec![0x51],
        },
    ];
    tx
}

fn fixture() -> Fixture {
    let params = ChainParams::for_network(Network::Main).consensus;
    let mut chain = ChainIndex::new();
    let g_hash = Uint256([0x11; 32]);
    let mut g = BlockIndex::new(g_hash, 0, T0, 0x1e0f_ffff, ProofType::Work);
    g.generated_stake_modifier = true;
    let g = chain.insert(g).expect("genesis");
    let mut b1 = BlockIndex::new(Uint256([0x22; 32]), 1, T0 + 60, 0x1e0f_ffff, ProofType::Work);
    b1.prev = Some(g);
    b1.stake_modifier = 0x0123_4567_89ab_cdef;
    let tip = chain.insert(b1).expect("b1");

    let funding_tx = payment(T0, OutPoint::new(Uint256([0x33; 32]), 1), 100 * COIN);
    let funding = OutPoint::new(funding_tx.txid(), 0);
    let coinbase_tx = payment(T0, OutPoint::null(), 50 * COIN);
    let coinbase = OutPoint::new(coinbase_tx.txid(), 0);

    let mut coins = HashMap::new();
    for tx in [funding_tx, coinbase_tx] {
        coins.insert(
            tx.txid(),
            PrevTx {
                block_hash: g_hash,
                tx,
            },
        );
    }
    Fixture {
        params,
        chain,
        tip,
        coins,
        funding,
        coinbase,
    }
}

impl Fixture {
    fn prev_tx(&self, prevout: &OutPoint) -> &PrevTx {
        self.coins.get(&prevout.txid).expect("prev tx")
    }

    /// First mask-aligned time with a day of weight.
    fn stake_time(&self) -> u32 {
        T0 + self.params.stake_min_age as u32 + DAY
    }
}

#[test]
fn every_nonzero_mask_offset_is_rejected_before_hashing() {
    let f = fixture();
    let base = f.stake_time();
    assert_eq!(base & f.params.stake_timestamp_mask, 0);
    for offset in 1..=f.params.stake_timestamp_mask {
        let err = check_stake_kernel_hash(
            &f.chain,
            f.tip,
            EASY_BITS,
            f.prev_tx(&f.funding),
            &f.funding,
            base + offset,
            &f.params,
        )
        .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::TimestampMaskViolation));
    }
}

#[test]
fn easy_target_accepts_with_kernel_hash_as_proof() {
    let f = fixture();
    let time = f.stake_time();
    let proof = check_stake_kernel_hash(
        &f.chain,
        f.tip,
        EASY_BITS,
        f.prev_tx(&f.funding),
        &f.funding,
        time,
        &f.params,
    )
    .expect("kernel");
    let expected = KernelInput {
        stake_modifier: 0x0123_4567_89ab_cdef,
        block_from_time: T0,
        tx_prev_time: T0,
        prevout: f.funding,
        time,
    }
    .hash();
    assert_eq!(proof.hash, expected);
    assert_eq!(proof.time, time);
}

#[test]
fn kernel_rejections() {
    let f = fixture();
    let time = f.stake_time();
    let check = |bits: u32, prevout: &OutPoint, time: u32| {
        check_stake_kernel_hash(
            &f.chain,
            f.tip,
            bits,
            f.prev_tx(prevout),
            prevout,
            time,
            &f.params,
        )
        .unwrap_err()
        .code()
    };

    assert_eq!(check(HARD_BITS, &f.funding, time), Some(ErrorCode::KernelHashTooHigh));
    assert_eq!(check(EASY_BITS, &f.funding, T0 - 16), Some(ErrorCode::StakeTimeViolation));
    assert_eq!(check(EASY_BITS, &f.funding, T0 + 16), Some(ErrorCode::StakeTooYoung));
    assert_eq!(check(EASY_BITS, &f.coinbase, time), Some(ErrorCode::InsufficientMaturity));
    assert_eq!(
        check(0x0492_3456, &f.funding, time),
        Some(ErrorCode::BadDiffBits)
    );

    let out_of_range = OutPoint::new(f.funding.txid, 5);
    let err = check_stake_kernel_hash(
        &f.chain,
        f.tip,
        EASY_BITS,
        f.prev_tx(&f.funding),
        &out_of_range,
        time,
        &f.params,
    )
    .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::MissingPrevout));
}

#[test]
fn unknown_containing_block_is_rejected() {
    let f = fixture();
    let mut orphan = f.prev_tx(&f.funding).clone();
    orphan.block_hash = Uint256([0x99; 32]);
    let err = check_stake_kernel_hash(
        &f.chain,
        f.tip,
        EASY_BITS,
        &orphan,
        &f.funding,
        f.stake_time(),
        &f.params,
    )
    .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::PrevoutBlockUnknown));
}

#[test]
fn check_kernel_fills_the_cache() {
    let f = fixture();
    let mut cache = StakeCache::new();
    let time = f.stake_time();
    assert!(check_kernel(
        &f.chain,
        f.tip,
        EASY_BITS,
        time,
        &f.funding,
        &f.coins,
        Some(&mut cache),
        &f.params,
    ));
    assert!(cache.contains_key(&f.funding));
    assert!(check_kernel(
        &f.chain, f.tip, EASY_BITS, time, &f.funding, &f.coins, None, &f.params,
    ));
    assert!(!check_kernel(
        &f.chain, f.tip, HARD_BITS, time, &f.funding, &f.coins, None, &f.params,
    ));

    let missing = OutPoint::new(Uint256([0x77; 32]), 0);
    assert!(!check_kernel(
        &f.chain,
        f.tip,
        EASY_BITS,
        time,
        &missing,
        &f.coins,
        Some(&mut cache),
        &f.params,
    ));
    assert!(!cache.contains_key(&missing));

    let err = cache_kernel(&mut cache, &f.chain, f.tip, &f.coinbase, &f.coins, &f.params)
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InsufficientMaturity));
    assert_eq!(cache.len(), 1);
}

#[test]
fn proof_of_stake_checks_shape_signature_and_kernel() {
    let f = fixture();
    let time = f.stake_time();
    let tx = coinstake(time, f.funding);

    let proof = check_proof_of_stake(
        &f.chain, f.tip, &tx, EASY_BITS, &f.coins, &Verifier(true), &f.params,
    )
    .expect("coinstake");
    assert_eq!(proof.time, time);

    let err = check_proof_of_stake(
        &f.chain, f.tip, &tx, EASY_BITS, &f.coins, &Verifier(false), &f.params,
    )
    .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidSignature));

    let err = check_proof_of_stake(
        &f.chain, f.tip, &tx, HARD_BITS, &f.coins, &Verifier(true), &f.params,
    )
    .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::KernelHashTooHigh));

    let plain = payment(time, f.funding, COIN);
    let err = check_proof_of_stake(
        &f.chain, f.tip, &plain, EASY_BITS, &f.coins, &Verifier(true), &f.params,
    )
    .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::NotCoinstake));

    let orphan = coinstake(time, OutPoint::new(Uint256([0x44; 32]), 0));
    let err = check_proof_of_stake(
        &f.chain, f.tip, &orphan, EASY_BITS, &f.coins, &Verifier(true), &f.params,
    )
    .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::MissingPrevout));

    let young = coinstake(T0 + 16, f.funding);
    let err = check_proof_of_stake(
        &f.chain, f.tip, &young, EASY_BITS, &f.coins, &Verifier(true), &f.params,
    )
    .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::StakeTooYoung));
}

#[test]
fn coinstake_timestamp_rules() {
    let p = ChainParams::for_network(Network::Main).consensus;
    assert!(check_coinstake_timestamp(1_600_000_000, 1_600_000_000, &p).is_ok());
    let err = check_coinstake_timestamp(1_600_000_000, 1_600_000_016, &p).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::CoinstakeTimestampMismatch));
    let err = check_stake_block_timestamp(1_600_000_001, &p).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::TimestampMaskViolation));
    assert!(check_stake_block_timestamp(1_600_000_016, &p).is_ok());
}

#[test]
fn search_accepts_first_eligible_time() {
    let f = fixture();
    let mut search = KernelSearch::new(f.tip, EASY_BITS, f.funding);
    // Too young (pending) up to min age; no weight until then either.
    let state = search
        .search(&f.chain, &f.coins, T0 + 1, f.stake_time(), &f.params)
        .expect("search")
        .clone();
    let KernelState::Accepted(proof) = state else {
        panic!("expected acceptance, got {state:?}");
    };
    assert_eq!(proof.time & f.params.stake_timestamp_mask, 0);
    assert!(proof.time >= T0 + f.params.stake_min_age as u32);

    // Finished searches keep their verdict.
    let again = search
        .try_time(&f.chain, &f.coins, f.stake_time() + 16, &f.params)
        .expect("try");
    assert_eq!(*again, KernelState::Accepted(proof));
}

#[test]
fn search_stays_pending_on_time_dependent_failures() {
    let f = fixture();
    let mut search = KernelSearch::new(f.tip, HARD_BITS, f.funding);
    let start = f.stake_time();
    let state = search
        .search(&f.chain, &f.coins, start, start + 16 * 20, &f.params)
        .expect("search");
    assert_eq!(*state, KernelState::Pending);
    assert!(!search.is_finished());

    let state = search
        .try_time(&f.chain, &f.coins, start + 3, &f.params)
        .expect("try");
    assert_eq!(*state, KernelState::Pending);
}

#[test]
fn search_ends_on_time_independent_failures() {
    let f = fixture();
    let missing = OutPoint::new(Uint256([0x55; 32]), 0);
    let mut search = KernelSearch::new(f.tip, EASY_BITS, missing);
    let state = search
        .try_time(&f.chain, &f.coins, f.stake_time(), &f.params)
        .expect("try");
    assert_eq!(*state, KernelState::Rejected(ErrorCode::MissingPrevout));

    let mut search = KernelSearch::new(f.tip, EASY_BITS, f.coinbase);
    let state = search
        .try_time(&f.chain, &f.coins, f.stake_time(), &f.params)
        .expect("try");
    assert_eq!(*state, KernelState::Rejected(ErrorCode::InsufficientMaturity));
    assert!(search.is_finished());
}

#[test]
fn search_never_starts_before_its_range() {
    let f = fixture();
    let last_aligned = u32::MAX & !f.params.stake_timestamp_mask;
    let mut at_last_aligned = KernelSearch::new(f.tip, EASY_BITS, f.funding);
    let state = at_last_aligned
        .try_time(&f.chain, &f.coins, last_aligned, &f.params)
        .expect("try");
    assert!(matches!(state, KernelState::Accepted(_)));

    // No aligned time fits in [u32::MAX - 3, u32::MAX]; the aligned time just
    // below the range must not be tried.
    let mut search = KernelSearch::new(f.tip, EASY_BITS, f.funding);
    let state = search
        .search(&f.chain, &f.coins, u32::MAX - 3, u32::MAX, &f.params)
        .expect("search");
    assert_eq!(*state, KernelState::Pending);
}
