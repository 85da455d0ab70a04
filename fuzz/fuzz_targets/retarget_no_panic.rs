#![no_main]

use libfuzzer_sys::fuzz_target;
use oduwa_consensus::{next_target_required, BlockIndex, ChainIndex, ChainParams, Network, ProofType, Uint256};

// Each 5-byte chunk is one block: 4 bytes of time delta (signed) and a proof
// type byte. The retarget must be deterministic and never exceed the ceiling.
fuzz_target!(|data: &[u8]| {
    let params = ChainParams::for_network(Network::Main).consensus;
    let mut chain = ChainIndex::new();
    let mut time: i64 = 1_600_000_000;
    let mut bits = 0x1e0f_ffff;
    let mut prev = None;

    for (height, chunk) in data.chunks_exact(5).take(64).enumerate() {
        let delta = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as i64 % 7_200;
        time = (time + delta).clamp(0, u32::MAX as i64);
        let proof = if chunk[4] & 1 == 1 { ProofType::Stake } else { ProofType::Work };

        let mut hash = [0u8; 32];
        hash[..8].copy_from_slice(&(height as u64).to_le_bytes());
        let mut entry = BlockIndex::new(Uint256(hash), height as u32, time as u32, bits, proof);
        entry.prev = prev;
        let Ok(id) = chain.insert(entry) else {
            return;
        };
        prev = Some(id);

        let a = next_target_required(&chain, prev, time, &params, proof);
        let b = next_target_required(&chain, prev, time, &params, proof);
        if a != b {
            panic!("retarget non-deterministic");
        }
        let limit = if proof == ProofType::Stake {
            &params.pos_limit
        } else {
            &params.pow_limit
        };
        if oduwa_consensus::decode_compact(a).target > limit.to_biguint() {
            panic!("retarget above ceiling");
        }
        bits = a;
    }
});
