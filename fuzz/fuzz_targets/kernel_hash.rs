#![no_main]

use libfuzzer_sys::fuzz_target;
use oduwa_consensus::kernel::KernelInput;
use oduwa_consensus::{OutPoint, Uint256};

// 56 bytes: the kernel preimage layout itself.
fuzz_target!(|data: &[u8]| {
    if data.len() < 56 {
        return;
    }
    let word = |at: usize| u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);
    let mut modifier = [0u8; 8];
    modifier.copy_from_slice(&data[..8]);
    let mut txid = [0u8; 32];
    txid.copy_from_slice(&data[16..48]);

    let input = KernelInput {
        stake_modifier: u64::from_le_bytes(modifier),
        block_from_time: word(8),
        tx_prev_time: word(12),
        prevout: OutPoint::new(Uint256(txid), word(48)),
        time: word(52),
    };
    if input.to_bytes()[..] != data[..56] {
        panic!("kernel preimage layout mismatch");
    }
    if input.hash() != input.hash() {
        panic!("kernel hash non-deterministic");
    }
});
