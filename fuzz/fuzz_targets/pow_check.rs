#![no_main]

use libfuzzer_sys::fuzz_target;
use oduwa_consensus::pow::pow_check;
use oduwa_consensus::{check_proof_of_work, BlockHeader, ChainParams, Network};

// 80 header bytes. The header's own bits are checked against its scrypt hash.
fuzz_target!(|data: &[u8]| {
    let Ok(header) = BlockHeader::from_bytes(data.get(..80).unwrap_or(data)) else {
        return;
    };
    let Ok(hash) = header.hash() else {
        return;
    };
    let params = ChainParams::for_network(Network::Main).consensus;
    let strict = pow_check(&hash, header.bits, &params).is_ok();
    if strict != check_proof_of_work(&hash, header.bits, &params) {
        panic!("pow_check and check_proof_of_work disagree");
    }
});
