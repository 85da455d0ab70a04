#![no_main]

use libfuzzer_sys::fuzz_target;
use num_bigint::BigUint;
use oduwa_consensus::{decode_compact, encode_compact};

// Decoding then re-encoding a usable compact value loses nothing further.
fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let bits = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let decoded = decode_compact(bits);
    if !decoded.is_usable() {
        return;
    }
    let again = decode_compact(encode_compact(&decoded.target));
    if again.target != decoded.target {
        panic!("compact re-encoding changed target");
    }

    let raw = BigUint::from_bytes_le(&data[4..data.len().min(36)]);
    let _ = decode_compact(encode_compact(&raw));
});
