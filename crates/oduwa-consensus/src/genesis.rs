use crate::block::{Block, BlockHeader};
use crate::tx::{OutPoint, Transaction, TxIn, TxOut};
use crate::uint256::Uint256;

pub const GENESIS_TIMESTAMP: &str = "New Coin developerment ";

const OP_0: u8 = 0x00;
const OP_PUSHDATA1: u8 = 0x4c;
const OP_PUSHDATA2: u8 = 0x4d;
const OP_PUSHDATA4: u8 = 0x4e;

/// Builds the genesis block. Its generation output cannot be spent since it
/// never existed in the coins database.
pub fn create_genesis_block(time: u32, nonce: u32, bits: u32, version: i32, reward: i64) -> Block {
    create_genesis_block_with(GENESIS_TIMESTAMP, Vec::new(), time, nonce, bits, version, reward)
}

pub fn create_genesis_block_with(
    timestamp: &str,
    output_script: Vec<u8>,
    time: u32,
    nonce: u32,
    bits: u32,
    version: i32,
    reward: i64,
) -> Block {
    let tx = Transaction {
        version: 1,
        time,
        vin: vec![TxIn {
            prevout: OutPoint::null(),
            script_sig: genesis_script_sig(timestamp),
            sequence: u32::MAX,
        }],
        vout: vec![TxOut {
            value: reward,
            script_pubkey: output_script,
        }],
        lock_time: 0,
    };

    let mut block = Block {
        header: BlockHeader {
            version,
            prev_block: Uint256::ZERO,
            merkle_root: Uint256::ZERO,
            time,
            bits,
            nonce,
        },
        vtx: vec![tx],
        signature: Vec::new(),
    };
    block.header.merkle_root = block.compute_merkle_root().0;
    block
}

fn genesis_script_sig(timestamp: &str) -> Vec<u8> {
    let mut script = vec![OP_0];
    push_data(&mut script, &script_num_to_vec(42));
    push_data(&mut script, timestamp.as_bytes());
    script
}

fn push_data(script: &mut Vec<u8>, data: &[u8]) {
    match data.len() {
        0..=75 => script.push(data.len() as u8),
        76..=0xff => {
            script.push(OP_PUSHDATA1);
            script.push(data.len() as u8);
        }
        0x100..=0xffff => {
            script.push(OP_PUSHDATA2);
            script.extend_from_slice(&(data.len() as u16).to_le_bytes());
        }
        _ => {
            script.push(OP_PUSHDATA4);
            script.extend_from_slice(&(data.len() as u32).to_le_bytes());
        }
    }
    script.extend_from_slice(data);
}

fn script_num_to_vec(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let mut abs = value.unsigned_abs();
    let mut result = Vec::new();
    while abs > 0 {
        result.push((abs & 0xff) as u8);
        abs >>= 8;
    }
    let sign_bit = 0x80u8;
    if let Some(last) = result.last_mut() {
        if (*last & sign_bit) != 0 {
            result.push(if value < 0 { sign_bit } else { 0 });
        } else if value < 0 {
            *last |= sign_bit;
        }
    }
    result
}
