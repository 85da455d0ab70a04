use crate::compactsize::encode_compact_size;
use crate::hash::hash256;
use crate::uint256::Uint256;

/// Coordinates of a transaction output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutPoint {
    pub txid: Uint256,
    pub n: u32,
}

impl OutPoint {
    pub fn new(txid: Uint256, n: u32) -> Self {
        Self { txid, n }
    }

    pub fn null() -> Self {
        Self {
            txid: Uint256::ZERO,
            n: u32::MAX,
        }
    }

    pub fn is_null(&self) -> bool {
        self.txid.is_null() && self.n == u32::MAX
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxIn {
    pub prevout: OutPoint,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOut {
    pub value: i64,
    pub script_pubkey: Vec<u8>,
}

impl TxOut {
    /// The marker output a coinstake starts with.
    pub fn is_empty(&self) -> bool {
        self.value == 0 && self.script_pubkey.is_empty()
    }
}

/// A transaction as hashed by this chain. Unlike Bitcoin it carries its own
/// timestamp, which the kernel and coin-age rules read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: i32,
    pub time: u32,
    pub vin: Vec<TxIn>,
    pub vout: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    pub fn is_coinbase(&self) -> bool {
        self.vin.len() == 1 && self.vin[0].prevout.is_null()
    }

    pub fn is_coinstake(&self) -> bool {
        !self.vin.is_empty()
            && !self.vin[0].prevout.is_null()
            && self.vout.len() >= 2
            && self.vout[0].is_empty()
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.time.to_le_bytes());
        encode_compact_size(self.vin.len() as u64, &mut out);
        for txin in &self.vin {
            out.extend_from_slice(txin.prevout.txid.as_bytes());
            out.extend_from_slice(&txin.prevout.n.to_le_bytes());
            encode_compact_size(txin.script_sig.len() as u64, &mut out);
            out.extend_from_slice(&txin.script_sig);
            out.extend_from_slice(&txin.sequence.to_le_bytes());
        }
        encode_compact_size(self.vout.len() as u64, &mut out);
        for txout in &self.vout {
            out.extend_from_slice(&txout.value.to_le_bytes());
            encode_compact_size(txout.script_pubkey.len() as u64, &mut out);
            out.extend_from_slice(&txout.script_pubkey);
        }
        out.extend_from_slice(&self.lock_time.to_le_bytes());
        out
    }

    pub fn txid(&self) -> Uint256 {
        hash256(&self.serialize())
    }
}
