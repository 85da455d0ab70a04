use crate::hash::hash256;
use crate::uint256::Uint256;

/// Bitcoin-style merkle root: pairs are hashed with SHA-256d and an odd
/// trailing node is paired with itself.
///
/// The flag reports a level holding two identical adjacent nodes, which lets
/// two different transaction lists share a root.
pub fn block_merkle_root(txids: &[Uint256]) -> (Uint256, bool) {
    if txids.is_empty() {
        return (Uint256::ZERO, false);
    }

    let mut mutated = false;
    let mut level: Vec<Uint256> = txids.to_vec();
    let mut preimage = [0u8; 64];
    while level.len() > 1 {
        let mut next: Vec<Uint256> = Vec::with_capacity((level.len() + 1) / 2);
        let mut i = 0usize;
        while i < level.len() {
            let left = level[i];
            let right = if i + 1 < level.len() {
                level[i + 1]
            } else {
                left
            };
            if i + 1 < level.len() && left == right {
                mutated = true;
            }
            preimage[..32].copy_from_slice(left.as_bytes());
            preimage[32..].copy_from_slice(right.as_bytes());
            next.push(hash256(&preimage));
            i += 2;
        }
        level = next;
    }

    (level[0], mutated)
}
