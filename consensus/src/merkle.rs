//! Reversed tx-merkle root over `[coinbase_hash] ++ reverse_each(tx_hash)`
//! (§3, invariant 1; §4.3 step 6).

use zecpool_core::Hash256;
use zecpool_util::sha256d;

/// Computes the pairwise double-SHA256 merkle root over `hashes`, which
/// must contain at least one element (the coinbase hash — the work
/// assembler never calls this with an empty list). A single-element input
/// returns that element unchanged; an odd-length level duplicates its
/// last element before pairing, matching the Zcash/Bitcoin convention.
pub fn merkle_root(hashes: &[Hash256]) -> Hash256 {
    debug_assert!(!hashes.is_empty(), "merkle_root requires at least one hash");
    let mut level: Vec<Hash256> = hashes.to_vec();
    if level.len() <= 1 {
        return level.into_iter().next().unwrap_or([0u8; 32]);
    }

    while level.len() > 1 {
        if level.len() % 2 == 1 {
            level.push(*level.last().unwrap());
        }
        let mut next = Vec::with_capacity(level.len() / 2);
        for pair in level.chunks_exact(2) {
            let mut buf = [0u8; 64];
            buf[..32].copy_from_slice(&pair[0]);
            buf[32..].copy_from_slice(&pair[1]);
            next.push(sha256d(&buf));
        }
        level = next;
    }
    level[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(byte: u8) -> Hash256 {
        [byte; 32]
    }

    #[test]
    fn single_element_tree_is_unchanged() {
        assert_eq!(merkle_root(&[h(1)]), h(1));
    }

    #[test]
    fn two_element_tree_hashes_the_pair() {
        let root = merkle_root(&[h(1), h(2)]);
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(&h(1));
        buf[32..].copy_from_slice(&h(2));
        assert_eq!(root, sha256d(&buf));
    }

    #[test]
    fn odd_length_level_duplicates_last_element() {
        let three = merkle_root(&[h(1), h(2), h(3)]);
        let four = merkle_root(&[h(1), h(2), h(3), h(3)]);
        assert_eq!(three, four);
    }
}
