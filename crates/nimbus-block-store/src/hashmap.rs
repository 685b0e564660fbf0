//! The ordered sequence of block hashes composing an object, and the
//! Merkle-style fold that reduces it to a single root hash (§4.2).

use nimbus_types::Hash;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

fn sha256(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

const ZERO_HASH: Hash = [0u8; 32];

/// An object's data, expressed as the ordered list of block hashes that
/// reassemble it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hashmap {
    blocks: Vec<Hash>,
}

impl Hashmap {
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    pub fn from_blocks(blocks: Vec<Hash>) -> Self {
        Self { blocks }
    }

    pub fn push(&mut self, hash: Hash) {
        self.blocks.push(hash);
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Hash] {
        &self.blocks
    }

    /// Fold the block list down to a single content address.
    ///
    /// Empty maps hash to `H("")`; a single block is its own root; otherwise
    /// the sequence is padded to the next power of two with `ZERO_HASH` and
    /// folded pairwise until one hash remains.
    pub fn root_hash(&self) -> Hash {
        match self.blocks.len() {
            0 => sha256(b""),
            1 => self.blocks[0],
            n => {
                let padded_len = n.next_power_of_two();
                let mut level = self.blocks.clone();
                level.resize(padded_len, ZERO_HASH);
                while level.len() > 1 {
                    level = level
                        .chunks_exact(2)
                        .map(|pair| {
                            let mut buf = Vec::with_capacity(64);
                            buf.extend_from_slice(&pair[0]);
                            buf.extend_from_slice(&pair[1]);
                            sha256(&buf)
                        })
                        .collect();
                }
                level[0]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_hashmap_hashes_empty_string() {
        let map = Hashmap::new();
        assert_eq!(map.root_hash(), sha256(b""));
    }

    #[test]
    fn single_block_is_its_own_root() {
        let block = [7u8; 32];
        let map = Hashmap::from_blocks(vec![block]);
        assert_eq!(map.root_hash(), block);
    }

    #[test]
    fn two_blocks_fold_once() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        let map = Hashmap::from_blocks(vec![a, b]);
        let mut expected_input = Vec::new();
        expected_input.extend_from_slice(&a);
        expected_input.extend_from_slice(&b);
        assert_eq!(map.root_hash(), sha256(&expected_input));
    }

    #[test]
    fn odd_block_count_pads_with_zero_hash() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        let c = [3u8; 32];
        let map = Hashmap::from_blocks(vec![a, b, c]);

        let mut left_input = Vec::new();
        left_input.extend_from_slice(&a);
        left_input.extend_from_slice(&b);
        let left = sha256(&left_input);

        let mut right_input = Vec::new();
        right_input.extend_from_slice(&c);
        right_input.extend_from_slice(&ZERO_HASH);
        let right = sha256(&right_input);

        let mut root_input = Vec::new();
        root_input.extend_from_slice(&left);
        root_input.extend_from_slice(&right);
        assert_eq!(map.root_hash(), sha256(&root_input));
    }

    #[test]
    fn root_hash_is_order_sensitive() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        let forward = Hashmap::from_blocks(vec![a, b]);
        let reversed = Hashmap::from_blocks(vec![b, a]);
        assert_ne!(forward.root_hash(), reversed.root_hash());
    }
}
