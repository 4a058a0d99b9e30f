// Copyright (C) 2015-2025 The Neo Project.
//
// merkle_tree.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Merkle root computation over transaction hashes.

use crate::hash::hash256;

/// Bottom-up Merkle tree over 32-byte leaves.
pub struct MerkleTree;

impl MerkleTree {
    /// Computes the Merkle root of the given leaf hashes.
    ///
    /// Each level pairs adjacent hashes and double-SHA256 hashes their
    /// concatenation; a level with an odd count duplicates its last hash.
    /// An empty leaf list yields the zero hash.
    pub fn compute_root(hashes: &[[u8; 32]]) -> [u8; 32] {
        match hashes.len() {
            0 => [0u8; 32],
            1 => hashes[0],
            _ => {
                let mut level: Vec<[u8; 32]> = hashes.to_vec();
                while level.len() > 1 {
                    if level.len() % 2 == 1 {
                        level.push(*level.last().expect("level is non-empty"));
                    }
                    level = level
                        .chunks_exact(2)
                        .map(|pair| {
                            let mut concat = [0u8; 64];
                            concat[..32].copy_from_slice(&pair[0]);
                            concat[32..].copy_from_slice(&pair[1]);
                            hash256(&concat)
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
    fn empty_is_zero() {
        assert_eq!(MerkleTree::compute_root(&[]), [0u8; 32]);
    }

    #[test]
    fn single_leaf_is_identity() {
        let leaf = [7u8; 32];
        assert_eq!(MerkleTree::compute_root(&[leaf]), leaf);
    }

    #[test]
    fn odd_count_duplicates_last() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        let c = [3u8; 32];
        // [a b c] hashes like [a b c c].
        assert_eq!(
            MerkleTree::compute_root(&[a, b, c]),
            MerkleTree::compute_root(&[a, b, c, c])
        );
        // And differs from [a b].
        assert_ne!(
            MerkleTree::compute_root(&[a, b, c]),
            MerkleTree::compute_root(&[a, b])
        );
    }

    #[test]
    fn two_leaves_hash_concatenation() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        let mut concat = [0u8; 64];
        concat[..32].copy_from_slice(&a);
        concat[32..].copy_from_slice(&b);
        assert_eq!(MerkleTree::compute_root(&[a, b]), hash256(&concat));
    }
}
