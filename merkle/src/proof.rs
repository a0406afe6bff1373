//! Merkle proofs: fixed-order sibling paths from leaf to root.

use serde::{Deserialize, Serialize};

use fontana_types::StateRoot;

use crate::tree::{empty_leaf, TREE_DEPTH};
use crate::NodeHash;

/// A proof of a key's state under some root.
///
/// `siblings` is the full sibling path in leaf-to-root order. When the key
/// was absent under the root, `leaf` is the canonical empty-leaf hash and
/// the proof demonstrates exclusion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub key: NodeHash,
    pub leaf: NodeHash,
    pub siblings: Vec<NodeHash>,
}

impl MerkleProof {
    /// Whether this proof shows the key present (vs. an exclusion proof).
    pub fn is_inclusion(&self) -> bool {
        self.leaf != empty_leaf()
    }

    /// Recompute the root from the leaf and sibling path and compare.
    ///
    /// Any mutation of root, leaf, or siblings makes this return `false`.
    pub fn verify(&self, root: &StateRoot) -> bool {
        if self.siblings.len() != TREE_DEPTH {
            return false;
        }

        let mut current = self.leaf;
        for (i, sibling) in self.siblings.iter().enumerate() {
            // siblings[i] sits at depth TREE_DEPTH - i; the bit selecting
            // the child at that level is bit (TREE_DEPTH - 1 - i) of the key.
            let depth = TREE_DEPTH - 1 - i;
            let bit = (self.key[depth / 8] >> (7 - depth % 8)) & 1 == 1;
            current = if bit {
                fontana_crypto::blake2b_256_multi(&[sibling, &current])
            } else {
                fontana_crypto::blake2b_256_multi(&[&current, sibling])
            };
        }

        current == *root.as_bytes()
    }
}
