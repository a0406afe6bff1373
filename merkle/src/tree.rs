//! The sparse Merkle tree.
//!
//! Nodes are stored content-addressed (`hash → (left, right)`), so every
//! retained root keeps proving against the same node map: sealing a block
//! never copies anything, and pruning is a mark-sweep from the retained
//! roots. Empty subtrees are never materialised — a node equal to the
//! canonical empty hash for its depth expands to two empty children.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::OnceLock;

use fontana_types::StateRoot;

use crate::proof::MerkleProof;
use crate::{MerkleError, NodeHash};

/// Tree depth in bits. Keys are Blake2b-256 digests, so every key addresses
/// a unique leaf slot.
pub const TREE_DEPTH: usize = 256;

/// Per-depth canonical empty hashes. `EMPTY[TREE_DEPTH]` is the empty leaf;
/// `EMPTY[d] = H(EMPTY[d+1] ‖ EMPTY[d+1])`.
fn empty_hashes() -> &'static [NodeHash; TREE_DEPTH + 1] {
    static EMPTY: OnceLock<[NodeHash; TREE_DEPTH + 1]> = OnceLock::new();
    EMPTY.get_or_init(|| {
        let mut table = [[0u8; 32]; TREE_DEPTH + 1];
        table[TREE_DEPTH] = fontana_crypto::blake2b_256(&[]);
        for depth in (0..TREE_DEPTH).rev() {
            table[depth] =
                fontana_crypto::blake2b_256_multi(&[&table[depth + 1], &table[depth + 1]]);
        }
        table
    })
}

/// The canonical empty-leaf hash (what an exclusion proof resolves to).
pub fn empty_leaf() -> NodeHash {
    empty_hashes()[TREE_DEPTH]
}

/// Bit of `key` selecting the child at `depth` (MSB-first).
#[inline]
fn key_bit(key: &NodeHash, depth: usize) -> bool {
    (key[depth / 8] >> (7 - depth % 8)) & 1 == 1
}

pub struct SparseMerkleTree {
    /// Internal nodes, content-addressed. Insert-only between prunes.
    nodes: HashMap<NodeHash, (NodeHash, NodeHash)>,
    /// Live leaf set: key → leaf hash. Used for membership and rebuild.
    leaves: HashMap<NodeHash, NodeHash>,
    /// Root of the live version.
    root: NodeHash,
    /// Retained `(height, root)` snapshots, oldest first.
    snapshots: VecDeque<(u64, NodeHash)>,
    /// How many historical roots to keep provable.
    retain: usize,
}

impl SparseMerkleTree {
    /// Create an empty tree retaining `retain` historical roots.
    pub fn new(retain: usize) -> Self {
        Self {
            nodes: HashMap::new(),
            leaves: HashMap::new(),
            root: empty_hashes()[0],
            snapshots: VecDeque::new(),
            retain: retain.max(1),
        }
    }

    /// Rebuild a tree from an iterator of `(key, leaf)` pairs.
    ///
    /// Used at startup to reconstruct the commitment from the UTXO table —
    /// the tree needs no independent persistence for correctness.
    pub fn from_leaves(pairs: impl IntoIterator<Item = (NodeHash, NodeHash)>, retain: usize) -> Self {
        let mut tree = Self::new(retain);
        for (key, leaf) in pairs {
            tree.put(key, leaf);
        }
        tree
    }

    /// Children of `node` at `depth` (children live at `depth + 1`).
    fn children(&self, node: &NodeHash, depth: usize) -> Result<(NodeHash, NodeHash), MerkleError> {
        let empty = empty_hashes();
        if *node == empty[depth] {
            return Ok((empty[depth + 1], empty[depth + 1]));
        }
        self.nodes.get(node).copied().ok_or_else(|| {
            MerkleError::Corrupt(format!("missing node at depth {depth}"))
        })
    }

    /// Insert or overwrite a leaf.
    pub fn put(&mut self, key: NodeHash, leaf: NodeHash) {
        self.write(key, Some(leaf));
    }

    /// Delete a leaf. Deleting an absent key is a no-op.
    pub fn delete(&mut self, key: NodeHash) {
        if self.leaves.contains_key(&key) {
            self.write(key, None);
        }
    }

    fn write(&mut self, key: NodeHash, leaf: Option<NodeHash>) {
        let empty = empty_hashes();

        // Walk down from the live root collecting the sibling at every depth.
        let mut siblings = [[0u8; 32]; TREE_DEPTH];
        let mut node = self.root;
        for (depth, sibling) in siblings.iter_mut().enumerate() {
            // The live tree is complete by construction, so children cannot fail.
            let (left, right) = self
                .children(&node, depth)
                .expect("live tree has all nodes");
            if key_bit(&key, depth) {
                *sibling = left;
                node = right;
            } else {
                *sibling = right;
                node = left;
            }
        }

        // Recompute the path bottom-up with the new leaf in place.
        let mut current = leaf.unwrap_or(empty[TREE_DEPTH]);
        for depth in (0..TREE_DEPTH).rev() {
            let sibling = siblings[depth];
            let (left, right) = if key_bit(&key, depth) {
                (sibling, current)
            } else {
                (current, sibling)
            };
            let parent = fontana_crypto::blake2b_256_multi(&[&left, &right]);
            if parent != empty[depth] {
                self.nodes.insert(parent, (left, right));
            }
            current = parent;
        }

        self.root = current;
        match leaf {
            Some(l) => {
                self.leaves.insert(key, l);
            }
            None => {
                self.leaves.remove(&key);
            }
        }
    }

    /// Root of the live version.
    pub fn root(&self) -> StateRoot {
        StateRoot::new(self.root)
    }

    /// Leaf hash currently stored at `key`, if any.
    pub fn get(&self, key: &NodeHash) -> Option<NodeHash> {
        self.leaves.get(key).copied()
    }

    /// Number of live leaves.
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Prove `key` against the live root.
    pub fn prove(&self, key: &NodeHash) -> Result<MerkleProof, MerkleError> {
        self.prove_at(&self.root(), key)
    }

    /// Prove `key` against any retained root.
    ///
    /// Returns an inclusion proof if the key was present under that root,
    /// or an exclusion proof (leaf = empty-leaf hash) if it was not.
    pub fn prove_at(&self, root: &StateRoot, key: &NodeHash) -> Result<MerkleProof, MerkleError> {
        if !self.is_retained(root) {
            return Err(MerkleError::UnknownRoot(root.to_string()));
        }

        let mut siblings = Vec::with_capacity(TREE_DEPTH);
        let mut node = *root.as_bytes();
        for depth in 0..TREE_DEPTH {
            let (left, right) = self.children(&node, depth)?;
            if key_bit(key, depth) {
                siblings.push(left);
                node = right;
            } else {
                siblings.push(right);
                node = left;
            }
        }

        // Fixed order: leaf to root.
        siblings.reverse();
        Ok(MerkleProof {
            key: *key,
            leaf: node,
            siblings,
        })
    }

    /// Whether `root` is the live root or one of the retained snapshots.
    pub fn is_retained(&self, root: &StateRoot) -> bool {
        let bytes = *root.as_bytes();
        bytes == self.root || self.snapshots.iter().any(|(_, r)| *r == bytes)
    }

    /// Retained `(height, root)` snapshots, oldest first.
    pub fn retained_roots(&self) -> impl Iterator<Item = (u64, StateRoot)> + '_ {
        self.snapshots.iter().map(|(h, r)| (*h, StateRoot::new(*r)))
    }

    /// Root snapshotted at `height`, if still retained.
    pub fn root_at(&self, height: u64) -> Option<StateRoot> {
        self.snapshots
            .iter()
            .find(|(h, _)| *h == height)
            .map(|(_, r)| StateRoot::new(*r))
    }

    /// Record the live root as the commitment for `height`, evicting the
    /// oldest snapshot beyond the retention window and pruning nodes no
    /// longer reachable from any retained root.
    pub fn snapshot(&mut self, height: u64) {
        self.snapshots.push_back((height, self.root));
        while self.snapshots.len() > self.retain {
            self.snapshots.pop_front();
        }
        self.prune();
    }

    /// Drop every node unreachable from the live root and retained snapshots.
    fn prune(&mut self) {
        let mut marked: HashSet<NodeHash> = HashSet::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeHash> = self.snapshots.iter().map(|(_, r)| *r).collect();
        stack.push(self.root);

        while let Some(node) = stack.pop() {
            if !marked.insert(node) {
                continue;
            }
            if let Some((left, right)) = self.nodes.get(&node) {
                stack.push(*left);
                stack.push(*right);
            }
        }

        self.nodes.retain(|hash, _| marked.contains(hash));
    }
}
