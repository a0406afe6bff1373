//! Sparse Merkle commitment over the live UTXO set.
//!
//! A depth-256 sparse Merkle tree keyed by `Blake2b-256(txid ‖ index)`,
//! with leaves holding a hash of the UTXO contents and empty slots holding
//! per-level canonical null hashes. The tree keeps the most recent N roots
//! (one per sealed block) and can prove inclusion or exclusion against any
//! retained root.

pub mod proof;
pub mod tree;

use fontana_types::{TiaAmount, UtxoRef, WalletAddress};
use thiserror::Error;

pub use proof::MerkleProof;
pub use tree::{SparseMerkleTree, TREE_DEPTH};

/// A 32-byte tree node hash.
pub type NodeHash = [u8; 32];

#[derive(Debug, Error)]
pub enum MerkleError {
    #[error("root is not retained: {0}")]
    UnknownRoot(String),

    #[error("tree is corrupt: {0}")]
    Corrupt(String),
}

/// Derive the fixed-width tree key for a UTXO reference.
pub fn utxo_key(utxo: &UtxoRef) -> NodeHash {
    fontana_crypto::blake2b_256(&utxo.key_bytes())
}

/// Derive the leaf hash committing to a UTXO's contents.
///
/// `leaf = H(recipient ‖ amount_be ‖ txid ‖ index_be)`.
pub fn utxo_leaf(utxo: &UtxoRef, recipient: &WalletAddress, amount: TiaAmount) -> NodeHash {
    fontana_crypto::blake2b_256_multi(&[
        recipient.as_str().as_bytes(),
        &amount.utia().to_be_bytes(),
        utxo.txid.as_bytes(),
        &utxo.index.to_be_bytes(),
    ])
}
