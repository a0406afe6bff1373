//! UTXO reference type.

use crate::TxHash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A reference to a transaction output: `(txid, output_index)`.
///
/// The pair is unique across the ledger and doubles as the storage key and
/// the Merkle-tree key preimage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UtxoRef {
    pub txid: TxHash,
    pub index: u32,
}

impl UtxoRef {
    pub fn new(txid: TxHash, index: u32) -> Self {
        Self { txid, index }
    }

    /// Binary storage key: `txid(32) ++ index_be(4)`.
    pub fn key_bytes(&self) -> [u8; 36] {
        let mut key = [0u8; 36];
        key[..32].copy_from_slice(self.txid.as_bytes());
        key[32..].copy_from_slice(&self.index.to_be_bytes());
        key
    }
}

impl fmt::Display for UtxoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.index)
    }
}
