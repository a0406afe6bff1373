//! Genesis state — the declarative initial UTXO set.
//!
//! The genesis file is JSON: a chain id, a timestamp, and a list of
//! `{recipient, amount}` credits. Loading is single-shot and
//! failure-atomic; the resulting state root is embedded in the persisted
//! genesis header so recovery can verify it against a trusted copy.

use std::path::Path;

use serde::{Deserialize, Serialize};

use fontana_merkle::{utxo_key, utxo_leaf, SparseMerkleTree};
use fontana_transactions::BlockHeader;
use fontana_types::{BlockHash, TiaAmount, Timestamp, TxHash, UtxoRef, WalletAddress};

use crate::LedgerError;

/// An initial credit created in the genesis block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisUtxo {
    pub recipient: WalletAddress,
    pub amount: TiaAmount,
}

/// The declared initial state of a Fontana chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub chain_id: String,
    pub timestamp: Timestamp,
    pub utxos: Vec<GenesisUtxo>,
    #[serde(default)]
    pub description: Option<String>,
}

impl GenesisState {
    /// Load a genesis file from disk.
    pub fn from_file(path: &Path) -> Result<Self, LedgerError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LedgerError::Storage(fontana_store::StoreError::Backend(format!(
                "failed to read genesis file: {e}"
            )))
        })?;
        Self::from_json(&contents)
    }

    /// Parse a genesis document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, LedgerError> {
        let state: GenesisState = serde_json::from_str(json).map_err(|e| {
            LedgerError::Storage(fontana_store::StoreError::Serialization(format!(
                "invalid genesis file: {e}"
            )))
        })?;
        if state.chain_id.is_empty() {
            return Err(LedgerError::Storage(
                fontana_store::StoreError::Serialization("genesis chain_id is empty".into()),
            ));
        }
        for utxo in &state.utxos {
            if utxo.amount.is_zero() {
                return Err(LedgerError::Storage(
                    fontana_store::StoreError::Serialization(
                        "genesis UTXO amount must be non-zero".into(),
                    ),
                ));
            }
        }
        Ok(state)
    }

    /// The synthetic reference of the `index`-th genesis UTXO.
    ///
    /// txids are `H("genesis" ‖ chain_id ‖ index_be)`, so every network has
    /// a deterministic, collision-free initial UTXO set.
    pub fn utxo_ref(&self, index: u32) -> UtxoRef {
        let txid = TxHash::new(fontana_crypto::blake2b_256_multi(&[
            b"genesis",
            self.chain_id.as_bytes(),
            &index.to_be_bytes(),
        ]));
        UtxoRef::new(txid, 0)
    }

    /// Build the Merkle commitment over the genesis UTXO set.
    pub fn build_tree(&self, retain: usize) -> SparseMerkleTree {
        SparseMerkleTree::from_leaves(
            self.utxos.iter().enumerate().map(|(i, credit)| {
                let utxo = self.utxo_ref(i as u32);
                (
                    utxo_key(&utxo),
                    utxo_leaf(&utxo, &credit.recipient, credit.amount),
                )
            }),
            retain,
        )
    }

    /// The deterministic genesis header this state produces.
    ///
    /// Recovery compares this against the header a trusted operator hands
    /// it, then verifies every later block against the DA contents.
    pub fn header(&self) -> BlockHeader {
        BlockHeader {
            height: 0,
            prev_hash: BlockHash::ZERO,
            state_root: self.build_tree(1).root(),
            tx_merkle_root: TxHash::ZERO,
            timestamp: self.timestamp,
            tx_count: 0,
        }
    }
}
