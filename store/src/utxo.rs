//! UTXO table: the live credit set of the rollup.

use serde::{Deserialize, Serialize};

use fontana_types::{TiaAmount, UtxoRef, WalletAddress};

use crate::StoreError;

/// Spend state of a UTXO.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UtxoStatus {
    Unspent,
    Spent,
}

/// A persisted transaction output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoRecord {
    pub utxo: UtxoRef,
    pub recipient: WalletAddress,
    pub amount: TiaAmount,
    pub status: UtxoStatus,
    /// Height of the block that created this output.
    pub created_in_block: u64,
    /// Height of the block that spent it, once spent.
    pub spent_in_block: Option<u64>,
}

impl UtxoRecord {
    pub fn is_spent(&self) -> bool {
        self.status == UtxoStatus::Spent
    }
}

/// Trait for UTXO storage.
pub trait UtxoStore {
    /// Fetch a UTXO regardless of spend state.
    fn get_utxo(&self, utxo: &UtxoRef) -> Result<Option<UtxoRecord>, StoreError>;

    /// Fetch a UTXO only if it is unspent.
    fn fetch_unspent(&self, utxo: &UtxoRef) -> Result<Option<UtxoRecord>, StoreError> {
        Ok(self.get_utxo(utxo)?.filter(|r| !r.is_spent()))
    }

    /// All unspent outputs payable to an address.
    fn fetch_unspent_by_address(
        &self,
        address: &WalletAddress,
    ) -> Result<Vec<UtxoRecord>, StoreError>;

    /// Every unspent output in the ledger. Used to rebuild the Merkle
    /// commitment at startup and by conservation checks in tests.
    fn iter_unspent(&self) -> Result<Vec<UtxoRecord>, StoreError>;

    /// Number of UTXO rows (spent and unspent).
    fn utxo_count(&self) -> Result<u64, StoreError>;
}
