//! Transaction table: applied transactions and their block membership.

use serde::{Deserialize, Serialize};

use fontana_transactions::SignedTransaction;
use fontana_types::TxHash;

use crate::StoreError;

/// A persisted transaction.
///
/// `block_height` is `None` while the transaction has been applied but not
/// yet included in a block; the sequencer stamps it on inclusion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TxRecord {
    pub tx: SignedTransaction,
    pub block_height: Option<u64>,
}

/// Trait for transaction storage.
pub trait TransactionStore {
    /// Retrieve a transaction by txid.
    fn get_transaction(&self, txid: &TxHash) -> Result<Option<TxRecord>, StoreError>;

    /// Check if a transaction exists.
    fn transaction_exists(&self, txid: &TxHash) -> Result<bool, StoreError> {
        Ok(self.get_transaction(txid)?.is_some())
    }

    /// Applied transactions not yet included in a block, FIFO by timestamp
    /// with txid ascending as the tie-breaker.
    fn fetch_unconfirmed(&self) -> Result<Vec<SignedTransaction>, StoreError>;

    /// Number of stored transactions.
    fn transaction_count(&self) -> Result<u64, StoreError>;
}
