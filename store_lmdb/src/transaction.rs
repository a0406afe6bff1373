//! LMDB implementation of TransactionStore.
//!
//! Primary key: txid (32 bytes). The pending index keys are
//! `timestamp_be(8) ++ txid(32)`, so a plain key-order scan yields FIFO
//! order with txid ascending as the tie-breaker — exactly the sequencer's
//! selection order.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use fontana_store::{StoreError, TransactionStore, TxRecord};
use fontana_transactions::SignedTransaction;
use fontana_types::TxHash;

use crate::LmdbError;

pub struct LmdbTransactionStore {
    pub(crate) env: Arc<Env>,
    pub(crate) transactions_db: Database<Bytes, Bytes>,
    pub(crate) tx_pending_db: Database<Bytes, Bytes>,
}

/// Build the pending index key `timestamp_be(8) ++ txid(32)`.
pub(crate) fn pending_index_key(tx: &SignedTransaction) -> [u8; 40] {
    let mut key = [0u8; 40];
    key[..8].copy_from_slice(&tx.timestamp.as_secs().to_be_bytes());
    key[8..].copy_from_slice(tx.txid.as_bytes());
    key
}

impl TransactionStore for LmdbTransactionStore {
    fn get_transaction(&self, txid: &TxHash) -> Result<Option<TxRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .transactions_db
            .get(&rtxn, txid.as_bytes().as_slice())
            .map_err(LmdbError::from)?;
        match val {
            Some(bytes) => {
                let record: TxRecord = bincode::deserialize(bytes).map_err(LmdbError::from)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn fetch_unconfirmed(&self) -> Result<Vec<SignedTransaction>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.tx_pending_db.iter(&rtxn).map_err(LmdbError::from)?;

        let mut results = Vec::new();
        for entry in iter {
            let (key, _) = entry.map_err(LmdbError::from)?;
            let txid = &key[8..40];
            let val = self
                .transactions_db
                .get(&rtxn, txid)
                .map_err(LmdbError::from)?
                .ok_or_else(|| {
                    StoreError::Corruption("pending index points at missing transaction".into())
                })?;
            let record: TxRecord = bincode::deserialize(val).map_err(LmdbError::from)?;
            results.push(record.tx);
        }
        Ok(results)
    }

    fn transaction_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.transactions_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }
}
