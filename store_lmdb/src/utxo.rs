//! LMDB implementation of UtxoStore.
//!
//! Primary key: `txid(32) ++ index_be(4)`. The address index keys are
//! `recipient_bytes ++ primary_key`; all Fontana addresses have identical
//! length, so prefix scans for a given recipient work correctly. The index
//! only holds unspent outputs — spends remove the entry in the same batch.

use std::ops::Bound;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use fontana_store::{StoreError, UtxoRecord, UtxoStore};
use fontana_types::{UtxoRef, WalletAddress};

use crate::{increment_prefix, LmdbError};

pub struct LmdbUtxoStore {
    pub(crate) env: Arc<Env>,
    pub(crate) utxos_db: Database<Bytes, Bytes>,
    pub(crate) utxo_addr_db: Database<Bytes, Bytes>,
}

/// Build the address index key `recipient_bytes ++ utxo_key`.
pub(crate) fn addr_index_key(recipient: &WalletAddress, utxo: &UtxoRef) -> Vec<u8> {
    let addr = recipient.as_str().as_bytes();
    let mut key = Vec::with_capacity(addr.len() + 36);
    key.extend_from_slice(addr);
    key.extend_from_slice(&utxo.key_bytes());
    key
}

impl UtxoStore for LmdbUtxoStore {
    fn get_utxo(&self, utxo: &UtxoRef) -> Result<Option<UtxoRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .utxos_db
            .get(&rtxn, &utxo.key_bytes())
            .map_err(LmdbError::from)?;
        match val {
            Some(bytes) => {
                let record: UtxoRecord =
                    bincode::deserialize(bytes).map_err(LmdbError::from)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn fetch_unspent_by_address(
        &self,
        address: &WalletAddress,
    ) -> Result<Vec<UtxoRecord>, StoreError> {
        let prefix = address.as_str().as_bytes();
        let mut upper = prefix.to_vec();
        increment_prefix(&mut upper);

        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let bounds = (Bound::Included(prefix), Bound::Excluded(upper.as_slice()));
        let iter = self
            .utxo_addr_db
            .range(&rtxn, &bounds)
            .map_err(LmdbError::from)?;

        let mut results = Vec::new();
        for entry in iter {
            let (key, _) = entry.map_err(LmdbError::from)?;
            let utxo_key = &key[prefix.len()..];
            let val = self
                .utxos_db
                .get(&rtxn, utxo_key)
                .map_err(LmdbError::from)?
                .ok_or_else(|| {
                    StoreError::Corruption("address index points at missing UTXO".into())
                })?;
            let record: UtxoRecord = bincode::deserialize(val).map_err(LmdbError::from)?;
            results.push(record);
        }
        Ok(results)
    }

    fn iter_unspent(&self) -> Result<Vec<UtxoRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.utxos_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for entry in iter {
            let (_, val) = entry.map_err(LmdbError::from)?;
            let record: UtxoRecord = bincode::deserialize(val).map_err(LmdbError::from)?;
            if !record.is_spent() {
                results.push(record);
            }
        }
        Ok(results)
    }

    fn utxo_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.utxos_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }
}
