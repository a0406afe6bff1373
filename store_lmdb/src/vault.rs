//! LMDB implementation of VaultStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use fontana_store::{StoreError, VaultDeposit, VaultStore, VaultWithdrawal, WithdrawalStatus};
use fontana_types::TxHash;

use crate::LmdbError;

pub struct LmdbVaultStore {
    pub(crate) env: Arc<Env>,
    pub(crate) vault_deposits_db: Database<Bytes, Bytes>,
    pub(crate) vault_withdrawals_db: Database<Bytes, Bytes>,
}

impl VaultStore for LmdbVaultStore {
    fn get_deposit(&self, l1_tx_hash: &str) -> Result<Option<VaultDeposit>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .vault_deposits_db
            .get(&rtxn, l1_tx_hash.as_bytes())
            .map_err(LmdbError::from)?;
        match val {
            Some(bytes) => {
                let deposit: VaultDeposit =
                    bincode::deserialize(bytes).map_err(LmdbError::from)?;
                Ok(Some(deposit))
            }
            None => Ok(None),
        }
    }

    fn insert_deposit(&self, deposit: &VaultDeposit) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let key = deposit.l1_tx_hash.as_bytes();
        let existing = self
            .vault_deposits_db
            .get(&wtxn, key)
            .map_err(LmdbError::from)?;
        if existing.is_some() {
            return Err(StoreError::Duplicate(deposit.l1_tx_hash.clone()));
        }
        let bytes = bincode::serialize(deposit).map_err(LmdbError::from)?;
        self.vault_deposits_db
            .put(&mut wtxn, key, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn mark_deposit_processed(&self, l1_tx_hash: &str) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let key = l1_tx_hash.as_bytes();
        let bytes = self
            .vault_deposits_db
            .get(&wtxn, key)
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("deposit {l1_tx_hash}")))?;
        let mut deposit: VaultDeposit = bincode::deserialize(bytes).map_err(LmdbError::from)?;

        deposit.processed = true;

        let encoded = bincode::serialize(&deposit).map_err(LmdbError::from)?;
        self.vault_deposits_db
            .put(&mut wtxn, key, &encoded)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_withdrawal(&self, burn_txid: &TxHash) -> Result<Option<VaultWithdrawal>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .vault_withdrawals_db
            .get(&rtxn, burn_txid.as_bytes().as_slice())
            .map_err(LmdbError::from)?;
        match val {
            Some(bytes) => {
                let withdrawal: VaultWithdrawal =
                    bincode::deserialize(bytes).map_err(LmdbError::from)?;
                Ok(Some(withdrawal))
            }
            None => Ok(None),
        }
    }

    fn upsert_withdrawal(&self, withdrawal: &VaultWithdrawal) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let bytes = bincode::serialize(withdrawal).map_err(LmdbError::from)?;
        self.vault_withdrawals_db
            .put(&mut wtxn, withdrawal.burn_txid.as_bytes().as_slice(), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn withdrawals_in_status(
        &self,
        status: WithdrawalStatus,
    ) -> Result<Vec<VaultWithdrawal>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self
            .vault_withdrawals_db
            .iter(&rtxn)
            .map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for entry in iter {
            let (_, bytes) = entry.map_err(LmdbError::from)?;
            let withdrawal: VaultWithdrawal =
                bincode::deserialize(bytes).map_err(LmdbError::from)?;
            if withdrawal.status == status {
                results.push(withdrawal);
            }
        }
        Ok(results)
    }
}
