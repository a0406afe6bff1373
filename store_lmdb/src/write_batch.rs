//! Write batching — groups multiple store operations into a single LMDB
//! write transaction, amortising the cost of the fsync that each commit
//! performs and making multi-table flows atomic.
//!
//! # Usage
//!
//! ```ignore
//! let mut batch = env.write_batch()?;
//! batch.mark_utxo_spent(&input, height)?;
//! batch.put_utxo(&output)?;
//! batch.put_transaction(&record)?;
//! batch.commit()?;
//! ```
//!
//! If the batch is dropped without calling [`WriteBatch::commit`], all
//! operations are rolled back (the underlying LMDB transaction is aborted).

use heed::RwTxn;

use fontana_store::{
    BlockRecord, StoreError, TxRecord, UtxoRecord, UtxoStatus, VaultDeposit, VaultWithdrawal,
};
use fontana_transactions::SignedTransaction;
use fontana_types::{TxHash, UtxoRef};

use crate::environment::LmdbEnvironment;
use crate::transaction::pending_index_key;
use crate::utxo::addr_index_key;
use crate::LmdbError;

/// A write batch over every table in the environment.
pub struct WriteBatch<'a> {
    txn: RwTxn<'a>,
    env: &'a LmdbEnvironment,
}

impl<'a> WriteBatch<'a> {
    pub(crate) fn new(env: &'a LmdbEnvironment) -> Result<Self, StoreError> {
        let txn = env.env().write_txn().map_err(LmdbError::from)?;
        Ok(Self { txn, env })
    }

    // ── UTXO operations ─────────────────────────────────────────────────

    /// Insert a UTXO row and, when unspent, its address index entry.
    pub fn put_utxo(&mut self, record: &UtxoRecord) -> Result<(), StoreError> {
        let key = record.utxo.key_bytes();
        let bytes = bincode::serialize(record).map_err(LmdbError::from)?;
        self.env
            .utxos_db
            .put(&mut self.txn, &key, &bytes)
            .map_err(LmdbError::from)?;

        if record.status == UtxoStatus::Unspent {
            let index_key = addr_index_key(&record.recipient, &record.utxo);
            self.env
                .utxo_addr_db
                .put(&mut self.txn, &index_key, &[])
                .map_err(LmdbError::from)?;
        }
        Ok(())
    }

    /// Mark a UTXO spent at `height` and drop its address index entry.
    pub fn mark_utxo_spent(&mut self, utxo: &UtxoRef, height: u64) -> Result<(), StoreError> {
        let key = utxo.key_bytes();
        let bytes = self
            .env
            .utxos_db
            .get(&self.txn, &key)
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("utxo {utxo}")))?;
        let mut record: UtxoRecord = bincode::deserialize(bytes).map_err(LmdbError::from)?;

        if record.is_spent() {
            return Err(StoreError::Corruption(format!(
                "utxo {utxo} is already spent"
            )));
        }
        record.status = UtxoStatus::Spent;
        record.spent_in_block = Some(height);

        let encoded = bincode::serialize(&record).map_err(LmdbError::from)?;
        self.env
            .utxos_db
            .put(&mut self.txn, &key, &encoded)
            .map_err(LmdbError::from)?;

        let index_key = addr_index_key(&record.recipient, utxo);
        self.env
            .utxo_addr_db
            .delete(&mut self.txn, &index_key)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    // ── Transaction operations ──────────────────────────────────────────

    /// Insert a transaction row; unconfirmed rows also get a pending index
    /// entry so the sequencer can drain them in FIFO order.
    pub fn put_transaction(&mut self, record: &TxRecord) -> Result<(), StoreError> {
        let bytes = bincode::serialize(record).map_err(LmdbError::from)?;
        self.env
            .transactions_db
            .put(&mut self.txn, record.tx.txid.as_bytes().as_slice(), &bytes)
            .map_err(LmdbError::from)?;

        if record.block_height.is_none() {
            let index_key = pending_index_key(&record.tx);
            self.env
                .tx_pending_db
                .put(&mut self.txn, &index_key, &[])
                .map_err(LmdbError::from)?;
        }
        Ok(())
    }

    /// Stamp a transaction with the block that included it and drop its
    /// pending index entry.
    pub fn mark_transaction_included(
        &mut self,
        tx: &SignedTransaction,
        height: u64,
    ) -> Result<(), StoreError> {
        let key = tx.txid.as_bytes().as_slice();
        let bytes = self
            .env
            .transactions_db
            .get(&self.txn, key)
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("transaction {}", tx.txid)))?;
        let mut record: TxRecord = bincode::deserialize(bytes).map_err(LmdbError::from)?;

        record.block_height = Some(height);

        let encoded = bincode::serialize(&record).map_err(LmdbError::from)?;
        self.env
            .transactions_db
            .put(&mut self.txn, key, &encoded)
            .map_err(LmdbError::from)?;

        let index_key = pending_index_key(tx);
        self.env
            .tx_pending_db
            .delete(&mut self.txn, &index_key)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    // ── Block operations ────────────────────────────────────────────────

    /// Insert a block record keyed by height.
    pub fn put_block(&mut self, record: &BlockRecord) -> Result<(), StoreError> {
        let bytes = bincode::serialize(record).map_err(LmdbError::from)?;
        self.env
            .blocks_db
            .put(&mut self.txn, &record.header.height.to_be_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    // ── Vault operations ────────────────────────────────────────────────

    /// Insert a deposit row. Fails with `Duplicate` on a known hash.
    pub fn put_deposit(&mut self, deposit: &VaultDeposit) -> Result<(), StoreError> {
        let key = deposit.l1_tx_hash.as_bytes();
        let existing = self
            .env
            .vault_deposits_db
            .get(&self.txn, key)
            .map_err(LmdbError::from)?;
        if existing.is_some() {
            return Err(StoreError::Duplicate(deposit.l1_tx_hash.clone()));
        }
        let bytes = bincode::serialize(deposit).map_err(LmdbError::from)?;
        self.env
            .vault_deposits_db
            .put(&mut self.txn, key, &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    /// Flip a deposit's processed flag.
    pub fn mark_deposit_processed(&mut self, l1_tx_hash: &str) -> Result<(), StoreError> {
        let key = l1_tx_hash.as_bytes();
        let bytes = self
            .env
            .vault_deposits_db
            .get(&self.txn, key)
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("deposit {l1_tx_hash}")))?;
        let mut deposit: VaultDeposit = bincode::deserialize(bytes).map_err(LmdbError::from)?;

        deposit.processed = true;

        let encoded = bincode::serialize(&deposit).map_err(LmdbError::from)?;
        self.env
            .vault_deposits_db
            .put(&mut self.txn, key, &encoded)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    /// Insert or replace a withdrawal row.
    pub fn put_withdrawal(&mut self, withdrawal: &VaultWithdrawal) -> Result<(), StoreError> {
        let bytes = bincode::serialize(withdrawal).map_err(LmdbError::from)?;
        self.env
            .vault_withdrawals_db
            .put(
                &mut self.txn,
                withdrawal.burn_txid.as_bytes().as_slice(),
                &bytes,
            )
            .map_err(LmdbError::from)?;
        Ok(())
    }

    // ── Meta operations ─────────────────────────────────────────────────

    /// Put a system variable into the batch.
    pub fn put_meta(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.env
            .system_vars_db
            .put(&mut self.txn, key.as_bytes(), value)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    /// Put a u64 watermark into the batch.
    pub fn put_watermark(&mut self, key: &str, value: u64) -> Result<(), StoreError> {
        self.put_meta(key, &value.to_be_bytes())
    }

    /// Whether a transaction row exists (read within this batch's txn).
    pub fn transaction_exists(&self, txid: &TxHash) -> Result<bool, StoreError> {
        let val = self
            .env
            .transactions_db
            .get(&self.txn, txid.as_bytes().as_slice())
            .map_err(LmdbError::from)?;
        Ok(val.is_some())
    }

    // ── Commit / rollback ───────────────────────────────────────────────

    /// Commit all batched operations in a single write transaction.
    ///
    /// This is the only fsync in the entire batch.
    pub fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}
