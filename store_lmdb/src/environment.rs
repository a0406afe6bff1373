//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::block::LmdbBlockStore;
use crate::meta::LmdbMetaStore;
use crate::transaction::LmdbTransactionStore;
use crate::utxo::LmdbUtxoStore;
use crate::vault::LmdbVaultStore;
use crate::write_batch::WriteBatch;
use crate::LmdbError;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,

    // UTXO store
    pub(crate) utxos_db: Database<Bytes, Bytes>,
    /// Index: `recipient_bytes ++ utxo_key(36)` → `[]`, unspent outputs only.
    pub(crate) utxo_addr_db: Database<Bytes, Bytes>,

    // Transaction store
    pub(crate) transactions_db: Database<Bytes, Bytes>,
    /// Index: `timestamp_be(8) ++ txid(32)` → `[]`, applied but unconfirmed.
    pub(crate) tx_pending_db: Database<Bytes, Bytes>,

    // Block store
    pub(crate) blocks_db: Database<Bytes, Bytes>,

    // Vault stores
    pub(crate) vault_deposits_db: Database<Bytes, Bytes>,
    pub(crate) vault_withdrawals_db: Database<Bytes, Bytes>,

    // System vars (watermarks, schema version, chain id)
    pub(crate) system_vars_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)
            .map_err(|e| LmdbError::Heed(format!("failed to create directory: {e}")))?;

        let env = unsafe {
            EnvOpenOptions::new()
                .max_dbs(16)
                .map_size(map_size)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;

        let utxos_db = env.create_database(&mut wtxn, Some("utxos"))?;
        let utxo_addr_db = env.create_database(&mut wtxn, Some("utxo_addr_index"))?;
        let transactions_db = env.create_database(&mut wtxn, Some("transactions"))?;
        let tx_pending_db = env.create_database(&mut wtxn, Some("tx_pending_index"))?;
        let blocks_db = env.create_database(&mut wtxn, Some("blocks"))?;
        let vault_deposits_db = env.create_database(&mut wtxn, Some("vault_deposits"))?;
        let vault_withdrawals_db = env.create_database(&mut wtxn, Some("vault_withdrawals"))?;
        let system_vars_db = env.create_database(&mut wtxn, Some("system_vars"))?;

        wtxn.commit()?;

        Ok(Self {
            env: Arc::new(env),
            utxos_db,
            utxo_addr_db,
            transactions_db,
            tx_pending_db,
            blocks_db,
            vault_deposits_db,
            vault_withdrawals_db,
            system_vars_db,
        })
    }

    /// Get a shared reference to the underlying heed environment.
    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    /// Begin a write batch grouping multiple store operations into a single
    /// LMDB write transaction, amortising the fsync cost. Dropping the batch
    /// without committing rolls everything back.
    pub fn write_batch(&self) -> Result<WriteBatch<'_>, fontana_store::StoreError> {
        WriteBatch::new(self)
    }

    /// Create a UTXO store backed by this environment.
    pub fn utxo_store(&self) -> LmdbUtxoStore {
        LmdbUtxoStore {
            env: Arc::clone(&self.env),
            utxos_db: self.utxos_db,
            utxo_addr_db: self.utxo_addr_db,
        }
    }

    /// Create a transaction store backed by this environment.
    pub fn transaction_store(&self) -> LmdbTransactionStore {
        LmdbTransactionStore {
            env: Arc::clone(&self.env),
            transactions_db: self.transactions_db,
            tx_pending_db: self.tx_pending_db,
        }
    }

    /// Create a block store backed by this environment.
    pub fn block_store(&self) -> LmdbBlockStore {
        LmdbBlockStore {
            env: Arc::clone(&self.env),
            blocks_db: self.blocks_db,
        }
    }

    /// Create a vault store backed by this environment.
    pub fn vault_store(&self) -> LmdbVaultStore {
        LmdbVaultStore {
            env: Arc::clone(&self.env),
            vault_deposits_db: self.vault_deposits_db,
            vault_withdrawals_db: self.vault_withdrawals_db,
        }
    }

    /// Create a meta store backed by this environment.
    pub fn meta_store(&self) -> LmdbMetaStore {
        LmdbMetaStore {
            env: Arc::clone(&self.env),
            system_vars_db: self.system_vars_db,
        }
    }

    /// Force a flush of the LMDB memory-mapped file to disk.
    ///
    /// LMDB ensures durability on every write-transaction commit; this is an
    /// extra safety measure for graceful shutdown.
    pub fn force_sync(&self) -> Result<(), LmdbError> {
        let wtxn = self.env.write_txn()?;
        wtxn.commit()?;
        Ok(())
    }
}
