//! Deterministic block construction.
//!
//! The sequencer is the single writer of block heights. It drains every
//! applied-but-unconfirmed transaction (FIFO by timestamp, txid ascending
//! as the tie-breaker — the storage index order), stamps the current ledger
//! state root into the header, and persists header plus transaction
//! membership in one atomic batch. Empty blocks are produced on the cadence
//! tick so the chain keeps a steady heartbeat for the DA layer.
//!
//! Because included transactions are already applied when the block is
//! built, the header's `state_root` is exactly the root observed after
//! applying the block's transactions in order. Every pending transaction is
//! drained into the block for the same reason — a partial slice would
//! commit a root covering effects the block does not contain. `max_batch`
//! therefore acts as the immediate-production trigger, not a slice.

use thiserror::Error;
use tracing::{debug, info};

use fontana_ledger::{Ledger, LedgerError};
use fontana_store::{BlockRecord, BlockStore, StoreError};
use fontana_transactions::{tx_merkle_root, Block, BlockHeader};
use fontana_types::Timestamp;

#[derive(Debug, Error)]
pub enum SequencerError {
    #[error("cannot build a block before genesis is loaded")]
    GenesisMissing,

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Builds blocks from a ledger. One instance per node.
pub struct Sequencer;

impl Sequencer {
    /// Build, persist, and seal the next block (possibly empty).
    ///
    /// 1. Snapshot the pending set (already applied, FIFO order).
    /// 2. Chain from the latest header: `height + 1`, `prev_hash`.
    /// 3. Stamp the current ledger root as the block's `state_root`.
    /// 4. Commit header + membership in one batch, then snapshot the tree.
    pub fn build_block(
        ledger: &mut Ledger,
        timestamp: Timestamp,
    ) -> Result<Block, SequencerError> {
        let pending = ledger.get_unconfirmed_txs()?;

        let latest = ledger
            .environment()
            .block_store()
            .get_latest_block()?
            .ok_or(SequencerError::GenesisMissing)?;

        let height = latest.header.height + 1;
        let prev_hash = latest.header.hash();

        let txids: Vec<_> = pending.iter().map(|tx| tx.txid).collect();
        let header = BlockHeader {
            height,
            prev_hash,
            state_root: ledger.get_current_state_root(),
            tx_merkle_root: tx_merkle_root(&txids),
            timestamp,
            tx_count: pending.len() as u32,
        };

        let mut batch = ledger.environment().write_batch()?;
        batch.put_block(&BlockRecord {
            header: header.clone(),
            tx_ids: txids,
            local_committed: true,
            da_committed: false,
            blob_ref: None,
        })?;
        for tx in &pending {
            batch.mark_transaction_included(tx, height)?;
        }
        batch.commit()?;

        ledger.snapshot_block(height);

        if pending.is_empty() {
            debug!(height, "sealed empty block");
        } else {
            info!(height, tx_count = pending.len(), "sealed block");
        }

        Ok(Block {
            header,
            transactions: pending,
        })
    }
}
