//! Recovery: rebuild local state by replaying DA-resident blocks.
//!
//! Given a trusted genesis and the DA layer, a fresh node replays every
//! posted block through the real ledger, verifying the header chain and
//! each block's state root as it goes. The DA layer is authoritative: any
//! transaction the ledger rejects, or any root that disagrees, halts
//! recovery with a divergence report rather than continuing on corrupted
//! state. The procedure is deterministic and idempotent given the same DA
//! contents.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use fontana_da::{decode_block, DaClient, DaError, Namespace};
use fontana_ledger::{GenesisState, Ledger, LedgerError};
use fontana_store::{meta, BlockRecord, BlockStore, StoreError};
use fontana_store_lmdb::LmdbEnvironment;
use fontana_transactions::{tx_merkle_root, BlockHeader};
use fontana_types::StateRoot;

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("recovery requires empty storage, found {blocks} existing blocks")]
    StorageNotEmpty { blocks: u64 },

    #[error("genesis does not match the trusted header")]
    GenesisMismatch,

    #[error("state root mismatch at height {height}: header {expected}, replayed {actual}")]
    StateRootMismatch {
        height: u64,
        expected: StateRoot,
        actual: StateRoot,
    },

    #[error("chain discontinuity at height {height}: {reason}")]
    ChainDiscontinuity { height: u64, reason: String },

    #[error("divergence at height {height}: {reason}")]
    Divergence { height: u64, reason: String },

    #[error("DA error: {0}")]
    Da(#[from] DaError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Outcome of a successful recovery.
#[derive(Clone, Debug)]
pub struct RecoveryReport {
    pub blocks_replayed: u64,
    pub final_height: u64,
    pub final_root: StateRoot,
}

/// Rebuild a node from the DA layer into `env` (which must be empty).
///
/// Walks heights `1, 2, …` by derived namespace until the DA layer has no
/// blob for the next height, replaying and verifying every block.
pub async fn recover_from_da<C: DaClient>(
    client: &C,
    env: Arc<LmdbEnvironment>,
    genesis: &GenesisState,
    trusted_genesis: &BlockHeader,
    base_namespace: Namespace,
    historical_roots_kept: usize,
) -> Result<RecoveryReport, RecoveryError> {
    let existing = env.block_store().block_count()?;
    if existing > 0 {
        return Err(RecoveryError::StorageNotEmpty { blocks: existing });
    }

    let mut ledger = Ledger::open(Arc::clone(&env), historical_roots_kept)?;
    let local_genesis = ledger.load_genesis(genesis)?;
    if local_genesis != *trusted_genesis {
        error!(
            local_root = %local_genesis.state_root,
            trusted_root = %trusted_genesis.state_root,
            "genesis file does not reproduce the trusted header"
        );
        return Err(RecoveryError::GenesisMismatch);
    }

    info!(
        chain_id = %genesis.chain_id,
        genesis_root = %local_genesis.state_root,
        "recovery started"
    );

    let mut prev_header = local_genesis;
    let mut height = 1u64;
    loop {
        let namespace = base_namespace.for_height(height);
        let Some((blob_ref, bytes)) = client.fetch_blob_by_namespace(namespace).await? else {
            break;
        };

        let block = decode_block(&bytes).map_err(|e| RecoveryError::Divergence {
            height,
            reason: format!("undecodable blob: {e}"),
        })?;

        if block.header.height != height {
            return Err(RecoveryError::ChainDiscontinuity {
                height,
                reason: format!("blob carries height {}", block.header.height),
            });
        }
        if block.header.prev_hash != prev_header.hash() {
            return Err(RecoveryError::ChainDiscontinuity {
                height,
                reason: "prev_hash does not match the previous header".into(),
            });
        }

        let txids: Vec<_> = block.transactions.iter().map(|tx| tx.txid).collect();
        if tx_merkle_root(&txids) != block.header.tx_merkle_root {
            return Err(RecoveryError::Divergence {
                height,
                reason: "tx merkle root does not match block contents".into(),
            });
        }

        for tx in &block.transactions {
            ledger
                .apply_transaction(tx)
                .map_err(|e| RecoveryError::Divergence {
                    height,
                    reason: format!("transaction {} rejected: {e}", tx.txid),
                })?;
        }

        let replayed_root = ledger.get_current_state_root();
        if replayed_root != block.header.state_root {
            error!(
                height,
                expected = %block.header.state_root,
                actual = %replayed_root,
                "state root mismatch during recovery"
            );
            return Err(RecoveryError::StateRootMismatch {
                height,
                expected: block.header.state_root,
                actual: replayed_root,
            });
        }

        let mut batch = env.write_batch()?;
        batch.put_block(&BlockRecord {
            header: block.header.clone(),
            tx_ids: txids,
            local_committed: true,
            da_committed: true,
            blob_ref: Some(blob_ref.to_string()),
        })?;
        for tx in &block.transactions {
            batch.mark_transaction_included(tx, height)?;
        }
        batch.put_watermark(meta::LAST_DA_HEIGHT_POSTED, height)?;
        batch.commit()?;

        ledger.snapshot_block(height);
        prev_header = block.header;
        height += 1;
    }

    let report = RecoveryReport {
        blocks_replayed: height - 1,
        final_height: prev_header.height,
        final_root: ledger.get_current_state_root(),
    };
    info!(
        blocks = report.blocks_replayed,
        final_height = report.final_height,
        final_root = %report.final_root,
        "recovery complete"
    );
    Ok(report)
}
