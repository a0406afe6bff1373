//! The DA posting loop.
//!
//! Watches for locally committed blocks that have not reached the DA layer
//! and ships them in strict height order: a block at height H is not posted
//! until every lower height is DA-committed, so replay from DA is
//! deterministic. Submission is at-least-once — a crash after submit but
//! before the local mark simply re-posts the same bytes on restart.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use fontana_store::{BlockRecord, BlockStore, MetaStore, StoreError, TransactionStore};
use fontana_store_lmdb::LmdbEnvironment;
use fontana_transactions::Block;

use crate::{encode_block, DaClient, DaError, Namespace};

/// Poster tuning knobs.
#[derive(Clone, Debug)]
pub struct PosterConfig {
    /// Base namespace from configuration (16 hex chars).
    pub namespace: Namespace,
    /// How often to poll for uncommitted blocks.
    pub poll_interval: Duration,
    /// First retry delay after a transient failure; doubles per attempt.
    pub initial_backoff: Duration,
    /// Transient retries per block before yielding back to the poll loop.
    pub max_retries: u32,
}

impl PosterConfig {
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            poll_interval: Duration::from_secs(2),
            initial_backoff: Duration::from_millis(500),
            max_retries: 3,
        }
    }
}

/// The DA poster daemon.
///
/// Runs on its own task; its only writes are `da_committed`/`blob_ref`
/// flips and the posted-height watermark, a write set disjoint from the
/// core writer's.
pub struct DaPoster<C: DaClient> {
    client: Arc<C>,
    env: Arc<LmdbEnvironment>,
    config: PosterConfig,
}

impl<C: DaClient> DaPoster<C> {
    pub fn new(client: Arc<C>, env: Arc<LmdbEnvironment>, config: PosterConfig) -> Self {
        Self {
            client,
            env,
            config,
        }
    }

    /// Run until shutdown is signalled. A pending submit is abandoned on
    /// shutdown; the block stays uncommitted and is retried on next start.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(namespace = %self.config.namespace, "DA poster started");
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("DA poster shutting down");
                    return;
                }
                result = self.post_pending() => {
                    match result {
                        Ok(0) => {}
                        Ok(posted) => debug!(posted, "DA pass complete"),
                        Err(DaError::Permanent(reason)) => {
                            // Local state stays untouched; the block remains
                            // uncommitted until the operator intervenes.
                            error!(%reason, "permanent DA failure, block not posted");
                        }
                        Err(DaError::Transient(reason)) => {
                            warn!(%reason, "DA submission failing, will retry");
                        }
                    }
                }
            }

            tokio::select! {
                _ = shutdown.recv() => {
                    info!("DA poster shutting down");
                    return;
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }

    /// One pass: post every uncommitted block in height order. Returns how
    /// many blocks were committed, stopping at the first block that cannot
    /// be posted so later heights never overtake it.
    pub async fn post_pending(&self) -> Result<usize, DaError> {
        let uncommitted = self
            .env
            .block_store()
            .fetch_uncommitted_blocks()
            .map_err(storage_transient)?;

        let mut posted = 0usize;
        for record in uncommitted {
            self.post_block(&record).await?;
            posted += 1;
        }
        Ok(posted)
    }

    /// Post a single block with bounded transient retries.
    async fn post_block(&self, record: &BlockRecord) -> Result<(), DaError> {
        let height = record.header.height;
        let block = self.load_block(record)?;
        let bytes = encode_block(&block);
        let namespace = self.config.namespace.for_height(height);

        let mut backoff = self.config.initial_backoff;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.client.submit_blob(namespace, bytes.clone()).await {
                Ok(blob_ref) => {
                    let blob_ref = blob_ref.to_string();
                    self.env
                        .block_store()
                        .mark_block_da_committed(height, &blob_ref)
                        .map_err(storage_transient)?;
                    self.env
                        .meta_store()
                        .put_watermark(fontana_store::meta::LAST_DA_HEIGHT_POSTED, height)
                        .map_err(storage_transient)?;
                    info!(height, %blob_ref, "block committed to DA");
                    return Ok(());
                }
                Err(DaError::Transient(reason)) if attempt <= self.config.max_retries => {
                    warn!(height, attempt, %reason, "DA submit failed, backing off");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Reassemble the full block from storage for encoding.
    fn load_block(&self, record: &BlockRecord) -> Result<Block, DaError> {
        let tx_store = self.env.transaction_store();
        let mut transactions = Vec::with_capacity(record.tx_ids.len());
        for txid in &record.tx_ids {
            let tx_record = tx_store
                .get_transaction(txid)
                .map_err(storage_transient)?
                .ok_or_else(|| {
                    DaError::Permanent(format!(
                        "block {} references missing transaction {txid}",
                        record.header.height
                    ))
                })?;
            transactions.push(tx_record.tx);
        }
        Ok(Block {
            header: record.header.clone(),
            transactions,
        })
    }
}

fn storage_transient(e: StoreError) -> DaError {
    DaError::Transient(format!("storage error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::MockDaClient;
    use fontana_crypto::{derive_address, keypair_from_seed};
    use fontana_ledger::{GenesisState, GenesisUtxo, Ledger};
    use fontana_sequencer::Sequencer;
    use fontana_types::{TiaAmount, Timestamp};

    fn test_ledger() -> (tempfile::TempDir, Ledger) {
        let dir = tempfile::tempdir().expect("tempdir");
        let env = Arc::new(
            LmdbEnvironment::open(dir.path(), 10 * 1024 * 1024).expect("open env"),
        );
        let genesis = GenesisState {
            chain_id: "fontana-test".into(),
            timestamp: Timestamp::new(1_700_000_000),
            utxos: vec![GenesisUtxo {
                recipient: derive_address(&keypair_from_seed(&[1u8; 32]).public),
                amount: TiaAmount::new(100),
            }],
            description: None,
        };
        let mut ledger = Ledger::open(env, 4).expect("open ledger");
        ledger.load_genesis(&genesis).expect("genesis");
        (dir, ledger)
    }

    fn poster_config() -> PosterConfig {
        PosterConfig {
            namespace: Namespace::from_hex("00f0e1d2c3b4a596").unwrap(),
            poll_interval: Duration::from_millis(10),
            initial_backoff: Duration::from_millis(1),
            max_retries: 3,
        }
    }

    #[tokio::test]
    async fn posts_blocks_in_height_order() {
        let (_dir, mut ledger) = test_ledger();
        for i in 0..3u64 {
            Sequencer::build_block(&mut ledger, Timestamp::new(1_700_000_006 + i * 6))
                .expect("build");
        }

        let client = Arc::new(MockDaClient::new());
        let env = Arc::clone(ledger.environment());
        let poster = DaPoster::new(Arc::clone(&client), Arc::clone(&env), poster_config());

        let posted = poster.post_pending().await.expect("post");
        assert_eq!(posted, 3);
        assert_eq!(client.blob_count(), 3);

        // All committed, references recorded, watermark advanced.
        assert!(env.block_store().fetch_uncommitted_blocks().unwrap().is_empty());
        for height in 1..=3u64 {
            let record = env.block_store().get_block(height).unwrap().unwrap();
            assert!(record.da_committed);
            let blob_ref = record.blob_ref.expect("blob ref recorded");
            assert!(blob_ref.starts_with("da:"));
        }
        assert_eq!(
            env.meta_store()
                .get_watermark(fontana_store::meta::LAST_DA_HEIGHT_POSTED)
                .unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn posted_blob_decodes_back_to_block() {
        let (_dir, mut ledger) = test_ledger();
        let block =
            Sequencer::build_block(&mut ledger, Timestamp::new(1_700_000_006)).expect("build");

        let client = Arc::new(MockDaClient::new());
        let env = Arc::clone(ledger.environment());
        let poster = DaPoster::new(Arc::clone(&client), Arc::clone(&env), poster_config());
        poster.post_pending().await.expect("post");

        let record = env.block_store().get_block(1).unwrap().unwrap();
        let blob_ref = crate::BlobRef::parse(&record.blob_ref.unwrap()).unwrap();
        let bytes = client.fetch_blob(&blob_ref).await.unwrap();
        let decoded = crate::decode_block(&bytes).unwrap();
        assert_eq!(decoded, block);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let (_dir, mut ledger) = test_ledger();
        Sequencer::build_block(&mut ledger, Timestamp::new(1_700_000_006)).expect("build");

        let client = Arc::new(MockDaClient::new());
        client.inject_failures(2);
        let env = Arc::clone(ledger.environment());
        let poster = DaPoster::new(Arc::clone(&client), Arc::clone(&env), poster_config());

        let posted = poster.post_pending().await.expect("post despite failures");
        assert_eq!(posted, 1);
        assert!(env.block_store().get_block(1).unwrap().unwrap().da_committed);
    }

    #[tokio::test]
    async fn exhausted_retries_leave_block_uncommitted() {
        let (_dir, mut ledger) = test_ledger();
        Sequencer::build_block(&mut ledger, Timestamp::new(1_700_000_006)).expect("build");
        Sequencer::build_block(&mut ledger, Timestamp::new(1_700_000_012)).expect("build");

        let client = Arc::new(MockDaClient::new());
        client.inject_failures(100);
        let env = Arc::clone(ledger.environment());
        let poster = DaPoster::new(Arc::clone(&client), Arc::clone(&env), poster_config());

        let result = poster.post_pending().await;
        assert!(result.is_err());

        // Neither block advanced: height 2 never overtakes a stuck height 1.
        let uncommitted = env.block_store().fetch_uncommitted_blocks().unwrap();
        assert_eq!(uncommitted.len(), 2);
    }

    #[tokio::test]
    async fn retry_after_outage_resumes_where_it_left_off() {
        let (_dir, mut ledger) = test_ledger();
        Sequencer::build_block(&mut ledger, Timestamp::new(1_700_000_006)).expect("build");

        let client = Arc::new(MockDaClient::new());
        client.inject_failures(100);
        let env = Arc::clone(ledger.environment());
        let poster = DaPoster::new(Arc::clone(&client), Arc::clone(&env), poster_config());
        assert!(poster.post_pending().await.is_err());

        // Outage ends.
        client.inject_failures(0);
        let posted = poster.post_pending().await.expect("post");
        assert_eq!(posted, 1);
    }
}
