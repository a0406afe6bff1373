//! Node assembly: storage, ledger, writer, and DA poster wired together.
//!
//! Shutdown is a one-shot broadcast owned here: the writer and the poster
//! each hold a subscription and treat a received `()` as the stop order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

use fontana_da::{DaClient, DaPoster, PosterConfig};
use fontana_ledger::{GenesisState, Ledger};
use fontana_store::BlockStore;
use fontana_store_lmdb::{LmdbEnvironment, LmdbError};

use crate::writer::{CoreWriter, NodeHandle};
use crate::{NodeConfig, NodeError};

/// A running Fontana node: the core writer plus the DA poster.
pub struct FontanaNode {
    handle: NodeHandle,
    shutdown_tx: broadcast::Sender<()>,
    env: Arc<LmdbEnvironment>,
    writer_task: JoinHandle<()>,
    poster_task: JoinHandle<()>,
}

impl FontanaNode {
    /// Open storage, load genesis on first start, and spawn the writer and
    /// poster tasks. Must be called within a tokio runtime.
    pub fn start<C: DaClient + 'static>(
        config: &NodeConfig,
        da_client: Arc<C>,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        let namespace = config.namespace()?;

        let env = Arc::new(
            LmdbEnvironment::open(&config.db_path, config.db_map_size)
                .map_err(|e: LmdbError| NodeError::Storage(e.into()))?,
        );

        let mut ledger = Ledger::open(Arc::clone(&env), config.historical_roots_kept)?;
        if env.block_store().block_count()? == 0 {
            let path = config.genesis_file.as_ref().ok_or_else(|| {
                NodeError::Config("fresh database requires a genesis_file".into())
            })?;
            let genesis = GenesisState::from_file(path)?;
            ledger.load_genesis(&genesis)?;
        }

        let chain_id = ledger.chain_id()?.unwrap_or_default();
        let latest = env
            .block_store()
            .get_latest_block()?
            .expect("genesis exists after load");
        info!(
            %chain_id,
            height = latest.header.height,
            state_root = %latest.header.state_root,
            "starting node"
        );

        let (writer, handle) = CoreWriter::new(
            ledger,
            Duration::from_secs(config.block_interval_seconds),
            config.max_batch,
            config.mailbox_capacity,
        )?;

        let (shutdown_tx, _) = broadcast::channel(1);
        let writer_task = tokio::spawn(writer.run(shutdown_tx.subscribe()));

        let poster = DaPoster::new(da_client, Arc::clone(&env), PosterConfig::new(namespace));
        let poster_task = tokio::spawn(poster.run(shutdown_tx.subscribe()));

        Ok(Self {
            handle,
            shutdown_tx,
            env,
            writer_task,
            poster_task,
        })
    }

    /// A cloneable handle for submitting work and queries.
    pub fn handle(&self) -> NodeHandle {
        self.handle.clone()
    }

    /// The underlying storage environment (read-side consumers).
    pub fn environment(&self) -> &Arc<LmdbEnvironment> {
        &self.env
    }

    /// Block until SIGINT/SIGTERM, then initiate shutdown.
    pub async fn wait_for_signal(&self) {
        wait_for_termination().await;
        let _ = self.shutdown_tx.send(());
    }

    /// Cooperative shutdown: the writer drains its mailbox and seals any
    /// in-flight block, the poster abandons pending submits (they retry on
    /// next start), and storage is flushed.
    pub async fn stop(self) -> Result<(), NodeError> {
        info!("stopping node");
        let _ = self.shutdown_tx.send(());
        let _ = self.writer_task.await;
        let _ = self.poster_task.await;
        self.env
            .force_sync()
            .map_err(|e| NodeError::Storage(e.into()))?;
        Ok(())
    }
}

/// Resolve once the process receives SIGINT or, on unix, SIGTERM.
async fn wait_for_termination() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("SIGINT received, shutting down"),
            _ = sigterm.recv() => info!("SIGTERM received, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("SIGINT received, shutting down");
    }
}
