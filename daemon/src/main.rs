//! Fontana daemon — entry point for running a rollup node.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use fontana_da::MockDaClient;
use fontana_ledger::GenesisState;
use fontana_node::{recover_from_da, FontanaNode, NodeConfig};
use fontana_store_lmdb::LmdbEnvironment;

#[derive(Parser)]
#[command(name = "fontana-daemon", about = "Fontana rollup node daemon")]
struct Cli {
    /// Storage location for the ledger database.
    #[arg(long, env = "FONTANA_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Genesis file to load on first start.
    #[arg(long, env = "FONTANA_GENESIS_FILE")]
    genesis_file: Option<PathBuf>,

    /// DA node endpoint.
    #[arg(long, env = "FONTANA_DA_NODE_URL")]
    da_node_url: Option<String>,

    /// DA node auth token.
    #[arg(long, env = "FONTANA_DA_AUTH_TOKEN")]
    da_auth_token: Option<String>,

    /// 8-byte DA base namespace (16 hex characters).
    #[arg(long, env = "FONTANA_DA_NAMESPACE")]
    da_namespace: Option<String>,

    /// Sequencer cadence in seconds.
    #[arg(long, env = "FONTANA_BLOCK_INTERVAL_SECONDS")]
    block_interval_seconds: Option<u64>,

    /// Pending-transaction count that triggers immediate block production.
    #[arg(long, env = "FONTANA_MAX_BATCH")]
    max_batch: Option<usize>,

    /// How many historical state roots stay provable.
    #[arg(long, env = "FONTANA_HISTORICAL_ROOTS_KEPT")]
    historical_roots_kept: Option<usize>,

    /// L1 vault address watched for deposits.
    #[arg(long, env = "FONTANA_L1_VAULT_ADDRESS")]
    l1_vault_address: Option<String>,

    /// L1 node endpoint.
    #[arg(long, env = "FONTANA_L1_NODE_URL")]
    l1_node_url: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings are
    /// used as the base; CLI flags and env vars override them.
    #[arg(long, env = "FONTANA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the node.
    Run,
    /// Rebuild local state by replaying blocks from the DA layer.
    Recover,
}

fn effective_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(&path.display().to_string())?,
        None => NodeConfig::default(),
    };

    if let Some(db_path) = &cli.db_path {
        config.db_path = db_path.clone();
    }
    if let Some(genesis_file) = &cli.genesis_file {
        config.genesis_file = Some(genesis_file.clone());
    }
    if let Some(url) = &cli.da_node_url {
        config.da_node_url = Some(url.clone());
    }
    if let Some(token) = &cli.da_auth_token {
        config.da_auth_token = Some(token.clone());
    }
    if let Some(namespace) = &cli.da_namespace {
        config.da_namespace = namespace.clone();
    }
    if let Some(interval) = cli.block_interval_seconds {
        config.block_interval_seconds = interval;
    }
    if let Some(max_batch) = cli.max_batch {
        config.max_batch = Some(max_batch);
    }
    if let Some(kept) = cli.historical_roots_kept {
        config.historical_roots_kept = kept;
    }
    if let Some(vault) = &cli.l1_vault_address {
        config.l1_vault_address = Some(vault.clone());
    }
    if let Some(url) = &cli.l1_node_url {
        config.l1_node_url = Some(url.clone());
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fontana_utils::init_tracing();

    let cli = Cli::parse();
    let config = effective_config(&cli)?;

    // The DA wire protocol lives behind the DaClient trait; this build
    // links the deterministic in-memory layer. A networked client drops in
    // without touching the node.
    if config.da_node_url.is_some() {
        tracing::warn!("da_node_url is set but this build links the in-memory DA layer");
    }
    let da_client = Arc::new(MockDaClient::new());

    match cli.command {
        Command::Run => {
            let node = FontanaNode::start(&config, da_client)?;
            tracing::info!("node running, press Ctrl-C to stop");
            node.wait_for_signal().await;
            node.stop().await?;
        }
        Command::Recover => {
            let genesis_path = config.genesis_file.clone().ok_or_else(|| {
                anyhow::anyhow!("recovery requires a genesis_file in the configuration")
            })?;
            let genesis = GenesisState::from_file(&genesis_path)?;
            let trusted_header = genesis.header();

            let env = Arc::new(LmdbEnvironment::open(&config.db_path, config.db_map_size)?);
            let report = recover_from_da(
                da_client.as_ref(),
                env,
                &genesis,
                &trusted_header,
                config.namespace()?,
                config.historical_roots_kept,
            )
            .await?;
            tracing::info!(
                blocks = report.blocks_replayed,
                final_height = report.final_height,
                final_root = %report.final_root,
                "recovery finished"
            );
        }
    }

    Ok(())
}
