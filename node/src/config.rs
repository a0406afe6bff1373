//! Node configuration with TOML file support.
//!
//! Every option is also reachable through `FONTANA_*` environment
//! variables via the daemon's CLI layer; the file supplies the base and
//! flags override it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use fontana_da::Namespace;

use crate::NodeError;

/// Configuration for a Fontana node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Storage location for the LMDB environment.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// LMDB map size in bytes.
    #[serde(default = "default_db_map_size")]
    pub db_map_size: usize,

    /// Genesis file to load on first start (JSON).
    #[serde(default)]
    pub genesis_file: Option<PathBuf>,

    /// DA node endpoint.
    #[serde(default)]
    pub da_node_url: Option<String>,

    /// DA node auth token.
    #[serde(default)]
    pub da_auth_token: Option<String>,

    /// 8-byte DA base namespace as 16 hex characters.
    #[serde(default = "default_da_namespace")]
    pub da_namespace: String,

    /// DA-side finality depth used by clients.
    #[serde(default = "default_da_confirmation_blocks")]
    pub da_confirmation_blocks: u64,

    /// Sequencer cadence in seconds.
    #[serde(default = "default_block_interval")]
    pub block_interval_seconds: u64,

    /// Pending-transaction count that triggers immediate block production.
    #[serde(default)]
    pub max_batch: Option<usize>,

    /// How many historical state roots stay provable.
    #[serde(default = "default_historical_roots_kept")]
    pub historical_roots_kept: usize,

    /// L1 vault address watched for deposits.
    #[serde(default)]
    pub l1_vault_address: Option<String>,

    /// L1 node endpoint for the vault watcher.
    #[serde(default)]
    pub l1_node_url: Option<String>,

    /// Vault watcher poll interval in seconds.
    #[serde(default = "default_l1_poll_interval")]
    pub l1_poll_interval_seconds: u64,

    /// Core-writer mailbox capacity (backpressure bound).
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_db_path() -> PathBuf {
    PathBuf::from("./fontana_data")
}

fn default_db_map_size() -> usize {
    1 << 30
}

fn default_da_namespace() -> String {
    // "fontana1" in hex.
    "666f6e74616e6131".to_string()
}

fn default_da_confirmation_blocks() -> u64 {
    2
}

fn default_block_interval() -> u64 {
    6
}

fn default_historical_roots_kept() -> usize {
    default_da_confirmation_blocks() as usize
}

fn default_l1_poll_interval() -> u64 {
    10
}

fn default_mailbox_capacity() -> usize {
    1024
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: NodeConfig = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("NodeConfig is always serializable to TOML")
    }

    /// Reject configurations the node cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        self.namespace()?;
        if self.block_interval_seconds == 0 {
            return Err(NodeError::Config(
                "block_interval_seconds must be positive".into(),
            ));
        }
        if self.historical_roots_kept == 0 {
            return Err(NodeError::Config(
                "historical_roots_kept must be positive".into(),
            ));
        }
        if self.mailbox_capacity == 0 {
            return Err(NodeError::Config("mailbox_capacity must be positive".into()));
        }
        Ok(())
    }

    /// The parsed base namespace.
    pub fn namespace(&self) -> Result<Namespace, NodeError> {
        Namespace::from_hex(&self.da_namespace)
            .map_err(|e| NodeError::Config(format!("da_namespace: {e}")))
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            db_map_size: default_db_map_size(),
            genesis_file: None,
            da_node_url: None,
            da_auth_token: None,
            da_namespace: default_da_namespace(),
            da_confirmation_blocks: default_da_confirmation_blocks(),
            block_interval_seconds: default_block_interval(),
            max_batch: None,
            historical_roots_kept: default_historical_roots_kept(),
            l1_vault_address: None,
            l1_node_url: None,
            l1_poll_interval_seconds: default_l1_poll_interval(),
            mailbox_capacity: default_mailbox_capacity(),
        }
    }
}
