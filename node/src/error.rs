use thiserror::Error;

use fontana_bridge::BridgeError;
use fontana_da::DaError;
use fontana_ledger::LedgerError;
use fontana_store::StoreError;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("the core writer is no longer running")]
    WriterGone,

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("DA error: {0}")]
    Da(#[from] DaError),
}
