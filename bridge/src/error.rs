use thiserror::Error;

use fontana_ledger::LedgerError;
use fontana_store::StoreError;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("deposit event is malformed: {0}")]
    MalformedDeposit(String),

    #[error("no withdrawal recorded for burn {0}")]
    UnknownBurn(String),

    #[error("burn transaction {0} is not in the ledger")]
    MissingBurnTransaction(String),

    #[error("burned input {utxo} is not provable under the pre-burn root: {reason}")]
    InputNotProvable { utxo: String, reason: String },

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}
