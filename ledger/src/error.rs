use thiserror::Error;

use fontana_merkle::MerkleError;
use fontana_store::StoreError;
use fontana_transactions::TxError;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("input not found: {utxo}")]
    InputNotFound { utxo: String },

    #[error("input already spent: {utxo}")]
    InputAlreadySpent { utxo: String },

    #[error("input {utxo} does not belong to the sender")]
    InputNotOwned { utxo: String },

    #[error("insufficient funds: inputs {inputs} cannot cover {required}")]
    InsufficientFunds { inputs: u64, required: u64 },

    #[error("conservation violation: inputs {inputs}, outputs plus fee {outputs_plus_fee}")]
    ConservationViolation { inputs: u64, outputs_plus_fee: u64 },

    #[error("burn change output must pay the sender")]
    BurnChangeNotSender,

    #[error("amount overflow")]
    AmountOverflow,

    #[error("malformed transaction: {0}")]
    Malformed(#[from] TxError),

    #[error("duplicate transaction: {0}")]
    DuplicateTransaction(String),

    #[error("genesis has already been loaded")]
    GenesisAlreadyLoaded,

    #[error("ledger has no genesis block")]
    GenesisMissing,

    #[error("unknown withdrawal for burn {0}")]
    UnknownWithdrawal(String),

    #[error("proof error: {0}")]
    Proof(#[from] MerkleError),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl LedgerError {
    /// Whether this error is a validation failure (no state was mutated and
    /// the submitter should not retry the identical transaction).
    pub fn is_validation(&self) -> bool {
        !matches!(self, LedgerError::Storage(_) | LedgerError::Proof(_))
    }
}
