use thiserror::Error;

/// Stateless (structural) transaction validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TxError {
    #[error("transaction must have at least one input")]
    NoInputs,

    #[error("transaction must have at least one output")]
    NoOutputs,

    #[error("output amount must be non-zero")]
    ZeroAmount,

    #[error("duplicate input: {0}")]
    DuplicateInput(String),

    #[error("mint transactions cannot spend inputs")]
    MintWithInputs,

    #[error("mint transactions must credit exactly one output")]
    MintOutputCount,

    #[error("mint transactions must carry zero fee")]
    MintWithFee,

    #[error("mint transaction is missing its L1 deposit hash")]
    MintMissingDeposit,

    #[error("burn transactions allow at most one change output")]
    BurnTooManyOutputs,

    #[error("burn transaction is missing its L1 recipient")]
    BurnMissingRecipient,

    #[error("txid does not match transaction contents")]
    TxidMismatch,

    #[error("malformed transaction: {0}")]
    Malformed(String),
}
