//! Abstract storage traits for the Fontana rollup.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits plus the
//! backend's write batch for atomic multi-table flows.

pub mod block;
pub mod error;
pub mod meta;
pub mod transaction;
pub mod utxo;
pub mod vault;

pub use block::{BlockRecord, BlockStore};
pub use error::StoreError;
pub use meta::MetaStore;
pub use transaction::{TransactionStore, TxRecord};
pub use utxo::{UtxoRecord, UtxoStatus, UtxoStore};
pub use vault::{
    VaultDeposit, VaultStore, VaultWithdrawal, WithdrawalStatus,
};
