//! Vault tables: L1 deposits awaiting mint and withdrawals in flight.

use serde::{Deserialize, Serialize};

use fontana_types::{StateRoot, TiaAmount, Timestamp, TxHash, WalletAddress};

use crate::StoreError;

/// A deposit observed in the L1 vault.
///
/// `l1_tx_hash` is unique: re-delivering the same deposit event is a no-op,
/// so at most one UTXO is ever minted per deposit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultDeposit {
    pub l1_tx_hash: String,
    pub recipient: WalletAddress,
    pub amount: TiaAmount,
    pub l1_height: u64,
    pub timestamp: Timestamp,
    pub processed: bool,
}

/// Lifecycle of a withdrawal signalled by a burn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawalStatus {
    /// Burn applied; proofs not yet extracted.
    Pending,
    /// Proof bundle extracted against the pre-burn root.
    ProofReady,
    /// Finalised on L1.
    Finalised,
}

/// A withdrawal in flight.
///
/// `state_root_at_burn` is the root *before* the burn was applied — the
/// burned inputs were still live under it, which is what the L1 bridge
/// verifies inclusion proofs against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultWithdrawal {
    pub burn_txid: TxHash,
    pub recipient_l1: String,
    pub amount: TiaAmount,
    pub state_root_at_burn: StateRoot,
    /// Serialized proof bundle, once extracted.
    pub proof_bundle: Option<Vec<u8>>,
    pub l1_tx_hash: Option<String>,
    pub status: WithdrawalStatus,
}

/// Trait for vault deposit/withdrawal storage.
pub trait VaultStore {
    /// Fetch a deposit by its L1 transaction hash.
    fn get_deposit(&self, l1_tx_hash: &str) -> Result<Option<VaultDeposit>, StoreError>;

    /// Insert a deposit row. Fails with `Duplicate` if the hash is known.
    fn insert_deposit(&self, deposit: &VaultDeposit) -> Result<(), StoreError>;

    /// Mark a deposit as processed (a mint UTXO exists for it).
    fn mark_deposit_processed(&self, l1_tx_hash: &str) -> Result<(), StoreError>;

    /// Fetch a withdrawal by the burn that signalled it.
    fn get_withdrawal(&self, burn_txid: &TxHash) -> Result<Option<VaultWithdrawal>, StoreError>;

    /// Insert or replace a withdrawal row.
    fn upsert_withdrawal(&self, withdrawal: &VaultWithdrawal) -> Result<(), StoreError>;

    /// All withdrawals in a given status.
    fn withdrawals_in_status(
        &self,
        status: WithdrawalStatus,
    ) -> Result<Vec<VaultWithdrawal>, StoreError>;
}
