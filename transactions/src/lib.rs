//! Fontana transaction types and their validation logic.
//!
//! Transaction kinds:
//! - **Transfer**: spend UTXOs, pay one or more recipients plus a fee
//! - **Mint**: credit an L1 vault deposit (synthesized by the node, no inputs)
//! - **Burn**: spend UTXOs to signal an L1 withdrawal (at most one change output)
//!
//! The txid is the Blake2b-256 hash of the canonical encoding of everything
//! except the signature; the signature covers the txid bytes.

pub mod block;
pub mod canonical;
pub mod error;
pub mod validation;

use serde::{Deserialize, Serialize};

use fontana_types::{
    PayloadHash, PrivateKey, PublicKey, Signature, TiaAmount, Timestamp, TxHash, UtxoRef,
    WalletAddress,
};

pub use block::{tx_merkle_root, Block, BlockHeader};
pub use error::TxError;

/// A new output being created by a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub recipient: WalletAddress,
    pub amount: TiaAmount,
}

/// The operation a transaction performs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxKind {
    /// Ordinary UTXO transfer.
    Transfer,
    /// Deposit mint. Carries the unique L1 transaction hash so a deposit
    /// can mint at most once.
    Mint { l1_tx_hash: String },
    /// Withdrawal burn. Carries the L1 address the vault should pay out to.
    Burn { l1_recipient: String },
}

impl TxKind {
    pub fn is_mint(&self) -> bool {
        matches!(self, TxKind::Mint { .. })
    }

    pub fn is_burn(&self) -> bool {
        matches!(self, TxKind::Burn { .. })
    }
}

/// A signed Fontana transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub txid: TxHash,
    pub kind: TxKind,
    pub sender_pubkey: PublicKey,
    pub inputs: Vec<UtxoRef>,
    pub outputs: Vec<TxOutput>,
    pub fee: TiaAmount,
    /// Binds the payment to an off-chain API payload for receipts.
    pub payload_hash: PayloadHash,
    pub timestamp: Timestamp,
    pub signature: Signature,
}

impl SignedTransaction {
    /// Recompute the txid from the transaction contents.
    ///
    /// Transfers and burns hash their canonical encoding (without the
    /// signature). Mints are keyed by their L1 deposit instead, so the same
    /// deposit can never mint twice.
    pub fn compute_txid(&self) -> TxHash {
        match &self.kind {
            TxKind::Mint { l1_tx_hash } => TxHash::new(fontana_crypto::blake2b_256_multi(&[
                b"mint",
                l1_tx_hash.as_bytes(),
            ])),
            _ => fontana_crypto::hash_transaction(&canonical::unsigned_bytes(self)),
        }
    }

    /// The sender's wallet address, derived from the embedded public key.
    pub fn sender_address(&self) -> WalletAddress {
        fontana_crypto::derive_address(&self.sender_pubkey)
    }

    /// References to the outputs this transaction creates.
    pub fn output_refs(&self) -> impl Iterator<Item = (UtxoRef, &TxOutput)> {
        self.outputs
            .iter()
            .enumerate()
            .map(|(i, out)| (UtxoRef::new(self.txid, i as u32), out))
    }

    /// Build and sign a transfer.
    pub fn transfer(
        inputs: Vec<UtxoRef>,
        outputs: Vec<TxOutput>,
        fee: TiaAmount,
        payload_hash: PayloadHash,
        timestamp: Timestamp,
        sender_pubkey: PublicKey,
        signing_key: &PrivateKey,
    ) -> Self {
        Self::build_signed(
            TxKind::Transfer,
            inputs,
            outputs,
            fee,
            payload_hash,
            timestamp,
            sender_pubkey,
            signing_key,
        )
    }

    /// Build and sign a withdrawal burn.
    pub fn burn(
        inputs: Vec<UtxoRef>,
        change: Option<TxOutput>,
        fee: TiaAmount,
        l1_recipient: String,
        timestamp: Timestamp,
        sender_pubkey: PublicKey,
        signing_key: &PrivateKey,
    ) -> Self {
        Self::build_signed(
            TxKind::Burn { l1_recipient },
            inputs,
            change.into_iter().collect(),
            fee,
            PayloadHash::ZERO,
            timestamp,
            sender_pubkey,
            signing_key,
        )
    }

    /// Build a deposit mint.
    ///
    /// Mints are synthesized by the node itself and carry no signature; their
    /// txid is `H("mint" ‖ l1_tx_hash)` so each deposit mints at most once.
    pub fn mint(
        l1_tx_hash: String,
        recipient: WalletAddress,
        amount: TiaAmount,
        timestamp: Timestamp,
    ) -> Self {
        let txid = TxHash::new(fontana_crypto::blake2b_256_multi(&[
            b"mint",
            l1_tx_hash.as_bytes(),
        ]));
        Self {
            txid,
            kind: TxKind::Mint { l1_tx_hash },
            sender_pubkey: PublicKey::ZERO,
            inputs: Vec::new(),
            outputs: vec![TxOutput { recipient, amount }],
            fee: TiaAmount::ZERO,
            payload_hash: PayloadHash::ZERO,
            timestamp,
            signature: Signature::ZERO,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build_signed(
        kind: TxKind,
        inputs: Vec<UtxoRef>,
        outputs: Vec<TxOutput>,
        fee: TiaAmount,
        payload_hash: PayloadHash,
        timestamp: Timestamp,
        sender_pubkey: PublicKey,
        signing_key: &PrivateKey,
    ) -> Self {
        let mut tx = Self {
            txid: TxHash::ZERO,
            kind,
            sender_pubkey,
            inputs,
            outputs,
            fee,
            payload_hash,
            timestamp,
            signature: Signature::ZERO,
        };
        tx.txid = tx.compute_txid();
        tx.signature = fontana_crypto::sign_message(tx.txid.as_bytes(), signing_key);
        tx
    }
}
