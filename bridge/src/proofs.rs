//! Withdrawal proof extraction.
//!
//! The external L1 processor needs, for every input a burn spent, a Merkle
//! inclusion proof against the pre-burn state root. This module bundles
//! those proofs, persists them on the withdrawal row, and transitions it to
//! `ProofReady`.

use serde::{Deserialize, Serialize};
use tracing::info;

use fontana_ledger::Ledger;
use fontana_merkle::MerkleProof;
use fontana_store::{TransactionStore, VaultStore, WithdrawalStatus};
use fontana_types::{StateRoot, TxHash, UtxoRef};

use crate::BridgeError;

/// Everything the L1 bridge needs to finalise one withdrawal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalProofBundle {
    pub burn_txid: TxHash,
    pub state_root: StateRoot,
    pub proofs: Vec<(UtxoRef, MerkleProof)>,
}

/// Extract inclusion proofs for every input the burn spent, against the
/// pre-burn root recorded on the withdrawal.
///
/// On success the serialized bundle is stored on the withdrawal row and the
/// status moves `Pending → ProofReady`. Calling again simply rebuilds the
/// bundle (the operation is idempotent).
pub fn build_proof_bundle(
    ledger: &mut Ledger,
    burn_txid: &TxHash,
) -> Result<WithdrawalProofBundle, BridgeError> {
    let vault = ledger.environment().vault_store();
    let mut withdrawal = vault
        .get_withdrawal(burn_txid)?
        .ok_or_else(|| BridgeError::UnknownBurn(burn_txid.to_string()))?;

    let burn = ledger
        .environment()
        .transaction_store()
        .get_transaction(burn_txid)?
        .ok_or_else(|| BridgeError::MissingBurnTransaction(burn_txid.to_string()))?;

    let root = withdrawal.state_root_at_burn;
    let mut proofs = Vec::with_capacity(burn.tx.inputs.len());
    for input in &burn.tx.inputs {
        let proof = ledger
            .generate_utxo_proof(input, &root)
            .map_err(|e| BridgeError::InputNotProvable {
                utxo: input.to_string(),
                reason: e.to_string(),
            })?;
        if !proof.is_inclusion() {
            return Err(BridgeError::InputNotProvable {
                utxo: input.to_string(),
                reason: "absent under the pre-burn root".into(),
            });
        }
        proofs.push((*input, proof));
    }

    let bundle = WithdrawalProofBundle {
        burn_txid: *burn_txid,
        state_root: root,
        proofs,
    };

    withdrawal.proof_bundle = Some(bincode::serialize(&bundle).map_err(|e| {
        BridgeError::Storage(fontana_store::StoreError::Serialization(e.to_string()))
    })?);
    if withdrawal.status == WithdrawalStatus::Pending {
        withdrawal.status = WithdrawalStatus::ProofReady;
    }
    vault.upsert_withdrawal(&withdrawal)?;

    info!(
        burn_txid = %burn_txid,
        inputs = bundle.proofs.len(),
        state_root = %root,
        "withdrawal proof bundle ready"
    );
    Ok(bundle)
}
