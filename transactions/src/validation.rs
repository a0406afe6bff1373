//! Stateless transaction validation.
//!
//! This performs structural validation only. Stateful checks (inputs exist
//! and are unspent, ownership, conservation) are done by the ledger.

use std::collections::HashSet;

use crate::{SignedTransaction, TxError, TxKind};

/// Validate a transaction's structure and canonical form.
pub fn validate_structure(tx: &SignedTransaction) -> Result<(), TxError> {
    for output in &tx.outputs {
        if output.amount.is_zero() {
            return Err(TxError::ZeroAmount);
        }
    }

    match &tx.kind {
        TxKind::Transfer => {
            if tx.inputs.is_empty() {
                return Err(TxError::NoInputs);
            }
            if tx.outputs.is_empty() {
                return Err(TxError::NoOutputs);
            }
        }
        TxKind::Mint { l1_tx_hash } => {
            if !tx.inputs.is_empty() {
                return Err(TxError::MintWithInputs);
            }
            if tx.outputs.len() != 1 {
                return Err(TxError::MintOutputCount);
            }
            if !tx.fee.is_zero() {
                return Err(TxError::MintWithFee);
            }
            if l1_tx_hash.is_empty() {
                return Err(TxError::MintMissingDeposit);
            }
        }
        TxKind::Burn { l1_recipient } => {
            if tx.inputs.is_empty() {
                return Err(TxError::NoInputs);
            }
            if tx.outputs.len() > 1 {
                return Err(TxError::BurnTooManyOutputs);
            }
            if l1_recipient.is_empty() {
                return Err(TxError::BurnMissingRecipient);
            }
        }
    }

    let mut seen = HashSet::with_capacity(tx.inputs.len());
    for input in &tx.inputs {
        if !seen.insert(input) {
            return Err(TxError::DuplicateInput(input.to_string()));
        }
    }

    if tx.compute_txid() != tx.txid {
        return Err(TxError::TxidMismatch);
    }

    Ok(())
}
