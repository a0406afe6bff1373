//! Deposit and withdrawal event handling.

use tracing::{info, warn};

use fontana_ledger::{Ledger, WithdrawalConfirmation};
use fontana_store::{meta, MetaStore, VaultDeposit};

use crate::BridgeError;

/// Handle a deposit observed in the L1 vault.
///
/// Idempotent on `l1_tx_hash`: the ledger guards re-delivery, so the vault
/// watcher may replay events freely after a restart.
pub fn handle_deposit_received(
    deposit: &VaultDeposit,
    ledger: &mut Ledger,
) -> Result<(), BridgeError> {
    if deposit.l1_tx_hash.is_empty() {
        return Err(BridgeError::MalformedDeposit(
            "deposit has no L1 transaction hash".into(),
        ));
    }
    if deposit.amount.is_zero() {
        return Err(BridgeError::MalformedDeposit(format!(
            "deposit {} has zero amount",
            deposit.l1_tx_hash
        )));
    }

    info!(
        l1_tx_hash = %deposit.l1_tx_hash,
        recipient = %deposit.recipient,
        amount = %deposit.amount,
        l1_height = deposit.l1_height,
        "processing vault deposit"
    );
    ledger.process_deposit_event(deposit)?;

    // Advance the watcher watermark so a restart resumes the L1 scan from
    // the newest height seen.
    let meta_store = ledger.environment().meta_store();
    if deposit.l1_height > meta_store.get_watermark(meta::LAST_L1_HEIGHT_SCANNED)? {
        meta_store.put_watermark(meta::LAST_L1_HEIGHT_SCANNED, deposit.l1_height)?;
    }
    Ok(())
}

/// Handle an L1 confirmation of a withdrawal payout.
///
/// A confirmation for an unknown burn is a hard error — it means the L1
/// processor paid out something this node never burned.
pub fn handle_withdrawal_confirmed(
    confirmation: &WithdrawalConfirmation,
    ledger: &mut Ledger,
) -> Result<(), BridgeError> {
    info!(
        burn_txid = %confirmation.burn_txid,
        l1_tx_hash = %confirmation.l1_tx_hash,
        "processing withdrawal confirmation"
    );
    ledger.process_withdrawal_event(confirmation).map_err(|e| {
        if matches!(e, fontana_ledger::LedgerError::UnknownWithdrawal(_)) {
            warn!(burn_txid = %confirmation.burn_txid, "confirmation for unknown burn");
            BridgeError::UnknownBurn(confirmation.burn_txid.to_string())
        } else {
            BridgeError::Ledger(e)
        }
    })
}
