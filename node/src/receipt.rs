//! Provisional receipts for accepted transactions.

use serde::{Deserialize, Serialize};

use fontana_types::{PayloadHash, Timestamp, TxHash};

/// Acknowledgement returned to a submitter once their transaction has been
/// applied and will be included in the next locally committed block.
///
/// Provisional because the block has not reached the DA layer yet; clients
/// wanting DA finality wait `da_confirmation_blocks` and re-query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionalReceipt {
    pub txid: TxHash,
    /// Hash of the API payload this payment covers.
    pub payload_hash: PayloadHash,
    /// Height of the block the transaction will be included in.
    pub block_height: u64,
    /// When the node accepted the transaction.
    pub accepted_at: Timestamp,
}
