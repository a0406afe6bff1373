//! The L1 bridge handler.
//!
//! Translates vault events into ledger operations: deposits become mints,
//! withdrawal confirmations finalise burns, and pending withdrawals get
//! Merkle proof bundles extracted against the pre-burn state root for the
//! external L1 processor.

pub mod error;
pub mod handler;
pub mod proofs;

pub use error::BridgeError;
pub use handler::{handle_deposit_received, handle_withdrawal_confirmed};
pub use proofs::{build_proof_bundle, WithdrawalProofBundle};
