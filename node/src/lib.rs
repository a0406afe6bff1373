//! The Fontana full node — orchestrates the rollup pipeline.
//!
//! One writer task owns the ledger and the sequencer cadence; ingress
//! (transactions, bridge events) flows through a bounded mailbox, the DA
//! poster runs as a sibling task with a disjoint write set, and recovery
//! can rebuild the whole state from the DA layer and a trusted genesis.

pub mod config;
pub mod error;
pub mod node;
pub mod receipt;
pub mod recovery;
pub mod writer;

pub use config::NodeConfig;
pub use error::NodeError;
pub use node::FontanaNode;
pub use receipt::ProvisionalReceipt;
pub use recovery::{recover_from_da, RecoveryError, RecoveryReport};
pub use writer::{CoreWriter, NodeHandle, WriterMessage};
