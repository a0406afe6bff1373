//! Block table: locally committed headers and their DA status.

use serde::{Deserialize, Serialize};

use fontana_transactions::BlockHeader;
use fontana_types::TxHash;

use crate::StoreError;

/// A persisted block.
///
/// Once `local_committed` is true the header and transaction membership are
/// immutable; only `da_committed` and `blob_ref` may transition, and
/// `da_committed` implies `blob_ref` is present.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub header: BlockHeader,
    pub tx_ids: Vec<TxHash>,
    pub local_committed: bool,
    pub da_committed: bool,
    pub blob_ref: Option<String>,
}

/// Trait for block storage.
pub trait BlockStore {
    /// Fetch a block record by height.
    fn get_block(&self, height: u64) -> Result<Option<BlockRecord>, StoreError>;

    /// Fetch just the header at a height.
    fn get_block_header(&self, height: u64) -> Result<Option<BlockHeader>, StoreError> {
        Ok(self.get_block(height)?.map(|r| r.header))
    }

    /// The highest locally committed block, if any.
    fn get_latest_block(&self) -> Result<Option<BlockRecord>, StoreError>;

    /// Blocks not yet committed to the DA layer, ascending by height.
    fn fetch_uncommitted_blocks(&self) -> Result<Vec<BlockRecord>, StoreError>;

    /// Record a successful DA submission for the block at `height`.
    ///
    /// This is the only mutation allowed on a locally committed block.
    fn mark_block_da_committed(&self, height: u64, blob_ref: &str) -> Result<(), StoreError>;

    /// Number of locally committed blocks.
    fn block_count(&self) -> Result<u64, StoreError>;
}
