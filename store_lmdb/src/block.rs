//! LMDB implementation of BlockStore.
//!
//! Primary key: `height_be(8)`, so key order equals height order and the
//! latest block is the last entry.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use fontana_store::{BlockRecord, BlockStore, StoreError};

use crate::LmdbError;

pub struct LmdbBlockStore {
    pub(crate) env: Arc<Env>,
    pub(crate) blocks_db: Database<Bytes, Bytes>,
}

impl BlockStore for LmdbBlockStore {
    fn get_block(&self, height: u64) -> Result<Option<BlockRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .blocks_db
            .get(&rtxn, &height.to_be_bytes())
            .map_err(LmdbError::from)?;
        match val {
            Some(bytes) => {
                let record: BlockRecord =
                    bincode::deserialize(bytes).map_err(LmdbError::from)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn get_latest_block(&self) -> Result<Option<BlockRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let last = self.blocks_db.last(&rtxn).map_err(LmdbError::from)?;
        match last {
            Some((_, bytes)) => {
                let record: BlockRecord =
                    bincode::deserialize(bytes).map_err(LmdbError::from)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn fetch_uncommitted_blocks(&self) -> Result<Vec<BlockRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.blocks_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for entry in iter {
            let (_, bytes) = entry.map_err(LmdbError::from)?;
            let record: BlockRecord = bincode::deserialize(bytes).map_err(LmdbError::from)?;
            if !record.da_committed {
                results.push(record);
            }
        }
        Ok(results)
    }

    fn mark_block_da_committed(&self, height: u64, blob_ref: &str) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let key = height.to_be_bytes();
        let bytes = self
            .blocks_db
            .get(&wtxn, &key)
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("block at height {height}")))?;
        let mut record: BlockRecord = bincode::deserialize(bytes).map_err(LmdbError::from)?;

        record.da_committed = true;
        record.blob_ref = Some(blob_ref.to_string());

        let encoded = bincode::serialize(&record).map_err(LmdbError::from)?;
        self.blocks_db
            .put(&mut wtxn, &key, &encoded)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn block_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.blocks_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }
}
