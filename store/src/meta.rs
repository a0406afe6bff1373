//! System variables: schema version and scan/post watermarks.

use crate::StoreError;

/// Watermark key: last L1 height scanned by the vault watcher.
pub const LAST_L1_HEIGHT_SCANNED: &str = "last_l1_height_scanned";
/// Watermark key: last rollup height posted to the DA layer.
pub const LAST_DA_HEIGHT_POSTED: &str = "last_da_height_posted";
/// The chain id recorded at genesis.
pub const CHAIN_ID: &str = "chain_id";

/// Trait for storing database metadata and watermarks.
pub trait MetaStore {
    /// Store a metadata value.
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Retrieve a metadata value.
    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Read a u64 watermark (absent = 0).
    fn get_watermark(&self, key: &str) -> Result<u64, StoreError> {
        match self.get_meta(key)? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .try_into()
                    .map_err(|_| StoreError::Corruption(format!("bad watermark {key}")))?;
                Ok(u64::from_be_bytes(arr))
            }
            None => Ok(0),
        }
    }

    /// Write a u64 watermark.
    fn put_watermark(&self, key: &str, value: u64) -> Result<(), StoreError> {
        self.put_meta(key, &value.to_be_bytes())
    }
}
