//! LMDB storage backend for the Fontana rollup.
//!
//! Implements all storage traits from `fontana-store` using the `heed` LMDB
//! bindings. Each logical table maps to one or more LMDB databases within a
//! single environment; multi-table flows (transaction apply, block persist)
//! go through [`write_batch::WriteBatch`] so they commit atomically.

pub mod block;
pub mod environment;
pub mod error;
pub mod meta;
pub mod transaction;
pub mod utxo;
pub mod vault;
pub mod write_batch;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use write_batch::WriteBatch;

/// Increment a byte prefix in place to form an exclusive upper range bound.
///
/// Every prefix used here is an ASCII wallet address, so at least one byte
/// is below 0xFF and the increment always terminates.
pub(crate) fn increment_prefix(prefix: &mut Vec<u8>) {
    for i in (0..prefix.len()).rev() {
        if prefix[i] < 0xFF {
            prefix[i] += 1;
            prefix.truncate(i + 1);
            return;
        }
    }
    unreachable!("prefixes are ASCII addresses");
}
