//! Block and header types for the rollup chain.

use serde::{Deserialize, Serialize};

use fontana_types::{BlockHash, StateRoot, Timestamp, TxHash};

use crate::SignedTransaction;

/// Canonical header encoding version.
const HEADER_VERSION: u8 = 1;

/// A rollup block header.
///
/// `state_root` is the sparse Merkle root observed immediately after
/// applying the block's transactions in order. Headers form a hash chain:
/// `prev_hash` is the hash of the previous header's canonical encoding, and
/// the genesis header has `prev_hash = BlockHash::ZERO`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub height: u64,
    pub prev_hash: BlockHash,
    pub state_root: StateRoot,
    pub tx_merkle_root: TxHash,
    pub timestamp: Timestamp,
    pub tx_count: u32,
}

impl BlockHeader {
    /// Canonical encoding, hashed for `prev_hash` chaining.
    ///
    /// Fixed field order, big-endian integers:
    /// version ‖ height ‖ prev_hash ‖ state_root ‖ tx_merkle_root ‖
    /// timestamp ‖ tx_count.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + 8 + 32 + 32 + 32 + 8 + 4);
        buf.push(HEADER_VERSION);
        buf.extend_from_slice(&self.height.to_be_bytes());
        buf.extend_from_slice(self.prev_hash.as_bytes());
        buf.extend_from_slice(self.state_root.as_bytes());
        buf.extend_from_slice(self.tx_merkle_root.as_bytes());
        buf.extend_from_slice(&self.timestamp.as_secs().to_be_bytes());
        buf.extend_from_slice(&self.tx_count.to_be_bytes());
        buf
    }

    /// Hash of this header's canonical encoding.
    pub fn hash(&self) -> BlockHash {
        fontana_crypto::hash_block(&self.canonical_bytes())
    }

    /// Decode a header from its canonical encoding.
    pub fn from_canonical_bytes(bytes: &[u8]) -> Result<Self, crate::TxError> {
        const LEN: usize = 1 + 8 + 32 + 32 + 32 + 8 + 4;
        if bytes.len() != LEN {
            return Err(crate::TxError::Malformed(format!(
                "header must be {LEN} bytes, got {}",
                bytes.len()
            )));
        }
        if bytes[0] != HEADER_VERSION {
            return Err(crate::TxError::Malformed(format!(
                "unsupported header version {}",
                bytes[0]
            )));
        }

        let height = u64::from_be_bytes(bytes[1..9].try_into().expect("8 bytes"));
        let prev_hash = BlockHash::new(bytes[9..41].try_into().expect("32 bytes"));
        let state_root = StateRoot::new(bytes[41..73].try_into().expect("32 bytes"));
        let tx_merkle_root = TxHash::new(bytes[73..105].try_into().expect("32 bytes"));
        let timestamp = Timestamp::new(u64::from_be_bytes(
            bytes[105..113].try_into().expect("8 bytes"),
        ));
        let tx_count = u32::from_be_bytes(bytes[113..117].try_into().expect("4 bytes"));

        Ok(Self {
            height,
            prev_hash,
            state_root,
            tx_merkle_root,
            timestamp,
            tx_count,
        })
    }
}

/// A block: header plus the transactions it commits to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<SignedTransaction>,
}

impl Block {
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

/// Merkle root over txids in block order.
///
/// Pairwise Blake2b fold; an odd node is promoted unchanged; the empty
/// list commits to the zero hash.
pub fn tx_merkle_root(txids: &[TxHash]) -> TxHash {
    if txids.is_empty() {
        return TxHash::ZERO;
    }

    let mut level: Vec<[u8; 32]> = txids.iter().map(|id| *id.as_bytes()).collect();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            match pair {
                [left, right] => {
                    next.push(fontana_crypto::blake2b_256_multi(&[left, right]));
                }
                [odd] => next.push(*odd),
                _ => unreachable!(),
            }
        }
        level = next;
    }
    TxHash::new(level[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txid(n: u8) -> TxHash {
        TxHash::new([n; 32])
    }

    fn header(height: u64) -> BlockHeader {
        BlockHeader {
            height,
            prev_hash: BlockHash::ZERO,
            state_root: StateRoot::new([1u8; 32]),
            tx_merkle_root: TxHash::ZERO,
            timestamp: Timestamp::new(1_700_000_000),
            tx_count: 0,
        }
    }

    #[test]
    fn header_hash_deterministic() {
        let h = header(3);
        assert_eq!(h.hash(), h.hash());
    }

    #[test]
    fn header_hash_covers_every_field() {
        let base = header(3);

        let mut other = base.clone();
        other.height = 4;
        assert_ne!(other.hash(), base.hash());

        let mut other = base.clone();
        other.state_root = StateRoot::new([2u8; 32]);
        assert_ne!(other.hash(), base.hash());

        let mut other = base.clone();
        other.tx_count = 1;
        assert_ne!(other.hash(), base.hash());

        let mut other = base.clone();
        other.timestamp = Timestamp::new(1_700_000_001);
        assert_ne!(other.hash(), base.hash());
    }

    #[test]
    fn empty_tx_merkle_root_is_zero() {
        assert_eq!(tx_merkle_root(&[]), TxHash::ZERO);
    }

    #[test]
    fn single_txid_promotes() {
        assert_eq!(tx_merkle_root(&[txid(1)]), txid(1));
    }

    #[test]
    fn tx_merkle_root_depends_on_order() {
        let forward = tx_merkle_root(&[txid(1), txid(2), txid(3)]);
        let backward = tx_merkle_root(&[txid(3), txid(2), txid(1)]);
        assert_ne!(forward, backward);
    }

    #[test]
    fn tx_merkle_root_deterministic() {
        let ids = [txid(1), txid(2), txid(3), txid(4), txid(5)];
        assert_eq!(tx_merkle_root(&ids), tx_merkle_root(&ids));
    }
}
