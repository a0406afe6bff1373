//! Canonical blob codec.
//!
//! A blob is `version ‖ header ‖ tx_count ‖ tx_1 ‖ … ‖ tx_n`, every field
//! length-prefixed with a big-endian u32. Empty blocks still produce a
//! small payload carrying the header. Decoding is strict: a decoded blob
//! re-encodes byte-identically, which is what recovery relies on.

use fontana_transactions::{canonical, Block, BlockHeader};

use crate::DaError;

/// Blob layout version.
const BLOB_VERSION: u8 = 1;

/// Encode a block into its canonical blob bytes.
pub fn encode_block(block: &Block) -> Vec<u8> {
    let header_bytes = block.header.canonical_bytes();

    let mut buf = Vec::with_capacity(1 + 4 + header_bytes.len() + 4);
    buf.push(BLOB_VERSION);
    buf.extend_from_slice(&(header_bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(&header_bytes);
    buf.extend_from_slice(&(block.transactions.len() as u32).to_be_bytes());
    for tx in &block.transactions {
        let tx_bytes = canonical::to_bytes(tx);
        buf.extend_from_slice(&(tx_bytes.len() as u32).to_be_bytes());
        buf.extend_from_slice(&tx_bytes);
    }
    buf
}

/// Streaming reader over blob bytes.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DaError> {
        if self.pos + n > self.bytes.len() {
            return Err(DaError::Permanent("blob truncated".into()));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32, DaError> {
        let b: [u8; 4] = self.take(4)?.try_into().expect("4 bytes");
        Ok(u32::from_be_bytes(b))
    }

    fn done(&self) -> bool {
        self.pos == self.bytes.len()
    }
}

/// Decode a block from canonical blob bytes.
pub fn decode_block(bytes: &[u8]) -> Result<Block, DaError> {
    let mut r = Reader::new(bytes);

    let version = r.take(1)?[0];
    if version != BLOB_VERSION {
        return Err(DaError::Permanent(format!(
            "unsupported blob version {version}"
        )));
    }

    let header_len = r.u32()? as usize;
    let header_bytes = r.take(header_len)?;
    let header = BlockHeader::from_canonical_bytes(header_bytes)
        .map_err(|e| DaError::Permanent(format!("bad blob header: {e}")))?;

    let tx_count = r.u32()? as usize;
    if tx_count != header.tx_count as usize {
        return Err(DaError::Permanent(format!(
            "blob tx count {tx_count} disagrees with header {}",
            header.tx_count
        )));
    }

    let mut transactions = Vec::with_capacity(tx_count.min(4096));
    for _ in 0..tx_count {
        let tx_len = r.u32()? as usize;
        let tx_bytes = r.take(tx_len)?;
        let tx = canonical::from_bytes(tx_bytes)
            .map_err(|e| DaError::Permanent(format!("bad blob transaction: {e}")))?;
        transactions.push(tx);
    }

    if !r.done() {
        return Err(DaError::Permanent("trailing bytes in blob".into()));
    }

    Ok(Block {
        header,
        transactions,
    })
}
