//! Canonical transaction encoding.
//!
//! Hand-rolled, length-prefixed, big-endian. This layout is what gets
//! hashed for the txid and what rides inside DA blobs, so it is frozen
//! independently of any serde implementation detail.
//!
//! Unsigned layout (hashed for the txid):
//! ```text
//! version          u8
//! kind             u8 discriminant (0 transfer, 1 mint, 2 burn)
//! kind payload     mint: len-prefixed l1_tx_hash; burn: len-prefixed l1_recipient
//! sender_pubkey    32 bytes
//! input_count      u32
//!   txid           32 bytes   } per input
//!   index          u32        }
//! output_count     u32
//!   recipient      len-prefixed UTF-8   } per output
//!   amount         u64                  }
//! fee              u64
//! payload_hash     32 bytes
//! timestamp        u64
//! ```
//!
//! The wire encoding appends the 64-byte signature.

use fontana_types::{
    PayloadHash, PublicKey, Signature, TiaAmount, Timestamp, TxHash, UtxoRef, WalletAddress,
};

use crate::{SignedTransaction, TxError, TxKind, TxOutput};

/// Canonical encoding version.
const TX_VERSION: u8 = 1;

const KIND_TRANSFER: u8 = 0;
const KIND_MINT: u8 = 1;
const KIND_BURN: u8 = 2;

fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(bytes);
}

/// Canonical encoding of everything except the signature.
pub fn unsigned_bytes(tx: &SignedTransaction) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128 + tx.inputs.len() * 36 + tx.outputs.len() * 80);

    buf.push(TX_VERSION);
    match &tx.kind {
        TxKind::Transfer => buf.push(KIND_TRANSFER),
        TxKind::Mint { l1_tx_hash } => {
            buf.push(KIND_MINT);
            put_bytes(&mut buf, l1_tx_hash.as_bytes());
        }
        TxKind::Burn { l1_recipient } => {
            buf.push(KIND_BURN);
            put_bytes(&mut buf, l1_recipient.as_bytes());
        }
    }

    buf.extend_from_slice(tx.sender_pubkey.as_bytes());

    buf.extend_from_slice(&(tx.inputs.len() as u32).to_be_bytes());
    for input in &tx.inputs {
        buf.extend_from_slice(input.txid.as_bytes());
        buf.extend_from_slice(&input.index.to_be_bytes());
    }

    buf.extend_from_slice(&(tx.outputs.len() as u32).to_be_bytes());
    for output in &tx.outputs {
        put_bytes(&mut buf, output.recipient.as_str().as_bytes());
        buf.extend_from_slice(&output.amount.utia().to_be_bytes());
    }

    buf.extend_from_slice(&tx.fee.utia().to_be_bytes());
    buf.extend_from_slice(tx.payload_hash.as_bytes());
    buf.extend_from_slice(&tx.timestamp.as_secs().to_be_bytes());

    buf
}

/// Full wire encoding: unsigned bytes followed by the 64-byte signature.
pub fn to_bytes(tx: &SignedTransaction) -> Vec<u8> {
    let mut buf = unsigned_bytes(tx);
    buf.extend_from_slice(tx.signature.as_bytes());
    buf
}

/// Streaming reader over a canonical byte buffer.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], TxError> {
        if self.pos + n > self.bytes.len() {
            return Err(TxError::Malformed("unexpected end of input".into()));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, TxError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, TxError> {
        let b: [u8; 4] = self.take(4)?.try_into().expect("4 bytes");
        Ok(u32::from_be_bytes(b))
    }

    fn u64(&mut self) -> Result<u64, TxError> {
        let b: [u8; 8] = self.take(8)?.try_into().expect("8 bytes");
        Ok(u64::from_be_bytes(b))
    }

    fn hash32(&mut self) -> Result<[u8; 32], TxError> {
        Ok(self.take(32)?.try_into().expect("32 bytes"))
    }

    fn string(&mut self) -> Result<String, TxError> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| TxError::Malformed("invalid UTF-8 string".into()))
    }

    fn done(&self) -> bool {
        self.pos == self.bytes.len()
    }
}

/// Decode a transaction from its wire encoding.
///
/// The txid is recomputed from the decoded contents, so
/// encode → decode → `compute_txid` is the identity on well-formed input.
pub fn from_bytes(bytes: &[u8]) -> Result<SignedTransaction, TxError> {
    let mut r = Reader::new(bytes);

    let version = r.u8()?;
    if version != TX_VERSION {
        return Err(TxError::Malformed(format!(
            "unsupported transaction version {version}"
        )));
    }

    let kind = match r.u8()? {
        KIND_TRANSFER => TxKind::Transfer,
        KIND_MINT => TxKind::Mint {
            l1_tx_hash: r.string()?,
        },
        KIND_BURN => TxKind::Burn {
            l1_recipient: r.string()?,
        },
        other => {
            return Err(TxError::Malformed(format!(
                "unknown transaction kind {other}"
            )))
        }
    };

    let sender_pubkey = PublicKey(r.hash32()?);

    let input_count = r.u32()? as usize;
    let mut inputs = Vec::with_capacity(input_count.min(1024));
    for _ in 0..input_count {
        let txid = TxHash::new(r.hash32()?);
        let index = r.u32()?;
        inputs.push(UtxoRef::new(txid, index));
    }

    let output_count = r.u32()? as usize;
    let mut outputs = Vec::with_capacity(output_count.min(1024));
    for _ in 0..output_count {
        let recipient = r.string()?;
        if !recipient.starts_with(WalletAddress::PREFIX) {
            return Err(TxError::Malformed(format!(
                "invalid recipient address: {recipient}"
            )));
        }
        let amount = TiaAmount::new(r.u64()?);
        outputs.push(TxOutput {
            recipient: WalletAddress::new(recipient),
            amount,
        });
    }

    let fee = TiaAmount::new(r.u64()?);
    let payload_hash = PayloadHash::new(r.hash32()?);
    let timestamp = Timestamp::new(r.u64()?);

    let sig_bytes: [u8; 64] = r
        .take(64)?
        .try_into()
        .expect("64 bytes");
    if !r.done() {
        return Err(TxError::Malformed("trailing bytes after signature".into()));
    }

    let mut tx = SignedTransaction {
        txid: TxHash::ZERO,
        kind,
        sender_pubkey,
        inputs,
        outputs,
        fee,
        payload_hash,
        timestamp,
        signature: Signature(sig_bytes),
    };
    tx.txid = tx.compute_txid();
    Ok(tx)
}
