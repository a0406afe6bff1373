//! The DA client interface and an in-memory mock.
//!
//! Wire details of the real DA node (RPC transport, auth, gas) live behind
//! this trait; the node and recovery only ever see namespaces, blob bytes,
//! and blob references.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{DaError, Namespace};

/// A reference to a blob stored in the DA layer.
///
/// Rendered as `da:{da_height}:{base64_commitment}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobRef {
    pub da_height: u64,
    pub commitment: Vec<u8>,
}

impl BlobRef {
    /// Parse a `da:{height}:{base64}` string.
    pub fn parse(s: &str) -> Result<Self, DaError> {
        let mut parts = s.splitn(3, ':');
        let (Some("da"), Some(height), Some(commitment)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(DaError::Permanent(format!("malformed blob ref: {s}")));
        };
        let da_height: u64 = height
            .parse()
            .map_err(|_| DaError::Permanent(format!("malformed blob ref height: {s}")))?;
        let commitment = base64::decode(commitment)
            .map_err(|_| DaError::Permanent(format!("malformed blob ref commitment: {s}")))?;
        Ok(Self {
            da_height,
            commitment,
        })
    }
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "da:{}:{}", self.da_height, base64::encode(&self.commitment))
    }
}

/// A data-availability client.
#[async_trait]
pub trait DaClient: Send + Sync {
    /// Submit blob bytes under a namespace, returning the blob reference.
    async fn submit_blob(&self, namespace: Namespace, data: Vec<u8>) -> Result<BlobRef, DaError>;

    /// Fetch blob bytes by reference.
    async fn fetch_blob(&self, blob_ref: &BlobRef) -> Result<Vec<u8>, DaError>;

    /// Fetch the blob stored under a namespace, if any.
    ///
    /// Per-block namespaces are derived deterministically from the base and
    /// the height, so recovery can walk heights without an index.
    async fn fetch_blob_by_namespace(
        &self,
        namespace: Namespace,
    ) -> Result<Option<(BlobRef, Vec<u8>)>, DaError>;
}

/// Deterministic in-memory DA layer for tests and offline runs.
///
/// Commitments are Blake2b hashes of the blob bytes; DA heights are a
/// simple counter. Transient failures can be injected to exercise the
/// poster's retry path.
#[derive(Default)]
pub struct MockDaClient {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    by_namespace: Mutex<HashMap<[u8; 8], (BlobRef, Vec<u8>)>>,
    next_height: AtomicU64,
    failures_remaining: AtomicUsize,
}

impl MockDaClient {
    pub fn new() -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            by_namespace: Mutex::new(HashMap::new()),
            next_height: AtomicU64::new(1),
            failures_remaining: AtomicUsize::new(0),
        }
    }

    /// Make the next `n` submissions fail with a transient error.
    pub fn inject_failures(&self, n: usize) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }

    /// Number of blobs stored.
    pub fn blob_count(&self) -> usize {
        self.blobs.lock().expect("mock lock poisoned").len()
    }
}

#[async_trait]
impl DaClient for MockDaClient {
    async fn submit_blob(&self, namespace: Namespace, data: Vec<u8>) -> Result<BlobRef, DaError> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(DaError::Transient("injected failure".into()));
        }

        let commitment = fontana_crypto::blake2b_256(&data).to_vec();
        let da_height = self.next_height.fetch_add(1, Ordering::SeqCst);
        let blob_ref = BlobRef {
            da_height,
            commitment,
        };
        self.blobs
            .lock()
            .expect("mock lock poisoned")
            .insert(blob_ref.to_string(), data.clone());
        self.by_namespace
            .lock()
            .expect("mock lock poisoned")
            .insert(*namespace.as_bytes(), (blob_ref.clone(), data));
        Ok(blob_ref)
    }

    async fn fetch_blob(&self, blob_ref: &BlobRef) -> Result<Vec<u8>, DaError> {
        self.blobs
            .lock()
            .expect("mock lock poisoned")
            .get(&blob_ref.to_string())
            .cloned()
            .ok_or_else(|| DaError::Transient(format!("blob not found: {blob_ref}")))
    }

    async fn fetch_blob_by_namespace(
        &self,
        namespace: Namespace,
    ) -> Result<Option<(BlobRef, Vec<u8>)>, DaError> {
        Ok(self
            .by_namespace
            .lock()
            .expect("mock lock poisoned")
            .get(namespace.as_bytes())
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns() -> Namespace {
        Namespace::from_hex("00f0e1d2c3b4a596").unwrap()
    }

    #[tokio::test]
    async fn submit_then_fetch_roundtrip() {
        let client = MockDaClient::new();
        let data = b"canonical block bytes".to_vec();
        let blob_ref = client.submit_blob(ns(), data.clone()).await.unwrap();
        let fetched = client.fetch_blob(&blob_ref).await.unwrap();
        assert_eq!(fetched, data);
    }

    #[tokio::test]
    async fn injected_failures_are_transient_then_clear() {
        let client = MockDaClient::new();
        client.inject_failures(2);

        let err = client.submit_blob(ns(), vec![1]).await.unwrap_err();
        assert!(err.is_transient());
        let err = client.submit_blob(ns(), vec![1]).await.unwrap_err();
        assert!(err.is_transient());
        assert!(client.submit_blob(ns(), vec![1]).await.is_ok());
    }

    #[tokio::test]
    async fn fetch_by_namespace_finds_latest_submission() {
        let client = MockDaClient::new();
        let namespace = ns().for_height(7);
        assert!(client
            .fetch_blob_by_namespace(namespace)
            .await
            .unwrap()
            .is_none());

        let blob_ref = client
            .submit_blob(namespace, b"block seven".to_vec())
            .await
            .unwrap();
        let (found_ref, data) = client
            .fetch_blob_by_namespace(namespace)
            .await
            .unwrap()
            .expect("blob present");
        assert_eq!(found_ref, blob_ref);
        assert_eq!(data, b"block seven");
    }

    #[test]
    fn blob_ref_display_parse_roundtrip() {
        let blob_ref = BlobRef {
            da_height: 42,
            commitment: vec![0xDE, 0xAD, 0xBE, 0xEF],
        };
        let s = blob_ref.to_string();
        assert!(s.starts_with("da:42:"));
        assert_eq!(BlobRef::parse(&s).unwrap(), blob_ref);
    }

    #[test]
    fn malformed_blob_ref_rejected() {
        assert!(BlobRef::parse("nonsense").is_err());
        assert!(BlobRef::parse("da:notanumber:AA==").is_err());
        assert!(BlobRef::parse("da:1:!!!").is_err());
    }
}
