//! DA namespace derivation.
//!
//! The DA layer addresses blobs by a fixed-width 8-byte namespace. The
//! configured base must be exactly 16 hex characters (validated at
//! startup); per-block namespaces are derived by hashing the base with the
//! block height and truncating, so a rollup's blobs spread deterministically
//! without colliding with other tenants of the same DA node.

use std::fmt;

use crate::DaError;

/// An 8-byte DA namespace identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Namespace(pub [u8; 8]);

impl Namespace {
    /// Parse a namespace from its 16-hex-character form.
    ///
    /// Anything else is a configuration error, surfaced as permanent.
    pub fn from_hex(s: &str) -> Result<Self, DaError> {
        if s.len() != 16 {
            return Err(DaError::Permanent(format!(
                "namespace must be 16 hex characters, got {} ({s:?})",
                s.len()
            )));
        }
        let bytes = hex::decode(s)
            .map_err(|e| DaError::Permanent(format!("namespace is not valid hex: {e}")))?;
        let arr: [u8; 8] = bytes.try_into().expect("16 hex chars decode to 8 bytes");
        Ok(Self(arr))
    }

    /// Derive the namespace for a block: first 8 bytes of
    /// `Blake2b-256(base ‖ height_be)`.
    pub fn for_height(&self, height: u64) -> Namespace {
        let digest = fontana_crypto::blake2b_256_multi(&[&self.0, &height.to_be_bytes()]);
        let mut out = [0u8; 8];
        out.copy_from_slice(&digest[..8]);
        Namespace(out)
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Namespace({})", self.to_hex())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_base() {
        let ns = Namespace::from_hex("00f0e1d2c3b4a596").unwrap();
        assert_eq!(ns.to_hex(), "00f0e1d2c3b4a596");
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(Namespace::from_hex("abcd").is_err());
        assert!(Namespace::from_hex("00f0e1d2c3b4a59600").is_err());
    }

    #[test]
    fn rejects_non_hex() {
        let err = Namespace::from_hex("zzzzzzzzzzzzzzzz").unwrap_err();
        assert!(!err.is_transient());
    }

    #[test]
    fn per_height_derivation_is_deterministic() {
        let base = Namespace::from_hex("00f0e1d2c3b4a596").unwrap();
        assert_eq!(base.for_height(5), base.for_height(5));
        assert_ne!(base.for_height(5), base.for_height(6));
    }

    #[test]
    fn different_bases_diverge() {
        let a = Namespace::from_hex("0000000000000001").unwrap();
        let b = Namespace::from_hex("0000000000000002").unwrap();
        assert_ne!(a.for_height(1), b.for_height(1));
    }
}
