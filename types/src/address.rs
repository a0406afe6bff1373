//! Wallet address type with `fta_` prefix.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A Fontana wallet address, always prefixed with `fta_`.
///
/// Derived from the wallet's Ed25519 public key via base32 encoding plus a
/// Blake2b checksum (see `fontana-crypto::address`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// The standard prefix for all Fontana wallet addresses.
    pub const PREFIX: &'static str = "fta_";

    /// Create a new wallet address from a raw string.
    ///
    /// # Panics
    /// Panics if the string does not start with `fta_`.
    pub fn new(raw: impl Into<String>) -> Self {
        let s = raw.into();
        assert!(s.starts_with(Self::PREFIX), "address must start with fta_");
        Self(s)
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate that this address is well-formed (prefix + non-empty body).
    ///
    /// Checksum validation lives in `fontana-crypto::address::validate_address`.
    pub fn is_valid(&self) -> bool {
        self.0.starts_with(Self::PREFIX) && self.0.len() > Self::PREFIX.len()
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WalletAddress {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
