//! Ed25519 key generation.

use ed25519_dalek::SigningKey;
use fontana_types::{KeyPair, PrivateKey, PublicKey};
use rand::rngs::OsRng;

/// Generate a new Ed25519 key pair from a secure random source.
pub fn generate_keypair() -> KeyPair {
    let signing_key = SigningKey::generate(&mut OsRng);
    let public = PublicKey(signing_key.verifying_key().to_bytes());
    let private = PrivateKey(signing_key.to_bytes());
    KeyPair { public, private }
}

/// Derive a deterministic key pair from a 32-byte seed.
pub fn keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    let signing_key = SigningKey::from_bytes(seed);
    let public = PublicKey(signing_key.verifying_key().to_bytes());
    let private = PrivateKey(signing_key.to_bytes());
    KeyPair { public, private }
}

/// Derive the public key from a private key.
pub fn public_from_private(private: &PrivateKey) -> PublicKey {
    let signing_key = SigningKey::from_bytes(&private.0);
    PublicKey(signing_key.verifying_key().to_bytes())
}

/// Reconstruct a full key pair from a private key.
pub fn keypair_from_private(private: PrivateKey) -> KeyPair {
    let public = public_from_private(&private);
    KeyPair { public, private }
}
