//! Cryptographic primitives for the Fontana rollup.
//!
//! - **Ed25519** for transaction signing and verification
//! - **Blake2b-256** for hashing (txids, block hashes, Merkle nodes)
//! - Address derivation with `fta_` prefix and base32 encoding

pub mod address;
pub mod hash;
pub mod keys;
pub mod sign;

pub use address::{decode_address, derive_address, validate_address, AddressError};
pub use hash::{blake2b_256, blake2b_256_multi, hash_block, hash_transaction};
pub use keys::{generate_keypair, keypair_from_private, keypair_from_seed, public_from_private};
pub use sign::{sign_message, verify_signature};
