//! Data-availability integration.
//!
//! The DA layer is an interface here: a client trait with an in-memory
//! mock, a canonical blob codec, deterministic per-block namespace
//! derivation, and the posting loop that ships locally committed blocks
//! with at-least-once semantics.

pub mod client;
pub mod codec;
pub mod error;
pub mod namespace;
pub mod poster;

pub use client::{BlobRef, DaClient, MockDaClient};
pub use codec::{decode_block, encode_block};
pub use error::DaError;
pub use namespace::Namespace;
pub use poster::{DaPoster, PosterConfig};
