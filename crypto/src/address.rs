//! Wallet address codec.
//!
//! An address is the 32-byte public key followed by a 5-byte Blake2b
//! checksum, encoded as one base32 stream behind the `fta_` prefix:
//! 37 payload bytes → 60 characters, 64 characters total. Encoding the
//! key and checksum as a single stream (rather than two padded runs)
//! keeps the trailing padding in one place, where decode can insist it
//! is zero.

use thiserror::Error;

use fontana_types::{PublicKey, WalletAddress};

/// Base32 alphabet; drops the visually ambiguous 0/O, 2/Z, l/I, v.
const ALPHABET: &[u8; 32] = b"13456789abcdefghijkmnopqrstuwxyz";

/// Payload layout: public key then checksum.
const KEY_LEN: usize = 32;
const CHECKSUM_LEN: usize = 5;
const PAYLOAD_LEN: usize = KEY_LEN + CHECKSUM_LEN;
/// 37 bytes = 296 bits → 60 base32 characters with 4 padding bits.
const BODY_CHARS: usize = 60;

/// Why an address string failed to decode.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address does not start with `fta_`")]
    BadPrefix,

    #[error("address body must be {BODY_CHARS} characters, got {0}")]
    BadLength(usize),

    #[error("invalid base32 character {0:?}")]
    BadChar(char),

    #[error("non-zero padding bits in address encoding")]
    BadPadding,

    #[error("checksum does not match the encoded key")]
    BadChecksum,
}

/// First five bytes of Blake2b-256 over the public key.
fn checksum(public_key: &PublicKey) -> [u8; CHECKSUM_LEN] {
    let digest = crate::blake2b_256(public_key.as_bytes());
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

/// Value of one base32 symbol, if it belongs to the alphabet.
fn symbol_value(c: char) -> Option<u32> {
    ALPHABET.iter().position(|&a| a as char == c).map(|i| i as u32)
}

/// Encode a byte payload as base32, padding the final symbol with zeros.
fn encode_payload(payload: &[u8]) -> String {
    let mut body = String::with_capacity(payload.len() * 8 / 5 + 1);
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    for &byte in payload {
        acc = (acc << 8) | byte as u32;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            body.push(ALPHABET[((acc >> bits) & 0x1F) as usize] as char);
        }
    }
    if bits > 0 {
        body.push(ALPHABET[((acc << (5 - bits)) & 0x1F) as usize] as char);
    }
    body
}

/// Decode a base32 body into exactly `PAYLOAD_LEN` bytes.
///
/// The four trailing padding bits must be zero, so every payload has
/// exactly one valid spelling.
fn decode_body(body: &str) -> Result<[u8; PAYLOAD_LEN], AddressError> {
    let mut payload = [0u8; PAYLOAD_LEN];
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut filled = 0usize;

    for c in body.chars() {
        let value = symbol_value(c).ok_or(AddressError::BadChar(c))?;
        acc = (acc << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            payload[filled] = (acc >> bits) as u8;
            filled += 1;
        }
    }

    debug_assert_eq!(filled, PAYLOAD_LEN);
    if acc & ((1 << bits) - 1) != 0 {
        return Err(AddressError::BadPadding);
    }
    Ok(payload)
}

/// Derive an `fta_`-prefixed wallet address from a public key.
pub fn derive_address(public_key: &PublicKey) -> WalletAddress {
    let mut payload = [0u8; PAYLOAD_LEN];
    payload[..KEY_LEN].copy_from_slice(public_key.as_bytes());
    payload[KEY_LEN..].copy_from_slice(&checksum(public_key));

    let mut address = String::with_capacity(WalletAddress::PREFIX.len() + BODY_CHARS);
    address.push_str(WalletAddress::PREFIX);
    address.push_str(&encode_payload(&payload));
    WalletAddress::new(address)
}

/// Recover the public key from an address, verifying the checksum.
pub fn decode_address(address: &str) -> Result<PublicKey, AddressError> {
    let body = address
        .strip_prefix(WalletAddress::PREFIX)
        .ok_or(AddressError::BadPrefix)?;
    if body.chars().count() != BODY_CHARS {
        return Err(AddressError::BadLength(body.chars().count()));
    }

    let payload = decode_body(body)?;
    let mut key_bytes = [0u8; KEY_LEN];
    key_bytes.copy_from_slice(&payload[..KEY_LEN]);
    let public_key = PublicKey(key_bytes);

    if payload[KEY_LEN..] != checksum(&public_key) {
        return Err(AddressError::BadChecksum);
    }
    Ok(public_key)
}

/// Whether an address string is well-formed with a correct checksum.
pub fn validate_address(address: &str) -> bool {
    decode_address(address).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_keypair, keypair_from_seed};

    #[test]
    fn address_has_prefix_and_fixed_length() {
        let kp = generate_keypair();
        let addr = derive_address(&kp.public);
        assert!(addr.as_str().starts_with("fta_"));
        assert_eq!(addr.as_str().len(), 64);
    }

    #[test]
    fn derivation_is_stable() {
        let kp = keypair_from_seed(&[7u8; 32]);
        assert_eq!(
            derive_address(&kp.public).as_str(),
            derive_address(&kp.public).as_str()
        );
    }

    #[test]
    fn decode_recovers_public_key() {
        let kp = generate_keypair();
        let addr = derive_address(&kp.public);
        let decoded = decode_address(addr.as_str()).unwrap();
        assert_eq!(decoded, kp.public);
    }

    #[test]
    fn distinct_keys_yield_distinct_addresses() {
        let a = derive_address(&keypair_from_seed(&[1u8; 32]).public);
        let b = derive_address(&keypair_from_seed(&[2u8; 32]).public);
        assert_ne!(a.as_str(), b.as_str());
    }

    #[test]
    fn foreign_prefix_rejected() {
        let kp = generate_keypair();
        let addr = derive_address(&kp.public);
        let body = &addr.as_str()[4..];
        let foreign = format!("tia_{body}");
        assert_eq!(decode_address(&foreign), Err(AddressError::BadPrefix));
    }

    #[test]
    fn truncated_address_rejected() {
        let kp = generate_keypair();
        let mut addr = derive_address(&kp.public).as_str().to_string();
        addr.pop();
        assert_eq!(decode_address(&addr), Err(AddressError::BadLength(59)));
        assert_eq!(decode_address("fta_"), Err(AddressError::BadLength(0)));
    }

    #[test]
    fn illegal_character_rejected() {
        let kp = generate_keypair();
        let mut addr = derive_address(&kp.public).as_str().to_string();
        addr.replace_range(10..11, "0"); // '0' is not in the alphabet
        assert_eq!(
            decode_address(&addr),
            Err(AddressError::BadChar('0'))
        );
    }

    #[test]
    fn checksum_catches_single_symbol_edits() {
        let kp = generate_keypair();
        let addr = derive_address(&kp.public).as_str().to_string();

        // Swap one body character for a different alphabet character.
        let target = addr.as_bytes()[20];
        let replacement = ALPHABET
            .iter()
            .find(|&&a| a != target)
            .copied()
            .unwrap();
        let mut edited = addr.into_bytes();
        edited[20] = replacement;
        let edited = String::from_utf8(edited).unwrap();

        assert!(!validate_address(&edited));
    }

    #[test]
    fn validate_accepts_derived_addresses() {
        for seed in 0..8u8 {
            let kp = keypair_from_seed(&[seed; 32]);
            assert!(validate_address(derive_address(&kp.public).as_str()));
        }
    }

    #[test]
    fn payload_codec_roundtrip() {
        let payload: Vec<u8> = (0..PAYLOAD_LEN as u8).collect();
        let body = encode_payload(&payload);
        assert_eq!(body.len(), BODY_CHARS);
        let decoded = decode_body(&body).unwrap();
        assert_eq!(decoded.as_slice(), payload.as_slice());
    }
}
