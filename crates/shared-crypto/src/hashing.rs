//! # Hashing
//!
//! SHA-256 based digests used by signing and key hashing.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// 32-byte digest.
pub type Hash = [u8; 32];

/// Single SHA-256.
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

/// Double SHA-256, the digest every signature covers.
pub fn sha256d(data: &[u8]) -> Hash {
    sha256(&sha256(data))
}

/// `RIPEMD160(SHA256(data))`, the key hash of ECDSA_HASH160 keys.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(sha256(data)).into()
}
