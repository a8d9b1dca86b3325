//! # Shared Crypto - Platform Cryptographic Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `ecdsa` | secp256k1, compact recoverable | ECDSA_SECP256K1 and ECDSA_HASH160 identity keys |
//! | `bls` | BLS12-381 (`min_pk`) | BLS12_381 identity keys |
//! | `hashing` | SHA-256, double SHA-256, HASH160 | Signable digests, key hashes |
//!
//! ## Signing Convention
//!
//! Every signature covers `sha256d(message)`. ECDSA signatures are 65-byte
//! compact recoverable signatures (`header ‖ r ‖ s`), so a verifier holding
//! only a key hash can recover and compare the public key.
//!
//! ## Security Properties
//!
//! - **secp256k1**: RFC 6979 deterministic nonces, low-S normalized
//! - **BLS**: proof-of-possession ciphersuite, subgroup checks on parse
//! - Secret key material is zeroized on drop

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bls;
pub mod ecdsa;
pub mod errors;
pub mod hashing;

// Re-exports
pub use bls::{BlsKeyPair, BlsPublicKey, BlsSignature};
pub use ecdsa::{CompactSignature, Secp256k1KeyPair, Secp256k1PublicKey};
pub use errors::CryptoError;
pub use hashing::{hash160, sha256, sha256d};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
