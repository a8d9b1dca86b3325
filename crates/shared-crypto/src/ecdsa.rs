//! # ECDSA Signatures (secp256k1)
//!
//! Compact recoverable ECDSA over `sha256d(message)`.
//!
//! ## Security Properties
//!
//! - RFC 6979 deterministic nonces (no RNG dependency for signing)
//! - Low-S normalization, high-S signatures are rejected
//! - Secret key bytes are zeroized after use
//!
//! ## Compact Format
//!
//! `header ‖ r ‖ s`, 65 bytes, where `header = 27 + 4 + recovery_id` for a
//! compressed public key.

use crate::hashing::{hash160, sha256d};
use crate::CryptoError;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use zeroize::Zeroize;

/// Length of a compact recoverable signature.
pub const COMPACT_SIGNATURE_LENGTH: usize = 65;

/// Length of a compressed public key.
pub const COMPRESSED_PUBLIC_KEY_LENGTH: usize = 33;

const COMPACT_HEADER_BASE: u8 = 27;
const COMPACT_HEADER_COMPRESSED: u8 = 4;

/// Compressed secp256k1 public key (33 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Secp256k1PublicKey([u8; COMPRESSED_PUBLIC_KEY_LENGTH]);

impl Secp256k1PublicKey {
    /// Create from compressed bytes (33 bytes, starting with 0x02 or 0x03).
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; COMPRESSED_PUBLIC_KEY_LENGTH] =
            bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
                expected: COMPRESSED_PUBLIC_KEY_LENGTH,
                actual: bytes.len(),
            })?;
        VerifyingKey::from_sec1_bytes(&array).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(array))
    }

    /// Get raw compressed bytes.
    pub fn as_bytes(&self) -> &[u8; COMPRESSED_PUBLIC_KEY_LENGTH] {
        &self.0
    }

    /// HASH160 of the compressed key.
    pub fn hash160(&self) -> [u8; 20] {
        hash160(&self.0)
    }

    /// Verify a compact signature over `sha256d(message)`.
    pub fn verify(&self, message: &[u8], signature: &CompactSignature) -> Result<(), CryptoError> {
        let recovered = signature.recover(message)?;
        if recovered == *self {
            Ok(())
        } else {
            Err(CryptoError::SignatureVerificationFailed)
        }
    }
}

/// Compact recoverable signature, 65 bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompactSignature([u8; COMPACT_SIGNATURE_LENGTH]);

impl CompactSignature {
    /// Parse from a slice of exactly 65 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; COMPACT_SIGNATURE_LENGTH] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSignatureFormat)?;
        Ok(Self(array))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; COMPACT_SIGNATURE_LENGTH] {
        &self.0
    }

    /// Recover the public key that produced this signature over `message`.
    pub fn recover(&self, message: &[u8]) -> Result<Secp256k1PublicKey, CryptoError> {
        let header = self.0[0];
        let recovery_byte = header
            .checked_sub(COMPACT_HEADER_BASE + COMPACT_HEADER_COMPRESSED)
            .ok_or(CryptoError::InvalidSignatureFormat)?;
        let recovery_id =
            RecoveryId::from_byte(recovery_byte).ok_or(CryptoError::InvalidSignatureFormat)?;

        let signature =
            Signature::from_slice(&self.0[1..]).map_err(|_| CryptoError::InvalidSignatureFormat)?;
        // Malleable signatures are rejected, only the low-S form is accepted.
        if signature.normalize_s().is_some() {
            return Err(CryptoError::InvalidSignatureFormat);
        }

        let digest = sha256d(message);
        let verifying_key = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id)
            .map_err(|_| CryptoError::RecoveryFailed)?;

        let encoded = verifying_key.to_encoded_point(true);
        Secp256k1PublicKey::from_slice(encoded.as_bytes())
    }
}

/// secp256k1 ECDSA keypair.
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
}

impl Secp256k1KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let signing_key = SigningKey::from_slice(bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Get public key (compressed, 33 bytes).
    pub fn public_key(&self) -> Secp256k1PublicKey {
        let encoded = self.signing_key.verifying_key().to_encoded_point(true);
        let mut bytes = [0u8; COMPRESSED_PUBLIC_KEY_LENGTH];
        bytes.copy_from_slice(encoded.as_bytes());
        Secp256k1PublicKey(bytes)
    }

    /// Sign `sha256d(message)` (deterministic RFC 6979), compact form.
    pub fn sign(&self, message: &[u8]) -> Result<CompactSignature, CryptoError> {
        let digest = sha256d(message);
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(&digest)
            .map_err(|_| CryptoError::InvalidPrivateKey)?;

        let mut bytes = [0u8; COMPACT_SIGNATURE_LENGTH];
        bytes[0] = COMPACT_HEADER_BASE + COMPACT_HEADER_COMPRESSED + recovery_id.to_byte();
        bytes[1..].copy_from_slice(&signature.to_bytes());
        Ok(CompactSignature(bytes))
    }

    /// Get secret key bytes (for serialization).
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }
}

impl Drop for Secp256k1KeyPair {
    fn drop(&mut self) {
        // Zeroize secret key material
        let mut bytes: [u8; 32] = self.signing_key.to_bytes().into();
        bytes.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_recover_roundtrip() {
        let keypair = Secp256k1KeyPair::generate();
        let message = b"state transition bytes";

        let signature = keypair.sign(message).unwrap();
        assert_eq!(signature.recover(message).unwrap(), keypair.public_key());
        assert!(keypair.public_key().verify(message, &signature).is_ok());
    }

    #[test]
    fn test_wrong_message_fails() {
        let keypair = Secp256k1KeyPair::generate();
        let signature = keypair.sign(b"message1").unwrap();

        assert_eq!(
            keypair.public_key().verify(b"message2", &signature),
            Err(CryptoError::SignatureVerificationFailed)
        );
    }

    #[test]
    fn test_deterministic_signatures() {
        let keypair = Secp256k1KeyPair::from_slice(&[0xAB; 32]).unwrap();
        let sig1 = keypair.sign(b"deterministic").unwrap();
        let sig2 = keypair.sign(b"deterministic").unwrap();
        assert_eq!(sig1, sig2);
    }

    #[test]
    fn test_bad_header_rejected() {
        let keypair = Secp256k1KeyPair::generate();
        let mut bytes = *keypair.sign(b"m").unwrap().as_bytes();
        bytes[0] = 0;
        let signature = CompactSignature::from_slice(&bytes).unwrap();
        assert_eq!(
            signature.recover(b"m"),
            Err(CryptoError::InvalidSignatureFormat)
        );
    }

    #[test]
    fn test_public_key_length_checked() {
        assert_eq!(
            Secp256k1PublicKey::from_slice(&[2; 32]),
            Err(CryptoError::InvalidKeyLength {
                expected: 33,
                actual: 32
            })
        );
    }

    #[test]
    fn test_hash160_of_public_key() {
        let keypair = Secp256k1KeyPair::generate();
        let public_key = keypair.public_key();
        assert_eq!(public_key.hash160(), hash160(public_key.as_bytes()));
    }
}
