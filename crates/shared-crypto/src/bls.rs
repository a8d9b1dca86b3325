//! BLS12-381 Signature Implementation
//!
//! `min_pk` ciphersuite: 48-byte public keys, 96-byte signatures.
//! Signatures cover `sha256d(message)`, like the ECDSA keys.

use blst::min_pk::{PublicKey, SecretKey, Signature};
use blst::BLST_ERROR;
use rand::RngCore;
use zeroize::Zeroize;

use crate::hashing::sha256d;
use crate::CryptoError;

/// Domain separation tag (proof-of-possession ciphersuite)
const DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

/// Compressed public key length.
pub const BLS_PUBLIC_KEY_LENGTH: usize = 48;

/// Compressed signature length.
pub const BLS_SIGNATURE_LENGTH: usize = 96;

/// BLS public key (48 bytes compressed)
#[derive(Clone, Debug)]
pub struct BlsPublicKey(PublicKey);

impl PartialEq for BlsPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for BlsPublicKey {}

/// BLS signature (96 bytes)
#[derive(Clone, Debug)]
pub struct BlsSignature(Signature);

impl PartialEq for BlsSignature {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for BlsSignature {}

/// BLS key pair for signing operations
pub struct BlsKeyPair {
    secret: SecretKey,
    public: BlsPublicKey,
}

impl BlsKeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Result<Self, CryptoError> {
        let mut ikm = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut ikm);
        let secret = SecretKey::key_gen(&ikm, &[])
            .map_err(|e| CryptoError::KeyGenerationFailed(format!("{e:?}")));
        ikm.zeroize();
        let secret = secret?;
        let public = BlsPublicKey(secret.sk_to_pk());
        Ok(Self { secret, public })
    }

    /// Create from existing secret key bytes
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let secret = SecretKey::from_bytes(bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        let public = BlsPublicKey(secret.sk_to_pk());
        Ok(Self { secret, public })
    }

    /// Sign `sha256d(message)`
    pub fn sign(&self, message: &[u8]) -> BlsSignature {
        BlsSignature(self.secret.sign(&sha256d(message), DST, &[]))
    }

    /// Get the public key
    pub fn public_key(&self) -> BlsPublicKey {
        self.public.clone()
    }

    /// Get the secret key bytes
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }
}

impl BlsPublicKey {
    /// Verify a signature over `sha256d(message)`
    pub fn verify(&self, message: &[u8], signature: &BlsSignature) -> Result<(), CryptoError> {
        let result = signature
            .0
            .verify(true, &sha256d(message), DST, &[], &self.0, true);
        if result == BLST_ERROR::BLST_SUCCESS {
            Ok(())
        } else {
            Err(CryptoError::SignatureVerificationFailed)
        }
    }

    /// Parse a 48-byte compressed key
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != BLS_PUBLIC_KEY_LENGTH {
            return Err(CryptoError::InvalidKeyLength {
                expected: BLS_PUBLIC_KEY_LENGTH,
                actual: bytes.len(),
            });
        }
        PublicKey::key_validate(bytes)
            .map(BlsPublicKey)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Serialize to 48-byte compressed form
    pub fn to_bytes(&self) -> [u8; BLS_PUBLIC_KEY_LENGTH] {
        self.0.to_bytes()
    }
}

impl BlsSignature {
    /// Parse a 96-byte compressed signature
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != BLS_SIGNATURE_LENGTH {
            return Err(CryptoError::InvalidSignatureFormat);
        }
        Signature::from_bytes(bytes)
            .map(BlsSignature)
            .map_err(|_| CryptoError::InvalidSignatureFormat)
    }

    /// Serialize to 96-byte form
    pub fn to_bytes(&self) -> [u8; BLS_SIGNATURE_LENGTH] {
        self.0.to_bytes()
    }
}
