//! [`CryptoAdapter`] backed by `shared-crypto`.

use crate::ports::CryptoAdapter;
use shared_crypto::{
    BlsKeyPair, BlsPublicKey, BlsSignature, CompactSignature, CryptoError, Secp256k1KeyPair,
    Secp256k1PublicKey,
};
use shared_types::KeyType;

/// secp256k1 and BLS12-381 signatures in process.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCryptoAdapter;

impl NativeCryptoAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn unsupported(key_type: KeyType) -> CryptoError {
    CryptoError::UnsupportedKeyType(format!("{key_type:?}"))
}

fn bls_secret(private_key: &[u8]) -> Result<BlsKeyPair, CryptoError> {
    let bytes: [u8; 32] = private_key
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: private_key.len(),
        })?;
    BlsKeyPair::from_secret_bytes(&bytes)
}

impl CryptoAdapter for NativeCryptoAdapter {
    fn verify_signature(
        &self,
        key_type: KeyType,
        public_key_data: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), CryptoError> {
        match key_type {
            KeyType::EcdsaSecp256k1 => {
                let public_key = Secp256k1PublicKey::from_slice(public_key_data)?;
                public_key.verify(message, &CompactSignature::from_slice(signature)?)
            }
            KeyType::Bls12_381 => {
                let public_key = BlsPublicKey::from_slice(public_key_data)?;
                public_key.verify(message, &BlsSignature::from_slice(signature)?)
            }
            KeyType::EcdsaHash160 => {
                let recovered = CompactSignature::from_slice(signature)?.recover(message)?;
                if recovered.hash160().as_slice() == public_key_data {
                    Ok(())
                } else {
                    Err(CryptoError::SignatureVerificationFailed)
                }
            }
            KeyType::Bip13ScriptHash => Err(unsupported(key_type)),
        }
    }

    fn sign(
        &self,
        key_type: KeyType,
        private_key: &[u8],
        message: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        match key_type {
            KeyType::EcdsaSecp256k1 | KeyType::EcdsaHash160 => {
                let key_pair = Secp256k1KeyPair::from_slice(private_key)?;
                Ok(key_pair.sign(message)?.as_bytes().to_vec())
            }
            KeyType::Bls12_381 => Ok(bls_secret(private_key)?.sign(message).to_bytes().to_vec()),
            KeyType::Bip13ScriptHash => Err(unsupported(key_type)),
        }
    }

    fn private_key_to_public_key(
        &self,
        key_type: KeyType,
        private_key: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        match key_type {
            KeyType::EcdsaSecp256k1 => {
                let key_pair = Secp256k1KeyPair::from_slice(private_key)?;
                Ok(key_pair.public_key().as_bytes().to_vec())
            }
            KeyType::EcdsaHash160 => {
                let key_pair = Secp256k1KeyPair::from_slice(private_key)?;
                Ok(key_pair.public_key().hash160().to_vec())
            }
            KeyType::Bls12_381 => Ok(bls_secret(private_key)?.public_key().to_bytes().to_vec()),
            KeyType::Bip13ScriptHash => Err(unsupported(key_type)),
        }
    }

    fn validate_public_key(&self, key_type: KeyType, data: &[u8]) -> Result<(), CryptoError> {
        if data.len() != key_type.data_length() {
            return Err(CryptoError::InvalidKeyLength {
                expected: key_type.data_length(),
                actual: data.len(),
            });
        }
        match key_type {
            KeyType::EcdsaSecp256k1 => Secp256k1PublicKey::from_slice(data).map(|_| ()),
            KeyType::Bls12_381 => BlsPublicKey::from_slice(data).map(|_| ()),
            KeyType::EcdsaHash160 | KeyType::Bip13ScriptHash => Ok(()),
        }
    }
}
