//! # Identities
//!
//! Account-like entities holding a credit balance and a set of public keys.
//!
//! ## Invariants
//!
//! | Id | Invariant |
//! |----|-----------|
//! | 1 | key ids are unique within an identity |
//! | 2 | key data is unique within an identity |
//! | 3 | at least one enabled MASTER AUTHENTICATION key remains |
//! | 4 | read-only keys are never disabled |
//! | 5 | `revision` increases by exactly one per update |

use crate::block::Metadata;
use crate::identifier::Identifier;
use crate::{Credits, KeyId, ProtocolVersion, Revision, TimestampMillis};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

/// Highest key id an identity may assign.
pub const MAX_KEY_ID: KeyId = 32_767;

/// Public key algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyType {
    /// Compressed secp256k1 point, 33 bytes.
    EcdsaSecp256k1,
    /// Compressed BLS12-381 G1 point, 48 bytes.
    Bls12_381,
    /// HASH160 of a compressed secp256k1 point, 20 bytes.
    EcdsaHash160,
    /// BIP13 script hash, 20 bytes.
    Bip13ScriptHash,
}

impl KeyType {
    /// Expected length of the raw key data.
    pub const fn data_length(self) -> usize {
        match self {
            KeyType::EcdsaSecp256k1 => 33,
            KeyType::Bls12_381 => 48,
            KeyType::EcdsaHash160 | KeyType::Bip13ScriptHash => 20,
        }
    }

    /// Wire code.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// What a key may be used for. Only AUTHENTICATION keys sign transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Purpose {
    Authentication,
    Encryption,
    Decryption,
    Withdraw,
}

/// Key security level, MASTER being the strongest.
///
/// Ordering follows strength: `Master < Critical < High < Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityLevel {
    Master,
    Critical,
    High,
    Medium,
}

/// A public key attached to an identity.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityPublicKey {
    pub id: KeyId,
    #[serde(rename = "type")]
    pub key_type: KeyType,
    pub purpose: Purpose,
    pub security_level: SecurityLevel,
    #[serde_as(as = "Bytes")]
    pub data: Vec<u8>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub disabled_at: Option<TimestampMillis>,
}

impl IdentityPublicKey {
    pub fn is_disabled(&self) -> bool {
        self.disabled_at.is_some()
    }

    pub fn is_master_authentication(&self) -> bool {
        self.purpose == Purpose::Authentication && self.security_level == SecurityLevel::Master
    }
}

/// An identity with its keys and balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: Identifier,
    pub protocol_version: ProtocolVersion,
    pub public_keys: Vec<IdentityPublicKey>,
    pub balance: Credits,
    pub revision: Revision,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl Identity {
    pub fn public_key(&self, id: KeyId) -> Option<&IdentityPublicKey> {
        self.public_keys.iter().find(|key| key.id == id)
    }

    pub fn public_key_mut(&mut self, id: KeyId) -> Option<&mut IdentityPublicKey> {
        self.public_keys.iter_mut().find(|key| key.id == id)
    }

    pub fn enabled_keys(&self) -> impl Iterator<Item = &IdentityPublicKey> {
        self.public_keys.iter().filter(|key| !key.is_disabled())
    }

    /// Whether an enabled MASTER AUTHENTICATION key exists.
    pub fn has_enabled_master_key(&self) -> bool {
        self.enabled_keys()
            .any(IdentityPublicKey::is_master_authentication)
    }

    /// Next unused key id.
    pub fn next_key_id(&self) -> KeyId {
        self.public_keys
            .iter()
            .map(|key| key.id + 1)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: KeyId, level: SecurityLevel) -> IdentityPublicKey {
        IdentityPublicKey {
            id,
            key_type: KeyType::EcdsaSecp256k1,
            purpose: Purpose::Authentication,
            security_level: level,
            data: vec![2; 33],
            read_only: false,
            disabled_at: None,
        }
    }

    fn identity() -> Identity {
        Identity {
            id: Identifier::new([5; 32]),
            protocol_version: 1,
            public_keys: vec![key(0, SecurityLevel::Master), key(1, SecurityLevel::High)],
            balance: 10,
            revision: 0,
            metadata: None,
        }
    }

    #[test]
    fn test_master_key_detection() {
        let mut identity = identity();
        assert!(identity.has_enabled_master_key());

        identity.public_key_mut(0).unwrap().disabled_at = Some(1);
        assert!(!identity.has_enabled_master_key());
        assert_eq!(identity.enabled_keys().count(), 1);
    }

    #[test]
    fn test_next_key_id() {
        assert_eq!(identity().next_key_id(), 2);
    }

    #[test]
    fn test_security_level_ordering() {
        assert!(SecurityLevel::Master < SecurityLevel::Critical);
        assert!(SecurityLevel::High < SecurityLevel::Medium);
    }

    #[test]
    fn test_key_data_lengths() {
        assert_eq!(KeyType::EcdsaSecp256k1.data_length(), 33);
        assert_eq!(KeyType::Bls12_381.data_length(), 48);
        assert_eq!(KeyType::EcdsaHash160.data_length(), 20);
    }

    #[test]
    fn test_json_names() {
        let object = serde_json::to_value(key(3, SecurityLevel::Critical)).unwrap();
        assert_eq!(object["type"], "ECDSA_SECP256K1");
        assert_eq!(object["securityLevel"], "CRITICAL");
    }
}
