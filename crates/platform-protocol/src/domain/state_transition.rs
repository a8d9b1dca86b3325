//! # State Transitions
//!
//! The six client intents and their shared capabilities.
//!
//! | Variant | Signed by | Owner |
//! |---------|-----------|-------|
//! | `DataContractCreate` | identity key | contract owner |
//! | `DataContractUpdate` | identity key | contract owner |
//! | `DocumentsBatch` | identity key | batch owner |
//! | `IdentityCreate` | asset-lock one-time key | new identity |
//! | `IdentityTopUp` | asset-lock one-time key | topped-up identity |
//! | `IdentityUpdate` | identity MASTER key | updated identity |
//!
//! Signatures cover the bincode encoding of the transition with every
//! signature field emptied (see [`StateTransition::signable_bytes`]).

use super::document_transition::DocumentTransition;
use crate::errors::ProtocolError;
use crate::ports::CryptoAdapter;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use serde_with::{serde_as, Bytes};
use shared_types::{
    AssetLockProof, DataContract, Identifier, IdentityPublicKey, KeyId, KeyType, ProtocolVersion,
    Purpose, Revision, SecurityLevel, TimestampMillis,
};
use std::fmt;

/// Numeric type tag of a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum StateTransitionType {
    DataContractCreate = 0,
    DocumentsBatch = 1,
    IdentityCreate = 2,
    IdentityTopUp = 3,
    DataContractUpdate = 4,
    IdentityUpdate = 5,
}

impl StateTransitionType {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            StateTransitionType::DataContractCreate => "dataContractCreate",
            StateTransitionType::DocumentsBatch => "documentsBatch",
            StateTransitionType::IdentityCreate => "identityCreate",
            StateTransitionType::IdentityTopUp => "identityTopUp",
            StateTransitionType::DataContractUpdate => "dataContractUpdate",
            StateTransitionType::IdentityUpdate => "identityUpdate",
        }
    }
}

impl fmt::Display for StateTransitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// VARIANTS
// =============================================================================

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataContractCreateTransition {
    pub protocol_version: ProtocolVersion,
    pub data_contract: DataContract,
    pub entropy: [u8; 32],
    pub signature_public_key_id: KeyId,
    #[serde_as(as = "Bytes")]
    pub signature: Vec<u8>,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataContractUpdateTransition {
    pub protocol_version: ProtocolVersion,
    pub data_contract: DataContract,
    pub signature_public_key_id: KeyId,
    #[serde_as(as = "Bytes")]
    pub signature: Vec<u8>,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentsBatchTransition {
    pub protocol_version: ProtocolVersion,
    pub owner_id: Identifier,
    pub transitions: Vec<DocumentTransition>,
    pub signature_public_key_id: KeyId,
    #[serde_as(as = "Bytes")]
    pub signature: Vec<u8>,
}

/// A key being added to an identity, with its proof-of-possession signature.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityPublicKeyInCreation {
    pub id: KeyId,
    #[serde(rename = "type")]
    pub key_type: KeyType,
    pub purpose: Purpose,
    pub security_level: SecurityLevel,
    #[serde_as(as = "Bytes")]
    pub data: Vec<u8>,
    #[serde(default)]
    pub read_only: bool,
    /// Signature over the transition's signable bytes by this key.
    #[serde_as(as = "Bytes")]
    pub signature: Vec<u8>,
}

impl IdentityPublicKeyInCreation {
    pub fn to_identity_public_key(&self) -> IdentityPublicKey {
        IdentityPublicKey {
            id: self.id,
            key_type: self.key_type,
            purpose: self.purpose,
            security_level: self.security_level,
            data: self.data.clone(),
            read_only: self.read_only,
            disabled_at: None,
        }
    }
}

impl From<&IdentityPublicKey> for IdentityPublicKeyInCreation {
    fn from(key: &IdentityPublicKey) -> Self {
        Self {
            id: key.id,
            key_type: key.key_type,
            purpose: key.purpose,
            security_level: key.security_level,
            data: key.data.clone(),
            read_only: key.read_only,
            signature: Vec::new(),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityCreateTransition {
    pub protocol_version: ProtocolVersion,
    pub asset_lock_proof: AssetLockProof,
    pub public_keys: Vec<IdentityPublicKeyInCreation>,
    /// Must equal the proof's identifier.
    pub identity_id: Identifier,
    #[serde_as(as = "Bytes")]
    pub signature: Vec<u8>,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityTopUpTransition {
    pub protocol_version: ProtocolVersion,
    pub asset_lock_proof: AssetLockProof,
    pub identity_id: Identifier,
    #[serde_as(as = "Bytes")]
    pub signature: Vec<u8>,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityUpdateTransition {
    pub protocol_version: ProtocolVersion,
    pub identity_id: Identifier,
    /// The identity's revision after this update.
    pub revision: Revision,
    pub add_public_keys: Vec<IdentityPublicKeyInCreation>,
    pub disable_public_keys: Vec<KeyId>,
    #[serde(default)]
    pub public_keys_disabled_at: Option<TimestampMillis>,
    pub signature_public_key_id: KeyId,
    #[serde_as(as = "Bytes")]
    pub signature: Vec<u8>,
}

// =============================================================================
// STATE TRANSITION
// =============================================================================

/// A client-submitted intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StateTransition {
    DataContractCreate(DataContractCreateTransition),
    DataContractUpdate(DataContractUpdateTransition),
    DocumentsBatch(DocumentsBatchTransition),
    IdentityCreate(IdentityCreateTransition),
    IdentityTopUp(IdentityTopUpTransition),
    IdentityUpdate(IdentityUpdateTransition),
}

impl StateTransition {
    pub fn transition_type(&self) -> StateTransitionType {
        match self {
            StateTransition::DataContractCreate(_) => StateTransitionType::DataContractCreate,
            StateTransition::DataContractUpdate(_) => StateTransitionType::DataContractUpdate,
            StateTransition::DocumentsBatch(_) => StateTransitionType::DocumentsBatch,
            StateTransition::IdentityCreate(_) => StateTransitionType::IdentityCreate,
            StateTransition::IdentityTopUp(_) => StateTransitionType::IdentityTopUp,
            StateTransition::IdentityUpdate(_) => StateTransitionType::IdentityUpdate,
        }
    }

    pub fn protocol_version(&self) -> ProtocolVersion {
        match self {
            StateTransition::DataContractCreate(t) => t.protocol_version,
            StateTransition::DataContractUpdate(t) => t.protocol_version,
            StateTransition::DocumentsBatch(t) => t.protocol_version,
            StateTransition::IdentityCreate(t) => t.protocol_version,
            StateTransition::IdentityTopUp(t) => t.protocol_version,
            StateTransition::IdentityUpdate(t) => t.protocol_version,
        }
    }

    /// Identity that owns, pays for and signs the transition.
    pub fn owner_id(&self) -> Identifier {
        match self {
            StateTransition::DataContractCreate(t) => t.data_contract.owner_id,
            StateTransition::DataContractUpdate(t) => t.data_contract.owner_id,
            StateTransition::DocumentsBatch(t) => t.owner_id,
            StateTransition::IdentityCreate(t) => t.identity_id,
            StateTransition::IdentityTopUp(t) => t.identity_id,
            StateTransition::IdentityUpdate(t) => t.identity_id,
        }
    }

    pub fn signature(&self) -> &[u8] {
        match self {
            StateTransition::DataContractCreate(t) => &t.signature,
            StateTransition::DataContractUpdate(t) => &t.signature,
            StateTransition::DocumentsBatch(t) => &t.signature,
            StateTransition::IdentityCreate(t) => &t.signature,
            StateTransition::IdentityTopUp(t) => &t.signature,
            StateTransition::IdentityUpdate(t) => &t.signature,
        }
    }

    pub fn set_signature(&mut self, signature: Vec<u8>) {
        match self {
            StateTransition::DataContractCreate(t) => t.signature = signature,
            StateTransition::DataContractUpdate(t) => t.signature = signature,
            StateTransition::DocumentsBatch(t) => t.signature = signature,
            StateTransition::IdentityCreate(t) => t.signature = signature,
            StateTransition::IdentityTopUp(t) => t.signature = signature,
            StateTransition::IdentityUpdate(t) => t.signature = signature,
        }
    }

    /// Key id of the signing identity key. `None` for asset-lock signed variants.
    pub fn signature_public_key_id(&self) -> Option<KeyId> {
        match self {
            StateTransition::DataContractCreate(t) => Some(t.signature_public_key_id),
            StateTransition::DataContractUpdate(t) => Some(t.signature_public_key_id),
            StateTransition::DocumentsBatch(t) => Some(t.signature_public_key_id),
            StateTransition::IdentityUpdate(t) => Some(t.signature_public_key_id),
            StateTransition::IdentityCreate(_) | StateTransition::IdentityTopUp(_) => None,
        }
    }

    /// Ids of the entities this transition writes.
    pub fn modified_data_ids(&self) -> Vec<Identifier> {
        match self {
            StateTransition::DataContractCreate(t) => vec![t.data_contract.id],
            StateTransition::DataContractUpdate(t) => vec![t.data_contract.id],
            StateTransition::DocumentsBatch(t) => {
                t.transitions.iter().map(DocumentTransition::id).collect()
            }
            StateTransition::IdentityCreate(t) => vec![t.identity_id],
            StateTransition::IdentityTopUp(t) => vec![t.identity_id],
            StateTransition::IdentityUpdate(t) => vec![t.identity_id],
        }
    }

    pub fn is_data_contract_state_transition(&self) -> bool {
        matches!(
            self,
            StateTransition::DataContractCreate(_) | StateTransition::DataContractUpdate(_)
        )
    }

    pub fn is_document_state_transition(&self) -> bool {
        matches!(self, StateTransition::DocumentsBatch(_))
    }

    pub fn is_identity_state_transition(&self) -> bool {
        matches!(
            self,
            StateTransition::IdentityCreate(_)
                | StateTransition::IdentityTopUp(_)
                | StateTransition::IdentityUpdate(_)
        )
    }

    /// Whether an identity key (rather than an asset-lock key) signs.
    pub fn is_identity_signed(&self) -> bool {
        self.signature_public_key_id().is_some()
    }

    /// Security levels a signing key may have.
    pub fn allowed_security_levels(&self) -> &'static [SecurityLevel] {
        match self {
            StateTransition::DataContractCreate(_) | StateTransition::DataContractUpdate(_) => {
                &[SecurityLevel::Critical, SecurityLevel::High]
            }
            StateTransition::DocumentsBatch(_) => &[
                SecurityLevel::Critical,
                SecurityLevel::High,
                SecurityLevel::Medium,
            ],
            StateTransition::IdentityUpdate(_) => &[SecurityLevel::Master],
            StateTransition::IdentityCreate(_) | StateTransition::IdentityTopUp(_) => &[],
        }
    }

    /// Bytes every signature covers: the encoding with all signatures emptied.
    pub fn signable_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut unsigned = self.clone();
        unsigned.set_signature(Vec::new());
        match &mut unsigned {
            StateTransition::IdentityCreate(t) => {
                t.public_keys.iter_mut().for_each(|key| key.signature.clear());
            }
            StateTransition::IdentityUpdate(t) => {
                t.add_public_keys
                    .iter_mut()
                    .for_each(|key| key.signature.clear());
            }
            _ => {}
        }
        Ok(bincode::serialize(&unsigned)?)
    }

    /// Sign with a private key and set the signature.
    pub fn sign(
        &mut self,
        key_type: KeyType,
        private_key: &[u8],
        crypto: &dyn CryptoAdapter,
    ) -> Result<(), ProtocolError> {
        let message = self.signable_bytes()?;
        let signature = crypto.sign(key_type, private_key, &message)?;
        self.set_signature(signature);
        Ok(())
    }

    /// JSON object of the variant with its numeric `type` tag, the form the
    /// fixed state-transition schemas validate.
    pub fn to_object(&self) -> Result<JsonValue, ProtocolError> {
        let mut object = match self {
            StateTransition::DataContractCreate(t) => serde_json::to_value(t)?,
            StateTransition::DataContractUpdate(t) => serde_json::to_value(t)?,
            StateTransition::DocumentsBatch(t) => serde_json::to_value(t)?,
            StateTransition::IdentityCreate(t) => serde_json::to_value(t)?,
            StateTransition::IdentityTopUp(t) => serde_json::to_value(t)?,
            StateTransition::IdentityUpdate(t) => serde_json::to_value(t)?,
        };
        if let JsonValue::Object(map) = &mut object {
            map.insert(
                "type".to_string(),
                JsonValue::from(self.transition_type().code()),
            );
        }
        Ok(object)
    }
}

impl IdentityCreateTransition {
    /// Sign every key's proof of possession. `private_keys` pairs with `public_keys`.
    pub fn sign_public_keys(
        &mut self,
        private_keys: &[&[u8]],
        crypto: &dyn CryptoAdapter,
    ) -> Result<(), ProtocolError> {
        let message = StateTransition::IdentityCreate(self.clone()).signable_bytes()?;
        for (key, private_key) in self.public_keys.iter_mut().zip(private_keys) {
            key.signature = crypto.sign(key.key_type, private_key, &message)?;
        }
        Ok(())
    }
}

impl IdentityUpdateTransition {
    /// Sign every added key's proof of possession. `private_keys` pairs with `add_public_keys`.
    pub fn sign_public_keys(
        &mut self,
        private_keys: &[&[u8]],
        crypto: &dyn CryptoAdapter,
    ) -> Result<(), ProtocolError> {
        let message = StateTransition::IdentityUpdate(self.clone()).signable_bytes()?;
        for (key, private_key) in self.add_public_keys.iter_mut().zip(private_keys) {
            key.signature = crypto.sign(key.key_type, private_key, &message)?;
        }
        Ok(())
    }
}

macro_rules! impl_from_variant {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for StateTransition {
                fn from(transition: $ty) -> Self {
                    StateTransition::$variant(transition)
                }
            }
        )*
    };
}

impl_from_variant!(
    DataContractCreate(DataContractCreateTransition),
    DataContractUpdate(DataContractUpdateTransition),
    DocumentsBatch(DocumentsBatchTransition),
    IdentityCreate(IdentityCreateTransition),
    IdentityTopUp(IdentityTopUpTransition),
    IdentityUpdate(IdentityUpdateTransition),
);
