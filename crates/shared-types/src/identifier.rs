//! # Identifiers
//!
//! 32-byte platform identifiers with a base58 text form, and the pure
//! functions deriving content-addressed ids for contracts and documents.

use crate::errors::IdentifierError;
use crate::hashing::hash_double;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// Length of every identifier in bytes.
pub const IDENTIFIER_LENGTH: usize = 32;

/// A 32-byte platform identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Identifier(pub [u8; IDENTIFIER_LENGTH]);

impl Identifier {
    /// Wrap raw bytes.
    pub const fn new(bytes: [u8; IDENTIFIER_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Build from a slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdentifierError> {
        let array: [u8; IDENTIFIER_LENGTH] = bytes
            .try_into()
            .map_err(|_| IdentifierError::InvalidLength(bytes.len()))?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; IDENTIFIER_LENGTH] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    pub fn from_base58(text: &str) -> Result<Self, IdentifierError> {
        let bytes = bs58::decode(text)
            .into_vec()
            .map_err(|e| IdentifierError::InvalidBase58(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Read an identifier stored in a JSON payload.
    ///
    /// Accepts the base58 text form or an array of 32 byte values.
    pub fn from_json(value: &JsonValue) -> Result<Self, IdentifierError> {
        match value {
            JsonValue::String(text) => Self::from_base58(text),
            JsonValue::Array(items) => {
                let bytes = items
                    .iter()
                    .map(|item| {
                        item.as_u64()
                            .and_then(|byte| u8::try_from(byte).ok())
                            .ok_or(IdentifierError::InvalidJsonType)
                    })
                    .collect::<Result<Vec<u8>, _>>()?;
                Self::from_slice(&bytes)
            }
            _ => Err(IdentifierError::InvalidJsonType),
        }
    }

    /// JSON payload form (base58 text).
    pub fn to_json(&self) -> JsonValue {
        JsonValue::String(self.to_base58())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.to_base58())
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s)
    }
}

impl From<[u8; IDENTIFIER_LENGTH]> for Identifier {
    fn from(bytes: [u8; IDENTIFIER_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Identifier {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// =============================================================================
// CONTENT-ADDRESSED IDS
// =============================================================================

/// Data contract id: `sha256d(owner_id ‖ entropy)`.
pub fn generate_data_contract_id(owner_id: &Identifier, entropy: &[u8; 32]) -> Identifier {
    let mut buffer = Vec::with_capacity(IDENTIFIER_LENGTH + entropy.len());
    buffer.extend_from_slice(owner_id.as_bytes());
    buffer.extend_from_slice(entropy);
    Identifier(hash_double(&buffer))
}

/// Document id: `sha256d(contract_id ‖ owner_id ‖ document_type ‖ entropy)`.
pub fn generate_document_id(
    contract_id: &Identifier,
    owner_id: &Identifier,
    document_type: &str,
    entropy: &[u8; 32],
) -> Identifier {
    let mut buffer =
        Vec::with_capacity(IDENTIFIER_LENGTH * 2 + document_type.len() + entropy.len());
    buffer.extend_from_slice(contract_id.as_bytes());
    buffer.extend_from_slice(owner_id.as_bytes());
    buffer.extend_from_slice(document_type.as_bytes());
    buffer.extend_from_slice(entropy);
    Identifier(hash_double(&buffer))
}
