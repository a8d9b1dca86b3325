//! # Wire Codec
//!
//! Every buffer is framed as a 4-byte little-endian protocol version
//! followed by the bincode encoding of the entity.
//!
//! ```text
//! ┌──────────────────┬─────────────────────────┐
//! │ version (u32 LE) │ bincode(entity)         │
//! └──────────────────┴─────────────────────────┘
//! ```
//!
//! Consensus errors use the same framing with their code in front of the
//! encoded error, so the code survives a process boundary even for readers
//! that cannot decode the payload.

use crate::errors::{BasicError, ConsensusError, ProtocolError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{ProtocolVersion, LATEST_PROTOCOL_VERSION};

/// Length of the version prefix.
pub const PROTOCOL_VERSION_SIZE: usize = 4;

/// Oldest protocol version a buffer may carry.
pub const MIN_PROTOCOL_VERSION: ProtocolVersion = 1;

/// Frame `entity` at `protocol_version`.
pub fn encode_protocol_entity<T: Serialize>(
    entity: &T,
    protocol_version: ProtocolVersion,
) -> Result<Vec<u8>, ProtocolError> {
    let body = bincode::serialize(entity)?;
    let mut buffer = Vec::with_capacity(PROTOCOL_VERSION_SIZE + body.len());
    buffer.extend_from_slice(&protocol_version.to_le_bytes());
    buffer.extend_from_slice(&body);
    Ok(buffer)
}

/// Decode a framed entity, accepting versions this build understands.
pub fn decode_protocol_entity<T: DeserializeOwned>(
    buffer: &[u8],
) -> Result<(ProtocolVersion, T), BasicError> {
    decode_protocol_entity_with_versions(buffer, MIN_PROTOCOL_VERSION, LATEST_PROTOCOL_VERSION)
}

/// Decode a framed entity whose version must lie in `minimal..=latest`.
pub fn decode_protocol_entity_with_versions<T: DeserializeOwned>(
    buffer: &[u8],
    minimal: ProtocolVersion,
    latest: ProtocolVersion,
) -> Result<(ProtocolVersion, T), BasicError> {
    let (version, body) = split_version(buffer)?;

    if version > latest {
        return Err(BasicError::UnsupportedProtocolVersion {
            parsed: version,
            latest,
        });
    }
    if version < minimal {
        return Err(BasicError::IncompatibleProtocolVersion {
            parsed: version,
            minimal,
        });
    }

    let entity = bincode::deserialize(body).map_err(|e| BasicError::SerializedObjectParsing {
        message: e.to_string(),
    })?;
    Ok((version, entity))
}

fn split_version(buffer: &[u8]) -> Result<(ProtocolVersion, &[u8]), BasicError> {
    if buffer.len() < PROTOCOL_VERSION_SIZE {
        return Err(BasicError::ProtocolVersionParsing {
            message: format!(
                "buffer of {} bytes is shorter than the {PROTOCOL_VERSION_SIZE}-byte version prefix",
                buffer.len()
            ),
        });
    }
    let (prefix, body) = buffer.split_at(PROTOCOL_VERSION_SIZE);
    let mut bytes = [0u8; PROTOCOL_VERSION_SIZE];
    bytes.copy_from_slice(prefix);
    Ok((ProtocolVersion::from_le_bytes(bytes), body))
}

// =============================================================================
// CONSENSUS ERRORS
// =============================================================================

/// Frame a consensus error for another process.
pub fn serialize_consensus_error(error: &ConsensusError) -> Result<Vec<u8>, ProtocolError> {
    encode_protocol_entity(&(error.code(), error), LATEST_PROTOCOL_VERSION)
}

/// Inverse of [`serialize_consensus_error`].
///
/// A buffer whose code does not match its payload is rejected.
pub fn deserialize_consensus_error(buffer: &[u8]) -> Result<ConsensusError, ProtocolError> {
    let (_, (code, error)): (_, (u32, ConsensusError)) =
        decode_protocol_entity(buffer).map_err(|e| ProtocolError::Codec(e.to_string()))?;

    if error.code() != code {
        return Err(ProtocolError::Codec(format!(
            "consensus error code {code} does not match payload code {}",
            error.code()
        )));
    }
    Ok(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{SignatureError, StateError};
    use shared_types::Identifier;

    #[test]
    fn test_entity_roundtrip() {
        let entity = (42u64, "platform".to_string());
        let buffer = encode_protocol_entity(&entity, 1).unwrap();
        assert_eq!(&buffer[..4], &[1, 0, 0, 0]);

        let (version, decoded): (_, (u64, String)) = decode_protocol_entity(&buffer).unwrap();
        assert_eq!(version, 1);
        assert_eq!(decoded, entity);
    }

    #[test]
    fn test_short_buffer() {
        let error = decode_protocol_entity::<u64>(&[1, 0]).unwrap_err();
        assert_eq!(error.code(), 1000);
    }

    #[test]
    fn test_unknown_version() {
        let buffer = encode_protocol_entity(&1u64, LATEST_PROTOCOL_VERSION + 1).unwrap();
        let error = decode_protocol_entity::<u64>(&buffer).unwrap_err();
        assert_eq!(error.code(), 1002);

        let buffer = encode_protocol_entity(&1u64, 0).unwrap();
        let error = decode_protocol_entity::<u64>(&buffer).unwrap_err();
        assert_eq!(error.code(), 1003);
    }

    #[test]
    fn test_garbage_body() {
        let mut buffer = 1u32.to_le_bytes().to_vec();
        buffer.push(0xff);
        let error = decode_protocol_entity::<String>(&buffer).unwrap_err();
        assert_eq!(error.code(), 1001);
    }

    #[test]
    fn test_consensus_error_roundtrip_keeps_code() {
        let errors: Vec<ConsensusError> = vec![
            SignatureError::MissingPublicKey { public_key_id: 3 }.into(),
            StateError::DuplicateUniqueIndex {
                document_id: Identifier::new([4; 32]),
                duplicating_properties: vec!["label".to_string()],
            }
            .into(),
            BasicError::DuplicateDocumentTransitionsWithIds {
                references: vec![("note".to_string(), Identifier::new([5; 32]))],
            }
            .into(),
        ];

        for error in errors {
            let buffer = serialize_consensus_error(&error).unwrap();
            let decoded = deserialize_consensus_error(&buffer).unwrap();
            assert_eq!(decoded.code(), error.code());
            assert_eq!(decoded, error);
        }
    }

    #[test]
    fn test_consensus_error_code_mismatch() {
        let error: ConsensusError = SignatureError::InvalidStateTransitionSignature.into();
        let buffer = encode_protocol_entity(&(1u32, &error), 1).unwrap();
        assert!(matches!(
            deserialize_consensus_error(&buffer),
            Err(ProtocolError::Codec(_))
        ));
    }
}
