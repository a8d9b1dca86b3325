//! Signatures by a stored identity key.

use crate::domain::{ExecutionContext, Operation, StateTransition, ValidationResult};
use crate::errors::{ProtocolError, SignatureError};
use crate::ports::{CryptoAdapter, StateRepository};
use shared_types::{DataContract, Identifier, KeyType, Purpose, SecurityLevel};
use std::collections::HashMap;
use tracing::debug;

/// Document schema keyword naming the weakest key level allowed to sign.
pub const SECURITY_LEVEL_REQUIREMENT_KEYWORD: &str = "signatureSecurityLevelRequirement";

/// Level required when a document type does not name one.
pub const DEFAULT_DOCUMENT_SECURITY_LEVEL: SecurityLevel = SecurityLevel::High;

/// Key types an identity can sign state transitions with.
pub fn is_signature_supported(key_type: KeyType) -> bool {
    matches!(
        key_type,
        KeyType::EcdsaSecp256k1 | KeyType::Bls12_381 | KeyType::EcdsaHash160
    )
}

/// Security level a document type asks of the signing key.
pub fn document_type_security_level(contract: &DataContract, document_type: &str) -> SecurityLevel {
    contract
        .documents
        .get(document_type)
        .and_then(|schema| schema.get(SECURITY_LEVEL_REQUIREMENT_KEYWORD))
        .and_then(|level| serde_json::from_value::<SecurityLevel>(level.clone()).ok())
        .unwrap_or(DEFAULT_DOCUMENT_SECURITY_LEVEL)
}

/// Strictest level among the document types a batch touches.
async fn required_security_level(
    repository: &dyn StateRepository,
    state_transition: &StateTransition,
    context: &ExecutionContext,
) -> Result<Option<SecurityLevel>, ProtocolError> {
    let StateTransition::DocumentsBatch(batch) = state_transition else {
        return Ok(None);
    };

    let mut contracts: HashMap<Identifier, Option<DataContract>> = HashMap::new();
    let mut required: Option<SecurityLevel> = None;
    for transition in &batch.transitions {
        let contract_id = transition.data_contract_id();
        if !contracts.contains_key(&contract_id) {
            let contract = repository.fetch_data_contract(&contract_id, context).await?;
            contracts.insert(contract_id, contract);
        }
        let Some(Some(contract)) = contracts.get(&contract_id) else {
            continue;
        };
        let level = document_type_security_level(contract, transition.document_type());
        required = Some(required.map_or(level, |current| current.min(level)));
    }
    Ok(required)
}

/// Resolve the signing key of an identity-signed transition and verify
/// its signature.
///
/// In dry-run the key checks run but the signature itself is not verified.
pub async fn validate_state_transition_identity_signature(
    repository: &dyn StateRepository,
    crypto: &dyn CryptoAdapter,
    state_transition: &StateTransition,
    context: &ExecutionContext,
) -> Result<ValidationResult, ProtocolError> {
    let Some(key_id) = state_transition.signature_public_key_id() else {
        return Err(ProtocolError::InvalidEntity(format!(
            "{} is not signed by an identity key",
            state_transition.transition_type()
        )));
    };

    let identity_id = state_transition.owner_id();
    let Some(identity) = repository.fetch_identity(&identity_id, context).await? else {
        return Ok(ValidationResult::invalid(SignatureError::IdentityNotFound {
            identity_id,
        }));
    };

    let Some(key) = identity.public_key(key_id) else {
        return Ok(ValidationResult::invalid(SignatureError::MissingPublicKey {
            public_key_id: key_id,
        }));
    };

    if !is_signature_supported(key.key_type) {
        return Ok(ValidationResult::invalid(
            SignatureError::InvalidIdentityPublicKeyType {
                key_type: key.key_type,
            },
        ));
    }

    if key.purpose != Purpose::Authentication {
        return Ok(ValidationResult::invalid(SignatureError::WrongPublicKeyPurpose {
            purpose: key.purpose,
            expected: Purpose::Authentication,
        }));
    }

    let allowed = state_transition.allowed_security_levels();
    if !allowed.contains(&key.security_level) {
        return Ok(ValidationResult::invalid(
            SignatureError::InvalidSignaturePublicKeySecurityLevel {
                security_level: key.security_level,
                allowed: allowed.to_vec(),
            },
        ));
    }

    if let Some(required) = required_security_level(repository, state_transition, context).await? {
        if key.security_level > required {
            return Ok(ValidationResult::invalid(
                SignatureError::PublicKeySecurityLevelNotMet {
                    security_level: key.security_level,
                    required,
                },
            ));
        }
    }

    if key.is_disabled() {
        return Ok(ValidationResult::invalid(SignatureError::PublicKeyIsDisabled {
            public_key_id: key_id,
        }));
    }

    context.add_operation(Operation::SignatureVerification {
        signature_type: key.key_type,
    });
    if context.is_dry_run() {
        return Ok(ValidationResult::valid());
    }

    let message = state_transition.signable_bytes()?;
    if let Err(e) = crypto.verify_signature(
        key.key_type,
        &key.data,
        &message,
        state_transition.signature(),
    ) {
        debug!(
            identity_id = %identity_id,
            key_id,
            error = %e,
            "State transition signature rejected"
        );
        return Ok(ValidationResult::invalid(
            SignatureError::InvalidStateTransitionSignature,
        ));
    }

    Ok(ValidationResult::valid())
}
