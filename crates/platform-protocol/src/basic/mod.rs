//! # Basic Validation
//!
//! Structural checks that need no signature, balance or state beyond the
//! data contracts a documents batch references and the chain facts an
//! asset lock proof points at.
//!
//! ## Order
//!
//! 1. fixed JSON schema of the transition type (1005)
//! 2. protocol version (1002, 1003)
//! 3. encoded size (1045)
//! 4. variant rules, see the submodules
//!
//! Each step runs only when the previous ones passed.

pub mod data_contract;
pub mod documents_batch;
pub mod identity;

pub use data_contract::{validate_data_contract_create_basic, validate_data_contract_update_basic};
pub use documents_batch::validate_documents_batch_basic;
pub use identity::{
    validate_identity_create_basic, validate_identity_top_up_basic,
    validate_identity_update_basic, validate_master_key_present, validate_public_keys,
};

use crate::config::ProtocolConfig;
use crate::domain::{ExecutionContext, StateTransition, ValidationResult};
use crate::errors::{BasicError, ProtocolError};
use crate::ports::{CryptoAdapter, SchemaValidator, StateRepository};
use crate::schema::state_transition_schema;
use shared_types::ProtocolVersion;
use tracing::debug;

/// Version must lie in `min_protocol_version..=protocol_version`.
pub fn validate_protocol_version(
    version: ProtocolVersion,
    config: &ProtocolConfig,
) -> ValidationResult {
    if version < config.min_protocol_version {
        return ValidationResult::invalid(BasicError::IncompatibleProtocolVersion {
            parsed: version,
            minimal: config.min_protocol_version,
        });
    }
    if version > config.protocol_version {
        return ValidationResult::invalid(BasicError::UnsupportedProtocolVersion {
            parsed: version,
            latest: config.protocol_version,
        });
    }
    ValidationResult::valid()
}

/// Encoded transitions above `max_state_transition_size` are rejected.
pub fn validate_state_transition_size(
    state_transition: &StateTransition,
    config: &ProtocolConfig,
) -> Result<ValidationResult, ProtocolError> {
    let size = bincode::serialized_size(state_transition)? as usize;
    if size > config.max_state_transition_size {
        return Ok(ValidationResult::invalid(
            BasicError::StateTransitionMaxSizeExceeded {
                actual: size,
                max: config.max_state_transition_size,
            },
        ));
    }
    Ok(ValidationResult::valid())
}

/// Run every structural check of `state_transition`.
pub async fn validate_state_transition_basic(
    repository: &dyn StateRepository,
    crypto: &dyn CryptoAdapter,
    schema_validator: &dyn SchemaValidator,
    config: &ProtocolConfig,
    state_transition: &StateTransition,
    context: &ExecutionContext,
) -> Result<ValidationResult, ProtocolError> {
    let schema = state_transition_schema(state_transition.transition_type());
    let result = schema_validator.validate(&schema, &state_transition.to_object()?);
    if !result.is_valid() {
        debug!(
            transition_type = %state_transition.transition_type(),
            errors = result.errors().len(),
            "State transition does not match its schema"
        );
        return Ok(result);
    }

    let result = validate_protocol_version(state_transition.protocol_version(), config);
    if !result.is_valid() {
        return Ok(result);
    }

    let result = validate_state_transition_size(state_transition, config)?;
    if !result.is_valid() {
        return Ok(result);
    }

    match state_transition {
        StateTransition::DataContractCreate(t) => Ok(validate_data_contract_create_basic(
            t,
            schema_validator,
            config,
        )),
        StateTransition::DataContractUpdate(t) => Ok(validate_data_contract_update_basic(
            t,
            schema_validator,
            config,
        )),
        StateTransition::DocumentsBatch(t) => {
            validate_documents_batch_basic(repository, schema_validator, t, context).await
        }
        StateTransition::IdentityCreate(t) => {
            validate_identity_create_basic(repository, crypto, t, context).await
        }
        StateTransition::IdentityTopUp(t) => {
            validate_identity_top_up_basic(repository, t, context).await
        }
        StateTransition::IdentityUpdate(t) => validate_identity_update_basic(crypto, t),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryStateRepository, JsonSchemaValidator, NativeCryptoAdapter};
    use crate::domain::DocumentsBatchTransition;
    use shared_types::Identifier;

    fn empty_batch(protocol_version: ProtocolVersion) -> StateTransition {
        DocumentsBatchTransition {
            protocol_version,
            owner_id: Identifier::new([1; 32]),
            transitions: Vec::new(),
            signature_public_key_id: 0,
            signature: vec![0; 65],
        }
        .into()
    }

    #[test]
    fn test_protocol_version_bounds() {
        let config = ProtocolConfig::default();
        assert!(validate_protocol_version(1, &config).is_valid());
        assert_eq!(validate_protocol_version(0, &config).error_codes(), vec![1003]);
        assert_eq!(validate_protocol_version(2, &config).error_codes(), vec![1002]);
    }

    #[test]
    fn test_size_limit() {
        let config = ProtocolConfig {
            max_state_transition_size: 16,
            ..ProtocolConfig::default()
        };
        let result = validate_state_transition_size(&empty_batch(1), &config).unwrap();
        assert_eq!(result.error_codes(), vec![1045]);
    }

    #[tokio::test]
    async fn test_schema_runs_first_and_skips_repository() {
        let repository = InMemoryStateRepository::new();
        let result = validate_state_transition_basic(
            &repository,
            &NativeCryptoAdapter,
            &JsonSchemaValidator::new(),
            &ProtocolConfig::default(),
            &empty_batch(1),
            &ExecutionContext::new(),
        )
        .await
        .unwrap();

        // a batch needs at least one document transition
        assert_eq!(result.error_codes(), vec![1005]);
        assert_eq!(repository.call_count(), 0);
    }
}
