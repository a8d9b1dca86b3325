//! Structural checks of data contract transitions.

use crate::config::ProtocolConfig;
use crate::domain::{DataContractCreateTransition, DataContractUpdateTransition, ValidationResult};
use crate::errors::BasicError;
use crate::ports::SchemaValidator;
use crate::schema::validate_data_contract;
use shared_types::generate_data_contract_id;

/// The contract is well-formed and its id derives from owner and entropy.
pub fn validate_data_contract_create_basic(
    transition: &DataContractCreateTransition,
    schema_validator: &dyn SchemaValidator,
    config: &ProtocolConfig,
) -> ValidationResult {
    let mut result = validate_data_contract(&transition.data_contract, schema_validator, config);
    if !result.is_valid() {
        return result;
    }

    let contract = &transition.data_contract;
    let expected = generate_data_contract_id(&contract.owner_id, &transition.entropy);
    if contract.id != expected {
        result.add_error(BasicError::InvalidDataContractId {
            expected,
            actual: contract.id,
        });
    }
    result
}

pub fn validate_data_contract_update_basic(
    transition: &DataContractUpdateTransition,
    schema_validator: &dyn SchemaValidator,
    config: &ProtocolConfig,
) -> ValidationResult {
    validate_data_contract(&transition.data_contract, schema_validator, config)
}
