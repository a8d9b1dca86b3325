//! Structural checks of a documents batch.
//!
//! Contracts referenced by the batch are fetched to resolve document
//! types and schemas. Errors of every transition are collected before
//! the batch-wide duplicate checks run.

use crate::domain::{
    DocumentTransition, DocumentsBatchTransition, ExecutionContext, ValidationResult,
};
use crate::errors::{BasicError, DocumentTransitionReference, ProtocolError};
use crate::ports::{SchemaValidator, StateRepository};
use crate::schema::document_validation_schema;
use crate::uniqueness::{
    find_duplicates_by_id, find_duplicates_by_indices, validate_partial_compound_indices,
};
use shared_types::{DataContract, Identifier};
use std::collections::BTreeMap;
use tracing::debug;

fn references(transitions: &[&DocumentTransition]) -> Vec<DocumentTransitionReference> {
    transitions
        .iter()
        .map(|t| (t.document_type().to_string(), t.id()))
        .collect()
}

fn validate_document_transition(
    transition: &DocumentTransition,
    owner_id: &Identifier,
    contract: &DataContract,
    schema_validator: &dyn SchemaValidator,
) -> ValidationResult {
    let document_type = transition.document_type();
    let Some(schema) = document_validation_schema(contract, document_type) else {
        return ValidationResult::invalid(BasicError::InvalidDocumentType {
            document_type: document_type.to_string(),
            data_contract_id: contract.id,
        });
    };

    let mut result = ValidationResult::valid();
    if let DocumentTransition::Create(create) = transition {
        let expected = create.expected_id(owner_id);
        if create.base.id != expected {
            result.add_error(BasicError::InvalidDocumentTransitionId {
                expected,
                actual: create.base.id,
            });
        }
    }
    if let Some(data) = transition.data() {
        result.merge(schema_validator.validate(&schema, data));
    }
    result
}

/// Validate every document transition against its contract, then the
/// batch for duplicate ids, duplicate unique-index tuples and partially
/// set compound indices.
pub async fn validate_documents_batch_basic(
    repository: &dyn StateRepository,
    schema_validator: &dyn SchemaValidator,
    batch: &DocumentsBatchTransition,
    context: &ExecutionContext,
) -> Result<ValidationResult, ProtocolError> {
    let mut result = ValidationResult::valid();

    let mut by_contract: BTreeMap<Identifier, Vec<&DocumentTransition>> = BTreeMap::new();
    for transition in &batch.transitions {
        by_contract
            .entry(transition.data_contract_id())
            .or_default()
            .push(transition);
    }

    let mut contracts = Vec::with_capacity(by_contract.len());
    for (contract_id, transitions) in &by_contract {
        let Some(contract) = repository.fetch_data_contract(contract_id, context).await? else {
            debug!(data_contract_id = %contract_id, "Batch references unknown data contract");
            result.add_error(BasicError::DataContractNotPresent {
                data_contract_id: *contract_id,
            });
            continue;
        };
        for transition in transitions {
            result.merge(validate_document_transition(
                transition,
                &batch.owner_id,
                &contract,
                schema_validator,
            ));
        }
        contracts.push(contract);
    }
    if !result.is_valid() {
        return Ok(result);
    }

    let duplicate_ids = find_duplicates_by_id(&batch.transitions);
    if !duplicate_ids.is_empty() {
        result.add_error(BasicError::DuplicateDocumentTransitionsWithIds {
            references: references(&duplicate_ids),
        });
    }

    for contract in &contracts {
        let duplicate_tuples = find_duplicates_by_indices(&batch.transitions, &batch.owner_id, contract);
        if !duplicate_tuples.is_empty() {
            result.add_error(BasicError::DuplicateDocumentTransitionsWithIndices {
                references: references(&duplicate_tuples),
            });
        }
        result.merge(validate_partial_compound_indices(
            &batch.owner_id,
            &batch.transitions,
            contract,
        ));
    }

    Ok(result)
}
