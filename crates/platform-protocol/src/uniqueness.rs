//! # Document Uniqueness
//!
//! Duplicate detection inside a batch and unique-index checks against
//! stored documents.
//!
//! An index tuple is the list of values a document has for an index's
//! properties. Tuples with a missing value take no part in uniqueness.

use crate::domain::{DocumentTransition, DocumentTransitionAction, ExecutionContext, ValidationResult};
use crate::errors::{BasicError, ProtocolError, StateError};
use crate::ports::{DocumentQuery, StateRepository};
use serde_json::Value as JsonValue;
use shared_types::{DataContract, Identifier, IndexDefinition};
use std::collections::HashMap;
use tracing::debug;

fn is_create_or_replace(transition: &DocumentTransition) -> bool {
    matches!(
        transition.action(),
        DocumentTransitionAction::Create | DocumentTransitionAction::Replace
    )
}

/// Values of `index` for `transition`, `None` if any is missing.
fn index_tuple(
    transition: &DocumentTransition,
    index: &IndexDefinition,
    owner_id: &Identifier,
) -> Option<Vec<JsonValue>> {
    index
        .property_names()
        .map(|name| transition.get(name, owner_id))
        .collect()
}

/// Transitions whose `(type, id)` occurs more than once, in batch order.
pub fn find_duplicates_by_id(transitions: &[DocumentTransition]) -> Vec<&DocumentTransition> {
    let mut counts: HashMap<(&str, Identifier), usize> = HashMap::new();
    for transition in transitions {
        *counts
            .entry((transition.document_type(), transition.id()))
            .or_default() += 1;
    }
    transitions
        .iter()
        .filter(|t| counts[&(t.document_type(), t.id())] > 1)
        .collect()
}

/// Create and replace transitions of `contract` that share a unique index
/// tuple with another transition of the batch, in batch order.
pub fn find_duplicates_by_indices<'a>(
    transitions: &'a [DocumentTransition],
    owner_id: &Identifier,
    contract: &DataContract,
) -> Vec<&'a DocumentTransition> {
    let mut duplicates: Vec<&DocumentTransition> = Vec::new();

    for document_type in contract.documents.keys() {
        let Ok(unique_indices) = contract.unique_indices(document_type) else {
            continue;
        };
        let candidates: Vec<&DocumentTransition> = transitions
            .iter()
            .filter(|t| t.data_contract_id() == contract.id)
            .filter(|t| t.document_type() == document_type.as_str())
            .filter(|t| is_create_or_replace(t))
            .collect();

        for index in &unique_indices {
            let mut seen: HashMap<String, Vec<&DocumentTransition>> = HashMap::new();
            for transition in &candidates {
                if let Some(tuple) = index_tuple(transition, index, owner_id) {
                    seen.entry(JsonValue::Array(tuple).to_string())
                        .or_default()
                        .push(*transition);
                }
            }
            for group in seen.into_values().filter(|group| group.len() > 1) {
                for transition in group {
                    if !duplicates.iter().any(|d| std::ptr::eq(*d, transition)) {
                        duplicates.push(transition);
                    }
                }
            }
        }
    }

    // restore batch order
    duplicates.sort_by_key(|d| {
        transitions
            .iter()
            .position(|t| std::ptr::eq(t, *d))
            .unwrap_or(usize::MAX)
    });
    duplicates
}

/// Unique compound indices must be either fully set or fully unset.
///
/// System properties are always set and do not count.
pub fn validate_partial_compound_indices(
    owner_id: &Identifier,
    transitions: &[DocumentTransition],
    contract: &DataContract,
) -> ValidationResult {
    let mut result = ValidationResult::valid();

    for transition in transitions
        .iter()
        .filter(|t| t.data_contract_id() == contract.id)
        .filter(|t| is_create_or_replace(t))
    {
        let Ok(unique_indices) = contract.unique_indices(transition.document_type()) else {
            continue;
        };
        for index in unique_indices.iter().filter(|i| i.properties.len() > 1) {
            let user_properties: Vec<&str> = index
                .property_names()
                .filter(|name| !name.starts_with('$'))
                .collect();
            let defined = user_properties
                .iter()
                .filter(|name| transition.get(name, owner_id).is_some())
                .count();
            if defined != 0 && defined != user_properties.len() {
                result.add_error(BasicError::InconsistentCompoundIndexData {
                    document_type: transition.document_type().to_string(),
                    index_properties: index.property_names().map(str::to_string).collect(),
                });
            }
        }
    }

    result
}

/// Unique-index conflicts of create and replace transitions with stored
/// documents. The document a replace targets does not conflict with itself.
pub async fn validate_documents_uniqueness_by_indices(
    repository: &dyn StateRepository,
    owner_id: &Identifier,
    transitions: &[&DocumentTransition],
    contract: &DataContract,
    context: &ExecutionContext,
) -> Result<ValidationResult, ProtocolError> {
    let mut result = ValidationResult::valid();

    for transition in transitions.iter().filter(|t| is_create_or_replace(t)) {
        let document_type = transition.document_type();
        let unique_indices = contract.unique_indices(document_type)?;

        for index in &unique_indices {
            let Some(tuple) = index_tuple(transition, index, owner_id) else {
                continue;
            };
            let query = index
                .property_names()
                .zip(tuple)
                .fold(DocumentQuery::new(), |query, (name, value)| {
                    query.with_equal(name, value)
                });

            let existing = repository
                .fetch_documents(&contract.id, document_type, &query, context)
                .await?;
            if existing.iter().any(|document| document.id != transition.id()) {
                debug!(
                    document_id = %transition.id(),
                    index = %index.name,
                    "Unique index conflict with stored document"
                );
                result.add_error(StateError::DuplicateUniqueIndex {
                    document_id: transition.id(),
                    duplicating_properties: index.property_names().map(str::to_string).collect(),
                });
            }
        }
    }

    Ok(result)
}
