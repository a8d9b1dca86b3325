//! Data contract state rules.
//!
//! ## Update evolution
//!
//! | Rule | Code |
//! |------|------|
//! | version is the stored version + 1 | 1050 |
//! | document schemas only widen | 1051 |
//! | `$schema`, `$id`, `ownerId`, `protocolVersion`, `entropy` are immutable | 1052 |
//! | existing unique indices are unchanged | 1053 |
//! | existing non-unique indices are unchanged, new ones only cover new properties | 1054 |
//! | no new unique index on an existing type | 1055 |

use crate::domain::{
    DataContractCreateTransition, DataContractUpdateTransition, ExecutionContext,
    ValidationResult,
};
use crate::errors::{BasicError, ProtocolError, StateError};
use crate::ports::StateRepository;
use serde_json::Value as JsonValue;
use shared_types::{DataContract, IndexDefinition};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

pub async fn validate_data_contract_create_state(
    repository: &dyn StateRepository,
    transition: &DataContractCreateTransition,
    context: &ExecutionContext,
) -> Result<ValidationResult, ProtocolError> {
    let id = transition.data_contract.id;
    if repository.fetch_data_contract(&id, context).await?.is_some() {
        return Ok(ValidationResult::invalid(
            StateError::DataContractAlreadyPresent {
                data_contract_id: id,
            },
        ));
    }
    Ok(ValidationResult::valid())
}

/// The stored contract must exist. A missing one is not a consensus error.
pub async fn validate_data_contract_update_state(
    repository: &dyn StateRepository,
    transition: &DataContractUpdateTransition,
    context: &ExecutionContext,
) -> Result<ValidationResult, ProtocolError> {
    let new = &transition.data_contract;
    let existing = repository
        .fetch_data_contract(&new.id, context)
        .await?
        .ok_or(ProtocolError::DataContractNotPresent {
            data_contract_id: new.id,
        })?;

    let expected = existing.version + 1;
    if new.version != expected {
        return Ok(ValidationResult::invalid(
            BasicError::InvalidDataContractVersion {
                expected,
                actual: new.version,
            },
        ));
    }

    let mut result = validate_immutable_properties(&existing, new);
    result.merge(validate_schema_backward_compatibility(&existing, new));
    result.merge(validate_indices_are_backward_compatible(&existing, new)?);

    if !result.is_valid() {
        debug!(
            data_contract_id = %new.id,
            errors = result.errors().len(),
            "Data contract update is not backward compatible"
        );
    }
    Ok(result)
}

fn validate_immutable_properties(existing: &DataContract, new: &DataContract) -> ValidationResult {
    let mut result = ValidationResult::valid();
    let mut check = |changed: bool, field: &str| {
        if changed {
            result.add_error(BasicError::DataContractImmutablePropertiesUpdate {
                operation: "replace".to_string(),
                field_path: format!("/{field}"),
            });
        }
    };

    check(existing.schema != new.schema, "$schema");
    check(existing.id != new.id, "$id");
    check(existing.owner_id != new.owner_id, "ownerId");
    check(existing.protocol_version != new.protocol_version, "protocolVersion");
    // Updates do not carry entropy.
    check(
        new.entropy.is_some() && existing.entropy != new.entropy,
        "entropy",
    );

    result
}

// =============================================================================
// SCHEMA EVOLUTION
// =============================================================================

fn pointer_segment(name: &str) -> String {
    name.replace('~', "~0").replace('/', "~1")
}

fn incompatible(result: &mut ValidationResult, contract: &DataContract, operation: &str, path: String) {
    result.add_error(BasicError::IncompatibleDataContractSchema {
        data_contract_id: contract.id,
        operation: operation.to_string(),
        field_path: path,
    });
}

fn required_set(schema: &JsonValue) -> BTreeSet<&str> {
    schema
        .get("required")
        .and_then(JsonValue::as_array)
        .map(|items| items.iter().filter_map(JsonValue::as_str).collect())
        .unwrap_or_default()
}

fn keyword_u64(schema: &JsonValue, keyword: &str) -> Option<u64> {
    schema.get(keyword).and_then(JsonValue::as_u64)
}

/// Compare one schema node with its replacement.
fn compare_schema(
    result: &mut ValidationResult,
    contract: &DataContract,
    old: &JsonValue,
    new: &JsonValue,
    path: &str,
) {
    if old.get("type") != new.get("type") {
        incompatible(result, contract, "replace", format!("{path}/type"));
    }

    let old_required = required_set(old);
    if required_set(new).iter().any(|name| !old_required.contains(name)) {
        incompatible(result, contract, "add", format!("{path}/required"));
    }

    for keyword in ["maxLength", "maxItems"] {
        if let (Some(before), Some(after)) = (keyword_u64(old, keyword), keyword_u64(new, keyword)) {
            if after < before {
                incompatible(result, contract, "replace", format!("{path}/{keyword}"));
            }
        } else if keyword_u64(old, keyword).is_none() && keyword_u64(new, keyword).is_some() {
            incompatible(result, contract, "add", format!("{path}/{keyword}"));
        }
    }

    for keyword in ["minLength", "minItems"] {
        let before = keyword_u64(old, keyword).unwrap_or(0);
        let after = keyword_u64(new, keyword).unwrap_or(0);
        if after > before {
            incompatible(result, contract, "replace", format!("{path}/{keyword}"));
        }
    }

    if old.get("additionalProperties") == Some(&JsonValue::Bool(false))
        && new.get("additionalProperties") != Some(&JsonValue::Bool(false))
    {
        incompatible(result, contract, "replace", format!("{path}/additionalProperties"));
    }

    if let Some(old_properties) = old.get("properties").and_then(JsonValue::as_object) {
        let new_properties = new.get("properties").and_then(JsonValue::as_object);
        for (name, old_property) in old_properties {
            let property_path = format!("{path}/properties/{}", pointer_segment(name));
            match new_properties.and_then(|properties| properties.get(name)) {
                Some(new_property) => {
                    compare_schema(result, contract, old_property, new_property, &property_path)
                }
                None => incompatible(result, contract, "remove", property_path),
            }
        }
    }

    if let (Some(old_items), Some(new_items)) = (old.get("items"), new.get("items")) {
        if old_items.is_object() && new_items.is_object() {
            compare_schema(result, contract, old_items, new_items, &format!("{path}/items"));
        }
    }
}

/// Existing document types may only widen: properties are never removed,
/// retyped or newly required, and length limits never tighten.
pub fn validate_schema_backward_compatibility(
    existing: &DataContract,
    new: &DataContract,
) -> ValidationResult {
    let mut result = ValidationResult::valid();

    for (document_type, old_schema) in &existing.documents {
        let path = format!("/documents/{}", pointer_segment(document_type));
        match new.documents.get(document_type) {
            Some(new_schema) => compare_schema(&mut result, new, old_schema, new_schema, &path),
            None => incompatible(&mut result, new, "remove", path),
        }
    }

    for (name, old_schema) in &existing.defs {
        let path = format!("/$defs/{}", pointer_segment(name));
        match new.defs.get(name) {
            Some(new_schema) => compare_schema(&mut result, new, old_schema, new_schema, &path),
            None => incompatible(&mut result, new, "remove", path),
        }
    }

    result
}

// =============================================================================
// INDEX EVOLUTION
// =============================================================================

fn property_names(schema: &JsonValue) -> BTreeSet<&str> {
    schema
        .get("properties")
        .and_then(JsonValue::as_object)
        .map(|properties| properties.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

/// Existing indices of existing document types are unchanged. New unique
/// indices are not allowed there, and new non-unique indices may only cover
/// properties added by the same update.
pub fn validate_indices_are_backward_compatible(
    existing: &DataContract,
    new: &DataContract,
) -> Result<ValidationResult, ProtocolError> {
    let mut result = ValidationResult::valid();

    for (document_type, old_schema) in &existing.documents {
        if !new.has_document_type(document_type) {
            continue;
        }
        let old_indices: BTreeMap<String, IndexDefinition> = existing
            .indices(document_type)?
            .into_iter()
            .map(|index| (index.name.clone(), index))
            .collect();
        let new_indices: BTreeMap<String, IndexDefinition> = new
            .indices(document_type)?
            .into_iter()
            .map(|index| (index.name.clone(), index))
            .collect();

        for (name, old_index) in &old_indices {
            if new_indices.get(name) == Some(old_index) {
                continue;
            }
            if old_index.unique {
                result.add_error(BasicError::DataContractUniqueIndicesChanged {
                    document_type: document_type.clone(),
                    index_name: name.clone(),
                });
            } else {
                result.add_error(BasicError::DataContractInvalidIndexDefinitionUpdate {
                    document_type: document_type.clone(),
                    index_name: name.clone(),
                });
            }
        }

        let old_properties = property_names(old_schema);
        for (name, new_index) in new_indices.iter().filter(|(name, _)| !old_indices.contains_key(*name)) {
            if new_index.unique {
                result.add_error(BasicError::DataContractHaveNewUniqueIndex {
                    document_type: document_type.clone(),
                    index_name: name.clone(),
                });
            } else if new_index
                .property_names()
                .any(|property| old_properties.contains(property) || property.starts_with('$'))
            {
                result.add_error(BasicError::DataContractInvalidIndexDefinitionUpdate {
                    document_type: document_type.clone(),
                    index_name: name.clone(),
                });
            }
        }
    }

    Ok(result)
}
