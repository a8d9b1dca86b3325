//! # Data Contracts
//!
//! A data contract is an application's schema: one JSON schema per document
//! type, shared sub-schemas under `$defs`, and index definitions embedded in
//! each document schema under `indices`.
//!
//! ## Invariants
//!
//! | Id | Invariant |
//! |----|-----------|
//! | 1 | `id == sha256d(owner_id ‖ entropy)` at creation, never changes |
//! | 2 | `version` only increases, by exactly one per update |
//! | 3 | existing document schemas only evolve backward-compatibly |

use crate::block::Metadata;
use crate::errors::EntityError;
use crate::identifier::{generate_data_contract_id, Identifier};
use crate::ProtocolVersion;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Meta-schema URI every data contract declares.
pub const DATA_CONTRACT_META_SCHEMA: &str =
    "https://schema.dash.org/dpp-0-4-0/meta/data-contract";

/// System properties a document may be indexed by.
pub const ALLOWED_INDEX_SYSTEM_PROPERTIES: [&str; 3] = ["$ownerId", "$createdAt", "$updatedAt"];

/// System properties that may never appear in an index.
pub const NOT_ALLOWED_SYSTEM_PROPERTIES: [&str; 1] = ["$id"];

/// An application schema governing a set of document types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataContract {
    #[serde(rename = "$id")]
    pub id: Identifier,
    #[serde(rename = "$schema")]
    pub schema: String,
    pub owner_id: Identifier,
    pub protocol_version: ProtocolVersion,
    pub version: u32,
    /// Document type name to JSON schema.
    #[serde(with = "crate::json_compat")]
    pub documents: BTreeMap<String, JsonValue>,
    /// Shared sub-schemas referenced as `#/$defs/<name>`.
    #[serde(rename = "$defs", default, with = "crate::json_compat")]
    pub defs: BTreeMap<String, JsonValue>,
    /// Creation entropy. Only meaningful on the create transition.
    #[serde(default)]
    pub entropy: Option<[u8; 32]>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl DataContract {
    /// Build a new contract at version 1, deriving its id from the entropy.
    pub fn new(
        owner_id: Identifier,
        entropy: [u8; 32],
        protocol_version: ProtocolVersion,
        documents: BTreeMap<String, JsonValue>,
        defs: BTreeMap<String, JsonValue>,
    ) -> Self {
        Self {
            id: generate_data_contract_id(&owner_id, &entropy),
            schema: DATA_CONTRACT_META_SCHEMA.to_string(),
            owner_id,
            protocol_version,
            version: 1,
            documents,
            defs,
            entropy: Some(entropy),
            metadata: None,
        }
    }

    pub fn has_document_type(&self, document_type: &str) -> bool {
        self.documents.contains_key(document_type)
    }

    pub fn document_schema(&self, document_type: &str) -> Result<&JsonValue, EntityError> {
        self.documents
            .get(document_type)
            .ok_or_else(|| EntityError::UnknownDocumentType(document_type.to_string()))
    }

    /// Index definitions declared by a document type.
    pub fn indices(&self, document_type: &str) -> Result<Vec<IndexDefinition>, EntityError> {
        let schema = self.document_schema(document_type)?;
        match schema.get("indices") {
            None => Ok(Vec::new()),
            Some(JsonValue::Array(items)) => items.iter().map(IndexDefinition::from_json).collect(),
            Some(_) => Err(EntityError::UnexpectedType {
                property: format!("{document_type}.indices"),
                expected: "array",
            }),
        }
    }

    pub fn unique_indices(&self, document_type: &str) -> Result<Vec<IndexDefinition>, EntityError> {
        Ok(self
            .indices(document_type)?
            .into_iter()
            .filter(|index| index.unique)
            .collect())
    }

    /// Names listed in the document type's top-level `required` array.
    pub fn required_fields(&self, document_type: &str) -> Result<Vec<String>, EntityError> {
        let schema = self.document_schema(document_type)?;
        Ok(required_fields(schema))
    }

    /// Resolve the schema of a dotted property path within a document type.
    ///
    /// `$ref`s into the contract's `$defs` are followed.
    pub fn property_definition(&self, document_type: &str, path: &str) -> Option<&JsonValue> {
        let mut current = self.resolve_ref(self.documents.get(document_type)?)?;
        for segment in path.split('.') {
            let properties = current.get("properties")?;
            current = self.resolve_ref(properties.get(segment)?)?;
        }
        Some(current)
    }

    fn resolve_ref<'a>(&'a self, schema: &'a JsonValue) -> Option<&'a JsonValue> {
        match schema.get("$ref").and_then(JsonValue::as_str) {
            Some(reference) => {
                let name = reference.strip_prefix("#/$defs/")?;
                self.defs.get(name)
            }
            None => Some(schema),
        }
    }

    /// JSON object form.
    pub fn to_object(&self) -> Result<JsonValue, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn from_object(object: JsonValue) -> Result<Self, serde_json::Error> {
        serde_json::from_value(object)
    }

    /// Copy with the version bumped, as an update transition carries it.
    pub fn next_version(&self) -> Self {
        let mut next = self.clone();
        next.version += 1;
        next.entropy = None;
        next
    }
}

/// Names listed in a schema's `required` array.
pub fn required_fields(schema: &JsonValue) -> Vec<String> {
    schema
        .get("required")
        .and_then(JsonValue::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(JsonValue::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

// =============================================================================
// INDICES
// =============================================================================

/// One property of an index, with its sort direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexProperty {
    pub name: String,
    pub ascending: bool,
}

/// A (possibly compound, possibly unique) index over document properties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub properties: Vec<IndexProperty>,
    pub unique: bool,
}

impl IndexDefinition {
    /// Parse the schema form `{"name", "properties": [{"field": "asc"}], "unique"}`.
    pub fn from_json(value: &JsonValue) -> Result<Self, EntityError> {
        let name = value
            .get("name")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| EntityError::MissingProperty("indices[].name".to_string()))?
            .to_string();

        let raw_properties = value
            .get("properties")
            .and_then(JsonValue::as_array)
            .ok_or_else(|| EntityError::MissingProperty("indices[].properties".to_string()))?;

        let mut properties = Vec::with_capacity(raw_properties.len());
        for raw in raw_properties {
            let object = raw.as_object().ok_or(EntityError::UnexpectedType {
                property: "indices[].properties[]".to_string(),
                expected: "object",
            })?;
            for (field, direction) in object {
                properties.push(IndexProperty {
                    name: field.clone(),
                    ascending: direction.as_str() != Some("desc"),
                });
            }
        }

        let unique = value
            .get("unique")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false);

        Ok(Self {
            name,
            properties,
            unique,
        })
    }

    /// Schema form, the inverse of [`IndexDefinition::from_json`].
    pub fn to_json(&self) -> JsonValue {
        let properties: Vec<JsonValue> = self
            .properties
            .iter()
            .map(|p| {
                let direction = if p.ascending { "asc" } else { "desc" };
                let mut entry = serde_json::Map::new();
                entry.insert(p.name.clone(), JsonValue::from(direction));
                JsonValue::Object(entry)
            })
            .collect();
        serde_json::json!({
            "name": self.name,
            "properties": properties,
            "unique": self.unique,
        })
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.name.as_str())
    }

    /// Stable fingerprint of the property list, ignoring the name.
    pub fn fingerprint(&self) -> String {
        self.properties
            .iter()
            .map(|p| format!("{}:{}", p.name, if p.ascending { "asc" } else { "desc" }))
            .collect::<Vec<_>>()
            .join(",")
    }
}
