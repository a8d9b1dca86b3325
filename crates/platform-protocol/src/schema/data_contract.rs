//! Structural validation of data contracts.
//!
//! Runs in order, stopping after the first group that fails:
//! meta-schema, nesting depth with local `$ref`s resolved, `$ref` and pattern
//! checks, per-type schema compilation, then index definitions.

use crate::config::ProtocolConfig;
use crate::domain::ValidationResult;
use crate::errors::BasicError;
use crate::ports::SchemaValidator;
use regex::Regex;
use serde_json::{json, Value as JsonValue};
use shared_types::data_contract::{
    required_fields, ALLOWED_INDEX_SYSTEM_PROPERTIES, DATA_CONTRACT_META_SCHEMA,
    NOT_ALLOWED_SYSTEM_PROPERTIES,
};
use shared_types::{DataContract, IndexDefinition};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Longest `maxLength` an indexed string may declare.
pub const MAX_INDEXED_STRING_PROPERTY_LENGTH: u64 = 63;

/// Longest `maxItems` an indexed byte array may declare.
pub const MAX_INDEXED_BYTE_ARRAY_PROPERTY_LENGTH: u64 = 255;

/// Most document types one contract may define.
pub const MAX_DOCUMENT_TYPES: usize = 100;

fn index_schema() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "name": { "type": "string", "minLength": 1, "maxLength": 32 },
            "properties": {
                "type": "array",
                "minItems": 1,
                "maxItems": 10,
                "items": {
                    "type": "object",
                    "minProperties": 1,
                    "maxProperties": 1,
                    "additionalProperties": { "enum": ["asc", "desc"] }
                }
            },
            "unique": { "type": "boolean" }
        },
        "required": ["name", "properties"],
        "additionalProperties": false
    })
}

/// Shape every data contract object must have.
pub fn data_contract_meta_schema() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "$id": { "type": "array", "minItems": 32, "maxItems": 32 },
            "$schema": { "const": DATA_CONTRACT_META_SCHEMA },
            "ownerId": { "type": "array", "minItems": 32, "maxItems": 32 },
            "protocolVersion": { "type": "integer", "minimum": 0 },
            "version": { "type": "integer", "minimum": 1 },
            "documents": {
                "type": "object",
                "minProperties": 1,
                "maxProperties": MAX_DOCUMENT_TYPES,
                "propertyNames": { "pattern": "^[a-zA-Z0-9-_]{1,64}$" },
                "additionalProperties": {
                    "type": "object",
                    "properties": {
                        "type": { "const": "object" },
                        "properties": {
                            "type": "object",
                            "minProperties": 1,
                            "propertyNames": { "pattern": "^[a-zA-Z0-9-_]{1,64}$" }
                        },
                        "additionalProperties": { "const": false },
                        "indices": { "type": "array", "maxItems": 10, "items": index_schema() },
                        "signatureSecurityLevelRequirement": {
                            "enum": ["MASTER", "CRITICAL", "HIGH", "MEDIUM"]
                        }
                    },
                    "required": ["type", "properties", "additionalProperties"]
                }
            },
            "$defs": {
                "type": "object",
                "propertyNames": { "pattern": "^[a-zA-Z0-9-_]{1,64}$" }
            }
        },
        "required": ["$id", "$schema", "ownerId", "protocolVersion", "version", "documents"]
    })
}

/// Document schema of `document_type` with the contract's `$defs` embedded,
/// ready to validate document data.
pub fn document_validation_schema(contract: &DataContract, document_type: &str) -> Option<JsonValue> {
    let mut schema = contract.documents.get(document_type)?.clone();
    if let JsonValue::Object(map) = &mut schema {
        map.remove("indices");
        map.remove("signatureSecurityLevelRequirement");
        if !contract.defs.is_empty() {
            let defs = contract
                .defs
                .iter()
                .map(|(name, def)| (name.clone(), def.clone()))
                .collect();
            map.insert("$defs".to_string(), JsonValue::Object(defs));
        }
    }
    Some(schema)
}

/// Nesting depth of objects and arrays. A scalar has depth 0.
pub fn schema_depth(value: &JsonValue) -> usize {
    match value {
        JsonValue::Object(map) => 1 + map.values().map(schema_depth).max().unwrap_or(0),
        JsonValue::Array(items) => 1 + items.iter().map(schema_depth).max().unwrap_or(0),
        _ => 0,
    }
}

/// Depth of contract schemas with local `$ref`s replaced by their
/// definitions. A reference back into a definition still being resolved is
/// a circular pointer.
struct RefResolver<'a> {
    defs: &'a BTreeMap<String, JsonValue>,
    visiting: Vec<&'a str>,
    resolved: HashMap<&'a str, usize>,
}

impl<'a> RefResolver<'a> {
    fn new(defs: &'a BTreeMap<String, JsonValue>) -> Self {
        Self {
            defs,
            visiting: Vec::new(),
            resolved: HashMap::new(),
        }
    }

    fn depth(&mut self, value: &'a JsonValue, path: &str) -> Result<usize, BasicError> {
        match value {
            JsonValue::Object(map) => {
                let mut children = 0;
                for (key, child) in map.iter().filter(|(key, _)| key.as_str() != "$ref") {
                    children = children.max(self.depth(child, &format!("{path}/{key}"))?);
                }
                let own = 1 + children;

                let target = map
                    .get("$ref")
                    .and_then(JsonValue::as_str)
                    .and_then(|r| r.strip_prefix("#/$defs/"));
                match target {
                    // siblings stay next to the dereferenced definition
                    Some(name) if map.len() > 1 => Ok(own.max(self.definition_depth(name, path)?)),
                    Some(name) => self.definition_depth(name, path),
                    None => Ok(own),
                }
            }
            JsonValue::Array(items) => {
                let mut children = 0;
                for (i, child) in items.iter().enumerate() {
                    children = children.max(self.depth(child, &format!("{path}/{i}"))?);
                }
                Ok(1 + children)
            }
            _ => Ok(0),
        }
    }

    fn definition_depth(&mut self, name: &'a str, path: &str) -> Result<usize, BasicError> {
        if self.visiting.contains(&name) {
            return Err(BasicError::InvalidJsonSchemaRef {
                message: format!("Circular $ref pointer found at {path}: #/$defs/{name}"),
            });
        }
        if let Some(depth) = self.resolved.get(name) {
            return Ok(*depth);
        }
        // unknown definitions are reported by the $ref check
        let Some((name, definition)) = self.defs.get_key_value(name) else {
            return Ok(1);
        };

        self.visiting.push(name);
        let depth = self.depth(definition, &format!("/$defs/{name}"));
        self.visiting.pop();
        let depth = depth?;
        self.resolved.insert(name, depth);
        Ok(depth)
    }

    /// Deepest resolved schema of the contract.
    fn contract_depth(&mut self, contract: &'a DataContract) -> Result<usize, BasicError> {
        let mut depth = 0;
        for (name, schema) in &contract.documents {
            depth = depth.max(self.depth(schema, &format!("/documents/{name}"))?);
        }
        for name in contract.defs.keys() {
            depth = depth.max(self.definition_depth(name, "/$defs")?);
        }
        Ok(depth)
    }
}

fn walk<'a>(value: &'a JsonValue, path: String, visit: &mut impl FnMut(&str, &'a JsonValue)) {
    visit(&path, value);
    match value {
        JsonValue::Object(map) => {
            for (key, child) in map {
                walk(child, format!("{path}/{key}"), visit);
            }
        }
        JsonValue::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                walk(child, format!("{path}/{i}"), visit);
            }
        }
        _ => {}
    }
}

/// Every `$ref` and `pattern` keyword of the contract's schemas.
fn validate_refs_and_patterns(contract: &DataContract) -> ValidationResult {
    let mut result = ValidationResult::valid();

    let roots = contract
        .documents
        .iter()
        .map(|(name, schema)| (format!("/documents/{name}"), schema))
        .chain(
            contract
                .defs
                .iter()
                .map(|(name, schema)| (format!("/$defs/{name}"), schema)),
        );

    for (root, schema) in roots {
        walk(schema, root, &mut |path, value| {
            let JsonValue::Object(map) = value else {
                return;
            };
            if let Some(reference) = map.get("$ref") {
                let target = reference
                    .as_str()
                    .and_then(|r| r.strip_prefix("#/$defs/"));
                match target {
                    Some(name) if contract.defs.contains_key(name) => {}
                    Some(name) => result.add_error(BasicError::InvalidJsonSchemaRef {
                        message: format!("{path}: definition \"{name}\" is not defined"),
                    }),
                    None => result.add_error(BasicError::InvalidJsonSchemaRef {
                        message: format!("{path}: only local #/$defs/ references are allowed"),
                    }),
                }
            }
            if let Some(JsonValue::String(pattern)) = map.get("pattern") {
                if let Err(e) = Regex::new(pattern) {
                    result.add_error(BasicError::IncompatibleRe2Pattern {
                        pattern: pattern.clone(),
                        path: format!("{path}/pattern"),
                        message: e.to_string(),
                    });
                }
            }
        });
    }

    result
}

fn property_type(definition: &JsonValue) -> Option<&str> {
    definition.get("type").and_then(JsonValue::as_str)
}

fn max_constraint(definition: &JsonValue, keyword: &str) -> Option<u64> {
    definition.get(keyword).and_then(JsonValue::as_u64)
}

/// Index rules of one document type.
fn validate_indices(
    contract: &DataContract,
    document_type: &str,
    unique_index_limit: usize,
) -> ValidationResult {
    let mut result = ValidationResult::valid();
    let Some(schema) = contract.documents.get(document_type) else {
        return result;
    };
    let raw_indices = match schema.get("indices").and_then(JsonValue::as_array) {
        Some(indices) => indices,
        None => return result,
    };

    let mut indices = Vec::with_capacity(raw_indices.len());
    for raw in raw_indices {
        // shape already enforced by the meta-schema
        if let Ok(index) = IndexDefinition::from_json(raw) {
            indices.push(index);
        }
    }

    let required: HashSet<String> = required_fields(schema).into_iter().collect();
    let mut names = HashSet::new();
    let mut fingerprints = HashSet::new();
    let mut unique_count = 0usize;

    for index in &indices {
        if !names.insert(index.name.as_str()) {
            result.add_error(BasicError::DuplicateIndexName {
                document_type: document_type.to_string(),
                index_name: index.name.clone(),
            });
        }

        if index.unique {
            unique_count += 1;
            if unique_count == unique_index_limit + 1 {
                result.add_error(BasicError::UniqueIndicesLimitReached {
                    document_type: document_type.to_string(),
                    limit: unique_index_limit,
                });
            }
        }

        for property_name in index.property_names() {
            if NOT_ALLOWED_SYSTEM_PROPERTIES.contains(&property_name) {
                result.add_error(BasicError::SystemPropertyIndexAlreadyPresent {
                    document_type: document_type.to_string(),
                    index_name: index.name.clone(),
                    property_name: property_name.to_string(),
                });
                continue;
            }
            if ALLOWED_INDEX_SYSTEM_PROPERTIES.contains(&property_name) {
                continue;
            }

            let Some(definition) = contract.property_definition(document_type, property_name)
            else {
                result.add_error(BasicError::UndefinedIndexProperty {
                    document_type: document_type.to_string(),
                    index_name: index.name.clone(),
                    property_name: property_name.to_string(),
                });
                continue;
            };

            validate_indexed_property(&mut result, document_type, index, property_name, definition);
        }

        if index.unique && index.properties.len() > 1 {
            let user_properties: Vec<&str> = index
                .property_names()
                .filter(|name| !name.starts_with('$'))
                .collect();
            let required_count = user_properties
                .iter()
                .filter(|name| required.contains(**name))
                .count();
            if required_count != 0 && required_count != user_properties.len() {
                result.add_error(BasicError::InvalidCompoundIndex {
                    document_type: document_type.to_string(),
                    index_name: index.name.clone(),
                });
            }
        }

        if !fingerprints.insert(index.fingerprint()) {
            result.add_error(BasicError::DuplicateIndex {
                document_type: document_type.to_string(),
                index_name: index.name.clone(),
            });
        }
    }

    result
}

fn validate_indexed_property(
    result: &mut ValidationResult,
    document_type: &str,
    index: &IndexDefinition,
    property_name: &str,
    definition: &JsonValue,
) {
    let invalid_type = |property_type: &str| BasicError::InvalidIndexPropertyType {
        document_type: document_type.to_string(),
        index_name: index.name.clone(),
        property_name: property_name.to_string(),
        property_type: property_type.to_string(),
    };
    let invalid_constraint = |constraint_name: &str, reason: String| {
        BasicError::InvalidIndexedPropertyConstraint {
            document_type: document_type.to_string(),
            index_name: index.name.clone(),
            property_name: property_name.to_string(),
            constraint_name: constraint_name.to_string(),
            reason,
        }
    };

    match property_type(definition) {
        Some("object") => result.add_error(invalid_type("object")),
        Some("array") => {
            let is_byte_array = definition
                .get("byteArray")
                .and_then(JsonValue::as_bool)
                .unwrap_or(false);
            if !is_byte_array {
                result.add_error(invalid_type("array"));
                return;
            }
            match max_constraint(definition, "maxItems") {
                None => result.add_error(invalid_constraint(
                    "maxItems",
                    "should be less or equal 255".to_string(),
                )),
                Some(max) if max > MAX_INDEXED_BYTE_ARRAY_PROPERTY_LENGTH => result.add_error(
                    invalid_constraint("maxItems", "should be less or equal 255".to_string()),
                ),
                Some(_) => {}
            }
        }
        Some("string") => match max_constraint(definition, "maxLength") {
            None => result.add_error(invalid_constraint(
                "maxLength",
                "should be less or equal 63".to_string(),
            )),
            Some(max) if max > MAX_INDEXED_STRING_PROPERTY_LENGTH => result.add_error(
                invalid_constraint("maxLength", "should be less or equal 63".to_string()),
            ),
            Some(_) => {}
        },
        _ => {}
    }
}

/// Full structural validation of a contract.
pub fn validate_data_contract(
    contract: &DataContract,
    schema_validator: &dyn SchemaValidator,
    config: &ProtocolConfig,
) -> ValidationResult {
    let object = match contract.to_object() {
        Ok(object) => object,
        Err(e) => {
            return ValidationResult::invalid(BasicError::SerializedObjectParsing {
                message: e.to_string(),
            })
        }
    };

    let meta = schema_validator.validate(&data_contract_meta_schema(), &object);
    if !meta.is_valid() {
        return meta;
    }

    let depth = match RefResolver::new(&contract.defs).contract_depth(contract) {
        Ok(depth) => depth,
        Err(error) => return ValidationResult::invalid(error),
    };
    if depth > config.max_data_contract_depth {
        return ValidationResult::invalid(BasicError::DataContractMaxDepthExceeded {
            depth,
            max: config.max_data_contract_depth,
        });
    }

    let refs = validate_refs_and_patterns(contract);
    if !refs.is_valid() {
        return refs;
    }

    let mut result = ValidationResult::valid();
    for document_type in contract.documents.keys() {
        if let Some(schema) = document_validation_schema(contract, document_type) {
            result.merge(schema_validator.compile(&schema));
        }
    }
    if !result.is_valid() {
        return result;
    }

    for document_type in contract.documents.keys() {
        result.merge(validate_indices(
            contract,
            document_type,
            config.unique_index_limit,
        ));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::JsonSchemaValidator;
    use shared_types::Identifier;
    use std::collections::BTreeMap;

    fn contract_with(document: JsonValue) -> DataContract {
        DataContract::new(
            Identifier::new([1; 32]),
            [3; 32],
            1,
            BTreeMap::from([("profile".to_string(), document)]),
            BTreeMap::new(),
        )
    }

    fn profile(indices: JsonValue) -> JsonValue {
        json!({
            "type": "object",
            "properties": {
                "username": { "type": "string", "maxLength": 32 },
                "bio": { "type": "string" },
                "avatar": { "type": "array", "byteArray": true, "maxItems": 32 },
                "tags": { "type": "array", "items": { "type": "string" } },
                "address": { "type": "object", "properties": { "city": { "type": "string" } } }
            },
            "required": ["username"],
            "indices": indices,
            "additionalProperties": false
        })
    }

    fn codes(contract: &DataContract) -> Vec<u32> {
        validate_data_contract(contract, &JsonSchemaValidator::new(), &ProtocolConfig::default())
            .error_codes()
    }

    #[test]
    fn test_valid_contract() {
        let contract = contract_with(profile(json!([
            { "name": "byUsername", "properties": [{ "username": "asc" }], "unique": true },
            { "name": "byOwner", "properties": [{ "$ownerId": "asc" }, { "avatar": "desc" }] }
        ])));
        assert!(codes(&contract).is_empty());
    }

    #[test]
    fn test_meta_schema_requires_closed_documents() {
        let contract = contract_with(json!({
            "type": "object",
            "properties": { "name": { "type": "string" } }
        }));
        assert_eq!(codes(&contract), vec![1005]);
    }

    #[test]
    fn test_depth_limit() {
        let contract = contract_with(profile(json!([])));
        let config = ProtocolConfig {
            max_data_contract_depth: 2,
            ..ProtocolConfig::default()
        };
        let result = validate_data_contract(&contract, &JsonSchemaValidator::new(), &config);
        assert_eq!(result.error_codes(), vec![1007]);
    }

    #[test]
    fn test_ref_must_resolve_locally() {
        let contract = contract_with(json!({
            "type": "object",
            "properties": {
                "a": { "$ref": "#/$defs/missing" },
                "b": { "$ref": "https://example.com/schema" }
            },
            "additionalProperties": false
        }));
        assert_eq!(codes(&contract), vec![1014, 1014]);
    }

    fn with_object_ref(object: JsonValue) -> DataContract {
        let mut contract = contract_with(json!({
            "type": "object",
            "properties": { "obj": { "$ref": "#/$defs/object" } },
            "additionalProperties": false
        }));
        contract.defs.insert("object".to_string(), object);
        contract
    }

    #[test]
    fn test_circular_ref_rejected() {
        let contract = with_object_ref(json!({ "$ref": "#/$defs/object" }));
        let result =
            validate_data_contract(&contract, &JsonSchemaValidator::new(), &ProtocolConfig::default());
        assert_eq!(result.error_codes(), vec![1014]);
        assert!(result.errors()[0].to_string().contains("Circular $ref pointer found"));

        let mut indirect = with_object_ref(json!({
            "type": "object",
            "properties": { "next": { "$ref": "#/$defs/link" } }
        }));
        indirect.defs.insert(
            "link".to_string(),
            json!({ "type": "array", "items": { "$ref": "#/$defs/object" } }),
        );
        assert_eq!(codes(&indirect), vec![1014]);
    }

    #[test]
    fn test_depth_counts_through_refs() {
        let deep = json!({
            "type": "object",
            "properties": { "a": { "type": "object", "properties": { "b": { "type": "string" } } } }
        });
        let contract = with_object_ref(deep.clone());
        let document_depth = schema_depth(&contract.documents["profile"]);
        let def_depth = schema_depth(&deep);
        assert_eq!((document_depth, def_depth), (3, 5));

        let config = ProtocolConfig {
            max_data_contract_depth: 6,
            ..ProtocolConfig::default()
        };
        let result = validate_data_contract(&contract, &JsonSchemaValidator::new(), &config);
        assert_eq!(result.error_codes(), vec![1007]);

        let config = ProtocolConfig {
            max_data_contract_depth: 7,
            ..ProtocolConfig::default()
        };
        let result = validate_data_contract(&contract, &JsonSchemaValidator::new(), &config);
        assert!(result.is_valid(), "{:?}", result.errors());
    }

    #[test]
    fn test_decoded_contract_exceeds_depth_through_refs() {
        let links = 300;
        let mut contract = with_object_ref(json!({ "$ref": "#/$defs/link0" }));
        for i in 0..links {
            contract.defs.insert(
                format!("link{i}"),
                json!({
                    "type": "object",
                    "properties": { "next": { "$ref": format!("#/$defs/link{}", i + 1) } }
                }),
            );
        }
        contract
            .defs
            .insert(format!("link{links}"), json!({ "type": "string" }));

        let buffer = crate::codec::encode_protocol_entity(&contract, 1).unwrap();
        let (_, decoded): (u32, DataContract) =
            crate::codec::decode_protocol_entity(&buffer).unwrap();
        assert!(decoded.defs.values().all(|def| schema_depth(def) < 128));
        assert_eq!(codes(&decoded), vec![1007]);
    }

    #[test]
    fn test_shared_definition_is_not_circular() {
        let mut contract = contract_with(json!({
            "type": "object",
            "properties": {
                "home": { "$ref": "#/$defs/address" },
                "work": { "$ref": "#/$defs/address" }
            },
            "additionalProperties": false
        }));
        contract.defs.insert(
            "address".to_string(),
            json!({ "type": "object", "properties": { "city": { "type": "string" } } }),
        );
        assert!(codes(&contract).is_empty());
    }

    #[test]
    fn test_lookahead_pattern_rejected() {
        let contract = contract_with(json!({
            "type": "object",
            "properties": { "a": { "type": "string", "pattern": "^(?=a)" } },
            "additionalProperties": false
        }));
        assert_eq!(codes(&contract), vec![1009]);
    }

    #[test]
    fn test_index_rules() {
        let contract = contract_with(profile(json!([
            { "name": "one", "properties": [{ "bio": "asc" }] },
            { "name": "one", "properties": [{ "tags": "asc" }] },
            { "name": "three", "properties": [{ "address": "asc" }] },
            { "name": "four", "properties": [{ "$id": "asc" }] },
            { "name": "five", "properties": [{ "missing": "asc" }] }
        ])));
        assert_eq!(codes(&contract), vec![1012, 1048, 1013, 1013, 1015, 1016]);
    }

    #[test]
    fn test_unique_limit_and_duplicates() {
        let contract = contract_with(profile(json!([
            { "name": "a", "properties": [{ "username": "asc" }], "unique": true },
            { "name": "b", "properties": [{ "username": "desc" }], "unique": true },
            { "name": "c", "properties": [{ "avatar": "asc" }], "unique": true },
            { "name": "d", "properties": [{ "username": "asc" }], "unique": true }
        ])));
        assert_eq!(codes(&contract), vec![1017, 1008]);
    }

    #[test]
    fn test_compound_index_mixing_required() {
        let contract = contract_with(profile(json!([
            {
                "name": "mixed",
                "properties": [{ "username": "asc" }, { "avatar": "asc" }],
                "unique": true
            }
        ])));
        assert_eq!(codes(&contract), vec![1010]);
    }

    #[test]
    fn test_document_schema_embeds_defs() {
        let mut contract = contract_with(json!({
            "type": "object",
            "properties": { "label": { "$ref": "#/$defs/label" } },
            "additionalProperties": false
        }));
        contract
            .defs
            .insert("label".to_string(), json!({ "type": "string", "maxLength": 10 }));

        assert!(codes(&contract).is_empty());
        let schema = document_validation_schema(&contract, "profile").unwrap();
        let validator = JsonSchemaValidator::new();
        assert!(validator.validate(&schema, &json!({"label": "ok"})).is_valid());
        assert!(!validator.validate(&schema, &json!({"label": 7})).is_valid());
    }
}
