//! [`SchemaValidator`] backed by the `jsonschema` crate (draft 2020-12).
//!
//! Compiled validators are cached by the schema's JSON text.

use crate::domain::ValidationResult;
use crate::errors::{BasicError, ConsensusError};
use crate::ports::SchemaValidator;
use jsonschema::error::ValidationErrorKind;
use jsonschema::Validator;
use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct JsonSchemaValidator {
    cache: RwLock<HashMap<String, Arc<Validator>>>,
}

impl JsonSchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached compiled schemas.
    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }

    fn compiled(&self, schema: &JsonValue) -> Result<Arc<Validator>, BasicError> {
        let key = schema.to_string();
        if let Some(validator) = self.cache.read().get(&key) {
            return Ok(Arc::clone(validator));
        }

        let validator = jsonschema::options()
            .with_draft(jsonschema::Draft::Draft202012)
            .build(schema)
            .map_err(|e| BasicError::JsonSchemaCompilation {
                message: e.to_string(),
            })?;
        let validator = Arc::new(validator);
        self.cache.write().insert(key, Arc::clone(&validator));
        Ok(validator)
    }
}

impl std::fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchemaValidator")
            .field("cached", &self.cached())
            .finish()
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, schema: &JsonValue, instance: &JsonValue) -> ValidationResult {
        let validator = match self.compiled(schema) {
            Ok(validator) => validator,
            Err(error) => return ValidationResult::invalid(error),
        };

        let errors = validator
            .iter_errors(instance)
            .map(|error| {
                let schema_path = error.schema_path.to_string();
                let keyword = schema_path
                    .rsplit('/')
                    .next()
                    .unwrap_or_default()
                    .to_string();
                let property_name = match &error.kind {
                    ValidationErrorKind::Required { property } => property
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| property.to_string()),
                    ValidationErrorKind::AdditionalProperties { unexpected } => {
                        unexpected.first().cloned().unwrap_or_default()
                    }
                    _ => String::new(),
                };
                ConsensusError::from(BasicError::JsonSchema {
                    keyword,
                    instance_path: error.instance_path.to_string(),
                    schema_path,
                    property_name,
                    message: error.to_string(),
                })
            })
            .collect();

        ValidationResult::new_with_errors(errors)
    }

    fn compile(&self, schema: &JsonValue) -> ValidationResult {
        match self.compiled(schema) {
            Ok(_) => ValidationResult::valid(),
            Err(error) => ValidationResult::invalid(error),
        }
    }
}
