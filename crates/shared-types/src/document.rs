//! # Documents
//!
//! Schema-validated records owned by an identity and governed by a data
//! contract. System properties are `$`-prefixed; everything else lives in
//! `data`.

use crate::data_contract::DataContract;
use crate::errors::EntityError;
use crate::identifier::Identifier;
use crate::{Revision, TimestampMillis};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Revision a document receives when created.
pub const INITIAL_REVISION: Revision = 1;

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "$id")]
    pub id: Identifier,
    #[serde(rename = "$ownerId")]
    pub owner_id: Identifier,
    #[serde(rename = "$revision")]
    pub revision: Revision,
    #[serde(rename = "$createdAt", default)]
    pub created_at: Option<TimestampMillis>,
    #[serde(rename = "$updatedAt", default)]
    pub updated_at: Option<TimestampMillis>,
    /// User-defined properties (a JSON object).
    #[serde(with = "crate::json_compat")]
    pub data: JsonValue,
}

impl Document {
    /// Value at a dotted path.
    ///
    /// System properties `$id`, `$ownerId`, `$createdAt`, `$updatedAt` and
    /// `$revision` resolve to their typed fields.
    pub fn get(&self, path: &str) -> Option<JsonValue> {
        match path {
            "$id" => Some(self.id.to_json()),
            "$ownerId" => Some(self.owner_id.to_json()),
            "$revision" => Some(JsonValue::from(self.revision)),
            "$createdAt" => self.created_at.map(JsonValue::from),
            "$updatedAt" => self.updated_at.map(JsonValue::from),
            _ => get_path(&self.data, path).cloned(),
        }
    }

    /// Identifier stored at a dotted path of `data`.
    pub fn get_identifier(&self, path: &str) -> Result<Identifier, EntityError> {
        let value = get_path(&self.data, path)
            .ok_or_else(|| EntityError::MissingProperty(path.to_string()))?;
        Identifier::from_json(value).map_err(|source| EntityError::InvalidIdentifier {
            property: path.to_string(),
            source,
        })
    }
}

/// A document together with the schema context it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedDocument {
    pub document: Document,
    #[serde(rename = "$type")]
    pub document_type_name: String,
    #[serde(rename = "$dataContractId")]
    pub data_contract_id: Identifier,
    pub data_contract: DataContract,
}

impl ExtendedDocument {
    pub fn new(document: Document, document_type_name: String, data_contract: DataContract) -> Self {
        Self {
            document,
            document_type_name,
            data_contract_id: data_contract.id,
            data_contract,
        }
    }

    pub fn id(&self) -> Identifier {
        self.document.id
    }

    pub fn document_type_schema(&self) -> Result<&JsonValue, EntityError> {
        self.data_contract.document_schema(&self.document_type_name)
    }
}

/// Value at a dotted path inside a JSON object.
pub fn get_path<'a>(value: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    path.split('.')
        .try_fold(value, |current, segment| current.get(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> Document {
        Document {
            id: Identifier::new([1; 32]),
            owner_id: Identifier::new([2; 32]),
            revision: INITIAL_REVISION,
            created_at: Some(1_000),
            updated_at: None,
            data: json!({
                "label": "alice",
                "records": { "dashUniqueIdentityId": Identifier::new([2; 32]).to_base58() }
            }),
        }
    }

    #[test]
    fn test_get_system_and_nested_properties() {
        let doc = document();
        assert_eq!(doc.get("$ownerId"), Some(doc.owner_id.to_json()));
        assert_eq!(doc.get("$createdAt"), Some(json!(1_000)));
        assert_eq!(doc.get("$updatedAt"), None);
        assert_eq!(doc.get("label"), Some(json!("alice")));
        assert!(doc.get("records.missing").is_none());
    }

    #[test]
    fn test_get_identifier() {
        let doc = document();
        assert_eq!(
            doc.get_identifier("records.dashUniqueIdentityId").unwrap(),
            doc.owner_id
        );
        assert_eq!(
            doc.get_identifier("records.other"),
            Err(EntityError::MissingProperty("records.other".to_string()))
        );
    }

    #[test]
    fn test_binary_roundtrip() {
        let doc = document();
        let bytes = bincode::serialize(&doc).unwrap();
        assert_eq!(bincode::deserialize::<Document>(&bytes).unwrap(), doc);
    }
}
