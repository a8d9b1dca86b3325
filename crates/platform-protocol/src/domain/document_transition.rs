//! # Document Transitions
//!
//! Create, replace and delete actions carried by a documents batch.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use shared_types::document::{get_path, INITIAL_REVISION};
use shared_types::{
    generate_document_id, DataContract, Document, Identifier, Revision, TimestampMillis,
};
use std::fmt;

/// What a document transition does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentTransitionAction {
    Create,
    Replace,
    Delete,
}

impl fmt::Display for DocumentTransitionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentTransitionAction::Create => "create",
            DocumentTransitionAction::Replace => "replace",
            DocumentTransitionAction::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Fields every document transition carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTransitionBase {
    #[serde(rename = "$id")]
    pub id: Identifier,
    #[serde(rename = "$type")]
    pub document_type: String,
    #[serde(rename = "$dataContractId")]
    pub data_contract_id: Identifier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentCreateTransition {
    pub base: DocumentTransitionBase,
    #[serde(rename = "$entropy")]
    pub entropy: [u8; 32],
    #[serde(rename = "$createdAt", default)]
    pub created_at: Option<TimestampMillis>,
    #[serde(rename = "$updatedAt", default)]
    pub updated_at: Option<TimestampMillis>,
    #[serde(with = "shared_types::json_compat")]
    pub data: JsonValue,
}

impl DocumentCreateTransition {
    /// Build a create transition with its id derived from `entropy`.
    pub fn new(
        data_contract: &DataContract,
        owner_id: &Identifier,
        document_type: &str,
        entropy: [u8; 32],
        data: JsonValue,
    ) -> Self {
        Self {
            base: DocumentTransitionBase {
                id: generate_document_id(&data_contract.id, owner_id, document_type, &entropy),
                document_type: document_type.to_string(),
                data_contract_id: data_contract.id,
            },
            entropy,
            created_at: None,
            updated_at: None,
            data,
        }
    }

    /// Id the transition must carry for `owner_id`.
    pub fn expected_id(&self, owner_id: &Identifier) -> Identifier {
        generate_document_id(
            &self.base.data_contract_id,
            owner_id,
            &self.base.document_type,
            &self.entropy,
        )
    }

    /// The document this transition creates.
    pub fn to_document(&self, owner_id: Identifier) -> Document {
        Document {
            id: self.base.id,
            owner_id,
            revision: INITIAL_REVISION,
            created_at: self.created_at,
            updated_at: self.updated_at,
            data: self.data.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentReplaceTransition {
    pub base: DocumentTransitionBase,
    #[serde(rename = "$revision")]
    pub revision: Revision,
    #[serde(rename = "$updatedAt", default)]
    pub updated_at: Option<TimestampMillis>,
    #[serde(with = "shared_types::json_compat")]
    pub data: JsonValue,
}

impl DocumentReplaceTransition {
    /// Replace `document` with `data`, bumping its revision.
    pub fn new(
        data_contract: &DataContract,
        document_type: &str,
        document: &Document,
        data: JsonValue,
    ) -> Self {
        Self {
            base: DocumentTransitionBase {
                id: document.id,
                document_type: document_type.to_string(),
                data_contract_id: data_contract.id,
            },
            revision: document.revision + 1,
            updated_at: None,
            data,
        }
    }

    /// `stored` with this transition's data, revision and update time.
    pub fn patch(&self, stored: &Document) -> Document {
        Document {
            id: stored.id,
            owner_id: stored.owner_id,
            revision: self.revision,
            created_at: stored.created_at,
            updated_at: self.updated_at.or(stored.updated_at),
            data: self.data.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDeleteTransition {
    pub base: DocumentTransitionBase,
}

/// One action of a documents batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentTransition {
    Create(DocumentCreateTransition),
    Replace(DocumentReplaceTransition),
    Delete(DocumentDeleteTransition),
}

impl DocumentTransition {
    pub fn base(&self) -> &DocumentTransitionBase {
        match self {
            DocumentTransition::Create(t) => &t.base,
            DocumentTransition::Replace(t) => &t.base,
            DocumentTransition::Delete(t) => &t.base,
        }
    }

    pub fn id(&self) -> Identifier {
        self.base().id
    }

    pub fn document_type(&self) -> &str {
        &self.base().document_type
    }

    pub fn data_contract_id(&self) -> Identifier {
        self.base().data_contract_id
    }

    pub fn action(&self) -> DocumentTransitionAction {
        match self {
            DocumentTransition::Create(_) => DocumentTransitionAction::Create,
            DocumentTransition::Replace(_) => DocumentTransitionAction::Replace,
            DocumentTransition::Delete(_) => DocumentTransitionAction::Delete,
        }
    }

    /// User data, absent on delete.
    pub fn data(&self) -> Option<&JsonValue> {
        match self {
            DocumentTransition::Create(t) => Some(&t.data),
            DocumentTransition::Replace(t) => Some(&t.data),
            DocumentTransition::Delete(_) => None,
        }
    }

    pub fn created_at(&self) -> Option<TimestampMillis> {
        match self {
            DocumentTransition::Create(t) => t.created_at,
            DocumentTransition::Replace(_) | DocumentTransition::Delete(_) => None,
        }
    }

    pub fn updated_at(&self) -> Option<TimestampMillis> {
        match self {
            DocumentTransition::Create(t) => t.updated_at,
            DocumentTransition::Replace(t) => t.updated_at,
            DocumentTransition::Delete(_) => None,
        }
    }

    /// Value at a dotted path, resolving system properties.
    ///
    /// `$ownerId` is not part of a transition and resolves to `owner_id`.
    pub fn get(&self, path: &str, owner_id: &Identifier) -> Option<JsonValue> {
        match path {
            "$id" => Some(self.id().to_json()),
            "$ownerId" => Some(owner_id.to_json()),
            "$createdAt" => self.created_at().map(JsonValue::from),
            "$updatedAt" => self.updated_at().map(JsonValue::from),
            _ => self.data().and_then(|data| get_path(data, path)).cloned(),
        }
    }
}
