//! Fixed JSON schemas of the state-transition object forms.
//!
//! Byte fields appear as arrays of integers, identifiers as 32 of them.
//! The schemas describe [`StateTransition::to_object`](crate::domain::StateTransition::to_object).

use crate::domain::StateTransitionType;
use serde_json::{json, Value as JsonValue};
use shared_types::data_contract::DATA_CONTRACT_META_SCHEMA;
use shared_types::identity::MAX_KEY_ID;

/// Most document transitions a single batch may carry.
pub const MAX_DOCUMENT_TRANSITIONS: usize = 10;

/// Most public keys a single identity transition may add.
pub const MAX_PUBLIC_KEYS_IN_TRANSITION: usize = 10;

fn byte_array(min: usize, max: usize) -> JsonValue {
    json!({
        "type": "array",
        "items": { "type": "integer", "minimum": 0, "maximum": 255 },
        "minItems": min,
        "maxItems": max
    })
}

fn identifier() -> JsonValue {
    byte_array(32, 32)
}

fn unsigned() -> JsonValue {
    json!({ "type": "integer", "minimum": 0 })
}

fn key_id() -> JsonValue {
    json!({ "type": "integer", "minimum": 0, "maximum": MAX_KEY_ID })
}

fn nullable(schema: JsonValue) -> JsonValue {
    json!({ "anyOf": [{ "type": "null" }, schema] })
}

/// Signature by an identity key: compact ECDSA (65) or BLS (96).
fn identity_signature() -> JsonValue {
    byte_array(65, 96)
}

fn type_tag(transition_type: StateTransitionType) -> JsonValue {
    json!({ "const": transition_type.code() })
}

fn data_contract() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "$id": identifier(),
            "$schema": { "const": DATA_CONTRACT_META_SCHEMA },
            "ownerId": identifier(),
            "protocolVersion": unsigned(),
            "version": { "type": "integer", "minimum": 1 },
            "documents": { "type": "object", "minProperties": 1 },
            "$defs": { "type": "object" },
            "entropy": nullable(byte_array(32, 32)),
            "metadata": nullable(json!({ "type": "object" }))
        },
        "required": ["$id", "$schema", "ownerId", "protocolVersion", "version", "documents"],
        "additionalProperties": false
    })
}

pub(crate) fn identity_public_key_in_creation() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "id": key_id(),
            "type": { "enum": ["ECDSA_SECP256K1", "BLS12_381", "ECDSA_HASH160", "BIP13_SCRIPT_HASH"] },
            "purpose": { "enum": ["AUTHENTICATION", "ENCRYPTION", "DECRYPTION", "WITHDRAW"] },
            "securityLevel": { "enum": ["MASTER", "CRITICAL", "HIGH", "MEDIUM"] },
            "data": byte_array(20, 48),
            "readOnly": { "type": "boolean" },
            "signature": byte_array(0, 96)
        },
        "required": ["id", "type", "purpose", "securityLevel", "data", "readOnly", "signature"],
        "additionalProperties": false
    })
}

fn out_point() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "txid": byte_array(32, 32),
            "vout": unsigned()
        },
        "required": ["txid", "vout"]
    })
}

fn asset_lock_proof() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "instant": {
                "type": "object",
                "properties": {
                    "instantLock": {
                        "type": "object",
                        "properties": {
                            "txid": byte_array(32, 32),
                            "cycleHash": byte_array(32, 32),
                            "signature": byte_array(96, 96)
                        },
                        "required": ["version", "inputs", "txid", "cycleHash", "signature"]
                    },
                    "transaction": {
                        "type": "object",
                        "properties": {
                            "outputs": { "type": "array", "minItems": 1 }
                        },
                        "required": ["version", "txType", "inputs", "outputs", "lockTime"]
                    },
                    "outputIndex": unsigned()
                },
                "required": ["instantLock", "transaction", "outputIndex"]
            },
            "chain": {
                "type": "object",
                "properties": {
                    "coreChainLockedHeight": { "type": "integer", "minimum": 1 },
                    "outPoint": out_point()
                },
                "required": ["coreChainLockedHeight", "outPoint"]
            }
        },
        "minProperties": 1,
        "maxProperties": 1
    })
}

fn document_base() -> [(&'static str, JsonValue); 3] {
    [
        ("$id", identifier()),
        ("$type", json!({ "type": "string", "minLength": 1, "maxLength": 64 })),
        ("$dataContractId", identifier()),
    ]
}

fn document_transition() -> JsonValue {
    let base = JsonValue::Object(
        document_base()
            .into_iter()
            .map(|(name, schema)| (name.to_string(), schema))
            .collect(),
    );
    let base = json!({
        "type": "object",
        "properties": base,
        "required": ["$id", "$type", "$dataContractId"],
        "additionalProperties": false
    });
    let timestamp = nullable(unsigned());

    json!({
        "type": "object",
        "properties": {
            "create": {
                "type": "object",
                "properties": {
                    "base": base,
                    "$entropy": byte_array(32, 32),
                    "$createdAt": timestamp,
                    "$updatedAt": timestamp,
                    "data": { "type": "object" }
                },
                "required": ["base", "$entropy", "data"],
                "additionalProperties": false
            },
            "replace": {
                "type": "object",
                "properties": {
                    "base": base,
                    "$revision": { "type": "integer", "minimum": 1 },
                    "$updatedAt": timestamp,
                    "data": { "type": "object" }
                },
                "required": ["base", "$revision", "data"],
                "additionalProperties": false
            },
            "delete": {
                "type": "object",
                "properties": { "base": base },
                "required": ["base"],
                "additionalProperties": false
            }
        },
        "minProperties": 1,
        "maxProperties": 1
    })
}

/// Schema of the object form of `transition_type`.
pub fn state_transition_schema(transition_type: StateTransitionType) -> JsonValue {
    let tag = type_tag(transition_type);
    match transition_type {
        StateTransitionType::DataContractCreate => json!({
            "type": "object",
            "properties": {
                "type": tag,
                "protocolVersion": unsigned(),
                "dataContract": data_contract(),
                "entropy": byte_array(32, 32),
                "signaturePublicKeyId": key_id(),
                "signature": identity_signature()
            },
            "required": ["type", "protocolVersion", "dataContract", "entropy", "signaturePublicKeyId", "signature"],
            "additionalProperties": false
        }),
        StateTransitionType::DataContractUpdate => json!({
            "type": "object",
            "properties": {
                "type": tag,
                "protocolVersion": unsigned(),
                "dataContract": data_contract(),
                "signaturePublicKeyId": key_id(),
                "signature": identity_signature()
            },
            "required": ["type", "protocolVersion", "dataContract", "signaturePublicKeyId", "signature"],
            "additionalProperties": false
        }),
        StateTransitionType::DocumentsBatch => json!({
            "type": "object",
            "properties": {
                "type": tag,
                "protocolVersion": unsigned(),
                "ownerId": identifier(),
                "transitions": {
                    "type": "array",
                    "items": document_transition(),
                    "minItems": 1,
                    "maxItems": MAX_DOCUMENT_TRANSITIONS
                },
                "signaturePublicKeyId": key_id(),
                "signature": identity_signature()
            },
            "required": ["type", "protocolVersion", "ownerId", "transitions", "signaturePublicKeyId", "signature"],
            "additionalProperties": false
        }),
        StateTransitionType::IdentityCreate => json!({
            "type": "object",
            "properties": {
                "type": tag,
                "protocolVersion": unsigned(),
                "assetLockProof": asset_lock_proof(),
                "publicKeys": {
                    "type": "array",
                    "items": identity_public_key_in_creation(),
                    "minItems": 1,
                    "maxItems": MAX_PUBLIC_KEYS_IN_TRANSITION
                },
                "identityId": identifier(),
                "signature": byte_array(65, 65)
            },
            "required": ["type", "protocolVersion", "assetLockProof", "publicKeys", "identityId", "signature"],
            "additionalProperties": false
        }),
        StateTransitionType::IdentityTopUp => json!({
            "type": "object",
            "properties": {
                "type": tag,
                "protocolVersion": unsigned(),
                "assetLockProof": asset_lock_proof(),
                "identityId": identifier(),
                "signature": byte_array(65, 65)
            },
            "required": ["type", "protocolVersion", "assetLockProof", "identityId", "signature"],
            "additionalProperties": false
        }),
        StateTransitionType::IdentityUpdate => json!({
            "type": "object",
            "properties": {
                "type": tag,
                "protocolVersion": unsigned(),
                "identityId": identifier(),
                "revision": { "type": "integer", "minimum": 1 },
                "addPublicKeys": {
                    "type": "array",
                    "items": identity_public_key_in_creation(),
                    "maxItems": MAX_PUBLIC_KEYS_IN_TRANSITION
                },
                "disablePublicKeys": {
                    "type": "array",
                    "items": key_id(),
                    "maxItems": MAX_PUBLIC_KEYS_IN_TRANSITION
                },
                "publicKeysDisabledAt": nullable(unsigned()),
                "signaturePublicKeyId": key_id(),
                "signature": identity_signature()
            },
            "required": [
                "type", "protocolVersion", "identityId", "revision", "addPublicKeys",
                "disablePublicKeys", "signaturePublicKeyId", "signature"
            ],
            "additionalProperties": false
        }),
    }
}
