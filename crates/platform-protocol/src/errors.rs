//! # Error Types
//!
//! Three tiers:
//!
//! | Tier | Type | Meaning |
//! |------|------|---------|
//! | Basic / consensus | [`ConsensusError`] | The transition is invalid. Deterministic, coded. |
//! | Non-consensus | [`ProtocolError`] | Validity could not be determined, or a precondition of this engine was violated. |
//! | Infrastructure | [`StateRepositoryError`] | The external store failed. Wrapped by [`ProtocolError`]. |
//!
//! Every consensus error has a stable numeric code:
//! basic 1000-1056, signature 2000-2007, fee 3000, state 4000-4023.

use serde::{Deserialize, Serialize};
use shared_types::{Credits, Identifier, KeyId, KeyType, Purpose, Revision, SecurityLevel};
use thiserror::Error;

/// `(document type, document id)` of a transition inside a batch.
pub type DocumentTransitionReference = (String, Identifier);

// =============================================================================
// CONSENSUS ERRORS
// =============================================================================

/// A coded, deterministic rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ConsensusError {
    #[error(transparent)]
    Basic(#[from] BasicError),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error(transparent)]
    Fee(#[from] FeeError),

    #[error(transparent)]
    State(#[from] StateError),
}

impl ConsensusError {
    /// Stable numeric code.
    pub fn code(&self) -> u32 {
        match self {
            ConsensusError::Basic(e) => e.code(),
            ConsensusError::Signature(e) => e.code(),
            ConsensusError::Fee(e) => e.code(),
            ConsensusError::State(e) => e.code(),
        }
    }
}

// =============================================================================
// BASIC (STRUCTURAL) ERRORS
// =============================================================================

/// Structural errors found without consulting signatures, balances or state.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum BasicError {
    #[error("Can't read protocol version from serialized object: {message}")]
    ProtocolVersionParsing { message: String },

    #[error("Parsing of serialized object failed due to: {message}")]
    SerializedObjectParsing { message: String },

    #[error("Protocol version {parsed} is not supported. Latest supported version is {latest}")]
    UnsupportedProtocolVersion { parsed: u32, latest: u32 },

    #[error("Protocol version {parsed} is not supported. Minimal supported protocol version is {minimal}")]
    IncompatibleProtocolVersion { parsed: u32, minimal: u32 },

    #[error("JSON Schema compilation error: {message}")]
    JsonSchemaCompilation { message: String },

    #[error("{message}")]
    JsonSchema {
        keyword: String,
        instance_path: String,
        schema_path: String,
        property_name: String,
        message: String,
    },

    #[error("Invalid {name}: {message}")]
    InvalidIdentifier { name: String, message: String },

    #[error("Data contract depth {depth} is greater than {max}")]
    DataContractMaxDepthExceeded { depth: usize, max: usize },

    #[error("Duplicate index definition for \"{index_name}\" index of \"{document_type}\" document")]
    DuplicateIndex {
        document_type: String,
        index_name: String,
    },

    #[error("Pattern {pattern} at {path} is not compatible with Re2: {message}")]
    IncompatibleRe2Pattern {
        pattern: String,
        path: String,
        message: String,
    },

    #[error("All or none of unique compound properties must be set for \"{index_name}\" index of \"{document_type}\" document")]
    InvalidCompoundIndex {
        document_type: String,
        index_name: String,
    },

    #[error("Data Contract ID must be {expected}, got {actual}")]
    InvalidDataContractId {
        expected: Identifier,
        actual: Identifier,
    },

    #[error("Indexed property \"{property_name}\" for \"{document_type}\" document has an invalid constraint \"{constraint_name}\", reason: \"{reason}\"")]
    InvalidIndexedPropertyConstraint {
        document_type: String,
        index_name: String,
        property_name: String,
        constraint_name: String,
        reason: String,
    },

    #[error("\"{property_name}\" property of \"{document_type}\" document has an invalid type \"{property_type}\" and cannot be used as an index")]
    InvalidIndexPropertyType {
        document_type: String,
        index_name: String,
        property_name: String,
        property_type: String,
    },

    #[error("Invalid JSON Schema $ref: {message}")]
    InvalidJsonSchemaRef { message: String },

    #[error("System property {property_name} is already indexed and can't be used in other indices for {document_type} document")]
    SystemPropertyIndexAlreadyPresent {
        document_type: String,
        index_name: String,
        property_name: String,
    },

    #[error("\"{property_name}\" property is not defined in \"{document_type}\" document")]
    UndefinedIndexProperty {
        document_type: String,
        index_name: String,
        property_name: String,
    },

    #[error("\"{document_type}\" document has more than {limit} unique indexes")]
    UniqueIndicesLimitReached { document_type: String, limit: usize },

    #[error("Data Contract {data_contract_id} is not present")]
    DataContractNotPresent { data_contract_id: Identifier },

    #[error("Document transitions with duplicate IDs {references:?}")]
    DuplicateDocumentTransitionsWithIds {
        references: Vec<DocumentTransitionReference>,
    },

    #[error("Document transitions with duplicate unique properties: {references:?}")]
    DuplicateDocumentTransitionsWithIndices {
        references: Vec<DocumentTransitionReference>,
    },

    #[error("Unique compound index properties {index_properties:?} are partially set for {document_type}")]
    InconsistentCompoundIndexData {
        document_type: String,
        index_properties: Vec<String>,
    },

    #[error("Invalid document transition id {actual}, expected {expected}")]
    InvalidDocumentTransitionId {
        expected: Identifier,
        actual: Identifier,
    },

    #[error("Data Contract {data_contract_id} doesn't define document with type {document_type}")]
    InvalidDocumentType {
        document_type: String,
        data_contract_id: Identifier,
    },

    #[error("Duplicated public keys {duplicated_public_key_ids:?} found")]
    DuplicatedIdentityPublicKey { duplicated_public_key_ids: Vec<KeyId> },

    #[error("Duplicated public key ids {duplicated_ids:?} found")]
    DuplicatedIdentityPublicKeyId { duplicated_ids: Vec<KeyId> },

    #[error("Asset lock does not match: {message}")]
    IdentityAssetLockProofLockedTransactionMismatch { message: String },

    #[error("Asset Lock transaction {txid} is not found")]
    IdentityAssetLockTransactionIsNotFound { txid: String },

    #[error("Asset lock transaction {txid} output {output_index} already used")]
    IdentityAssetLockTransactionOutPointAlreadyExists { txid: String, output_index: u32 },

    #[error("Asset Lock transaction output with index {output_index} not found")]
    IdentityAssetLockTransactionOutputNotFound { output_index: u32 },

    #[error("Asset Lock proof core chain height {proof_core_chain_locked_height} is higher than the current consensus core height {current_core_chain_locked_height}")]
    InvalidAssetLockProofCoreChainHeight {
        proof_core_chain_locked_height: u32,
        current_core_chain_locked_height: u32,
    },

    #[error("Core chain locked height {proof_core_chain_locked_height} must be higher than block {transaction_height:?} with Asset Lock transaction")]
    InvalidAssetLockProofTransactionHeight {
        proof_core_chain_locked_height: u32,
        transaction_height: Option<u32>,
    },

    #[error("Asset Lock output {output_index} has invalid public key hash. Must be 20 length bytes hash")]
    InvalidAssetLockTransactionOutputReturnSize { output_index: u32 },

    #[error("Invalid asset lock transaction: {message}")]
    InvalidIdentityAssetLockTransaction { message: String },

    #[error("Asset lock output {output_index} is not a valid standard OP_RETURN output")]
    InvalidIdentityAssetLockTransactionOutput { output_index: u32 },

    #[error("Invalid identity public key {public_key_id} data: {message}")]
    InvalidIdentityPublicKeyData { public_key_id: KeyId, message: String },

    #[error("Instant Lock is invalid: {message}")]
    InvalidInstantAssetLockProof { message: String },

    #[error("Instant lock proof signature is invalid or wasn't created recently. Please try chain asset lock proof instead.")]
    InvalidInstantAssetLockProofSignature,

    #[error("State transition size {actual} is more than maximum {max}")]
    StateTransitionMaxSizeExceeded { actual: usize, max: usize },

    #[error("Identity doesn't contain any master key, thus can not be updated. Please add a master key")]
    MissingMasterPublicKey,

    #[error("Invalid identity public key {public_key_id} security level {security_level:?}")]
    InvalidIdentityPublicKeySecurityLevel {
        public_key_id: KeyId,
        security_level: SecurityLevel,
    },

    #[error("Duplicate index name \"{index_name}\" defined in \"{document_type}\" document")]
    DuplicateIndexName {
        document_type: String,
        index_name: String,
    },

    #[error("Data Contract version must be {expected}, got {actual}")]
    InvalidDataContractVersion { expected: u32, actual: u32 },

    #[error("Data Contract updated schema is not backward compatible with one defined in Data Contract with id {data_contract_id}. Field: '{field_path}', Operation: '{operation}'")]
    IncompatibleDataContractSchema {
        data_contract_id: Identifier,
        operation: String,
        field_path: String,
    },

    #[error("Only $defs, version and documents fields are allowed to be updated. Forbidden operation '{operation}' on '{field_path}'")]
    DataContractImmutablePropertiesUpdate { operation: String, field_path: String },

    #[error("Document with type {document_type} has updated unique index named '{index_name}'. Change of unique indices is not allowed")]
    DataContractUniqueIndicesChanged {
        document_type: String,
        index_name: String,
    },

    #[error("Document with type {document_type} has badly constructed index '{index_name}'. Existing properties in the indices should be defined in the beginning of it.")]
    DataContractInvalidIndexDefinitionUpdate {
        document_type: String,
        index_name: String,
    },

    #[error("Document with type {document_type} has a new unique index named '{index_name}'. Adding unique indices during Data Contract update is not allowed.")]
    DataContractHaveNewUniqueIndex {
        document_type: String,
        index_name: String,
    },

    #[error("Identity key {public_key_id} has invalid signature")]
    InvalidIdentityKeySignature { public_key_id: KeyId },
}

impl BasicError {
    pub fn code(&self) -> u32 {
        match self {
            BasicError::ProtocolVersionParsing { .. } => 1000,
            BasicError::SerializedObjectParsing { .. } => 1001,
            BasicError::UnsupportedProtocolVersion { .. } => 1002,
            BasicError::IncompatibleProtocolVersion { .. } => 1003,
            BasicError::JsonSchemaCompilation { .. } => 1004,
            BasicError::JsonSchema { .. } => 1005,
            BasicError::InvalidIdentifier { .. } => 1006,
            BasicError::DataContractMaxDepthExceeded { .. } => 1007,
            BasicError::DuplicateIndex { .. } => 1008,
            BasicError::IncompatibleRe2Pattern { .. } => 1009,
            BasicError::InvalidCompoundIndex { .. } => 1010,
            BasicError::InvalidDataContractId { .. } => 1011,
            BasicError::InvalidIndexedPropertyConstraint { .. } => 1012,
            BasicError::InvalidIndexPropertyType { .. } => 1013,
            BasicError::InvalidJsonSchemaRef { .. } => 1014,
            BasicError::SystemPropertyIndexAlreadyPresent { .. } => 1015,
            BasicError::UndefinedIndexProperty { .. } => 1016,
            BasicError::UniqueIndicesLimitReached { .. } => 1017,
            BasicError::DataContractNotPresent { .. } => 1018,
            BasicError::DuplicateDocumentTransitionsWithIds { .. } => 1019,
            BasicError::DuplicateDocumentTransitionsWithIndices { .. } => 1020,
            BasicError::InconsistentCompoundIndexData { .. } => 1021,
            BasicError::InvalidDocumentTransitionId { .. } => 1023,
            BasicError::InvalidDocumentType { .. } => 1024,
            BasicError::DuplicatedIdentityPublicKey { .. } => 1029,
            BasicError::DuplicatedIdentityPublicKeyId { .. } => 1030,
            BasicError::IdentityAssetLockProofLockedTransactionMismatch { .. } => 1031,
            BasicError::IdentityAssetLockTransactionIsNotFound { .. } => 1032,
            BasicError::IdentityAssetLockTransactionOutPointAlreadyExists { .. } => 1033,
            BasicError::IdentityAssetLockTransactionOutputNotFound { .. } => 1034,
            BasicError::InvalidAssetLockProofCoreChainHeight { .. } => 1035,
            BasicError::InvalidAssetLockProofTransactionHeight { .. } => 1036,
            BasicError::InvalidAssetLockTransactionOutputReturnSize { .. } => 1037,
            BasicError::InvalidIdentityAssetLockTransaction { .. } => 1038,
            BasicError::InvalidIdentityAssetLockTransactionOutput { .. } => 1039,
            BasicError::InvalidIdentityPublicKeyData { .. } => 1040,
            BasicError::InvalidInstantAssetLockProof { .. } => 1041,
            BasicError::InvalidInstantAssetLockProofSignature => 1042,
            BasicError::StateTransitionMaxSizeExceeded { .. } => 1045,
            BasicError::MissingMasterPublicKey => 1046,
            BasicError::InvalidIdentityPublicKeySecurityLevel { .. } => 1047,
            BasicError::DuplicateIndexName { .. } => 1048,
            BasicError::InvalidDataContractVersion { .. } => 1050,
            BasicError::IncompatibleDataContractSchema { .. } => 1051,
            BasicError::DataContractImmutablePropertiesUpdate { .. } => 1052,
            BasicError::DataContractUniqueIndicesChanged { .. } => 1053,
            BasicError::DataContractInvalidIndexDefinitionUpdate { .. } => 1054,
            BasicError::DataContractHaveNewUniqueIndex { .. } => 1055,
            BasicError::InvalidIdentityKeySignature { .. } => 1056,
        }
    }
}

// =============================================================================
// SIGNATURE ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum SignatureError {
    #[error("Identity {identity_id} not found")]
    IdentityNotFound { identity_id: Identifier },

    #[error("Invalid identity key type {key_type:?}")]
    InvalidIdentityPublicKeyType { key_type: KeyType },

    #[error("Invalid State Transition signature")]
    InvalidStateTransitionSignature,

    #[error("Public key {public_key_id} doesn't exist")]
    MissingPublicKey { public_key_id: KeyId },

    #[error("Invalid public key security level {security_level:?}. This state transition requires one of {allowed:?}")]
    InvalidSignaturePublicKeySecurityLevel {
        security_level: SecurityLevel,
        allowed: Vec<SecurityLevel>,
    },

    #[error("Invalid identity key purpose {purpose:?}. This state transition requires {expected:?}")]
    WrongPublicKeyPurpose { purpose: Purpose, expected: Purpose },

    #[error("Public key {public_key_id} is disabled")]
    PublicKeyIsDisabled { public_key_id: KeyId },

    #[error("Invalid public key security level {security_level:?}. The state transition requires at least: {required:?}")]
    PublicKeySecurityLevelNotMet {
        security_level: SecurityLevel,
        required: SecurityLevel,
    },
}

impl SignatureError {
    pub fn code(&self) -> u32 {
        match self {
            SignatureError::IdentityNotFound { .. } => 2000,
            SignatureError::InvalidIdentityPublicKeyType { .. } => 2001,
            SignatureError::InvalidStateTransitionSignature => 2002,
            SignatureError::MissingPublicKey { .. } => 2003,
            SignatureError::InvalidSignaturePublicKeySecurityLevel { .. } => 2004,
            SignatureError::WrongPublicKeyPurpose { .. } => 2005,
            SignatureError::PublicKeyIsDisabled { .. } => 2006,
            SignatureError::PublicKeySecurityLevelNotMet { .. } => 2007,
        }
    }
}

// =============================================================================
// FEE ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FeeError {
    #[error("Current credits balance {balance} is not enough to pay {fee} fee")]
    BalanceIsNotEnough { balance: Credits, fee: Credits },
}

impl FeeError {
    pub fn code(&self) -> u32 {
        match self {
            FeeError::BalanceIsNotEnough { .. } => 3000,
        }
    }
}

// =============================================================================
// STATE ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum StateError {
    #[error("Data Contract {data_contract_id} is already present")]
    DataContractAlreadyPresent { data_contract_id: Identifier },

    #[error("{message}")]
    DataTriggerCondition {
        data_contract_id: Identifier,
        document_transition_id: Identifier,
        message: String,
    },

    #[error("{message}")]
    DataTriggerExecution {
        data_contract_id: Identifier,
        document_transition_id: Identifier,
        message: String,
    },

    #[error("Data trigger have not returned any result")]
    DataTriggerInvalidResult {
        data_contract_id: Identifier,
        document_transition_id: Identifier,
    },

    #[error("Document {document_id} is already present")]
    DocumentAlreadyPresent { document_id: Identifier },

    #[error("Document {document_id} is not found")]
    DocumentNotFound { document_id: Identifier },

    #[error("Provided document {document_id} owner ID {document_owner_id} mismatch with existing {existing_document_owner_id}")]
    DocumentOwnerIdMismatch {
        document_id: Identifier,
        document_owner_id: Identifier,
        existing_document_owner_id: Identifier,
    },

    #[error("Document {document_id} createdAt and updatedAt timestamps are not equal")]
    DocumentTimestampsMismatch { document_id: Identifier },

    #[error("Document {document_id} {timestamp_name} timestamp {timestamp} are out of block time window from {time_window_start} and {time_window_end}")]
    DocumentTimestampWindowViolation {
        timestamp_name: String,
        document_id: Identifier,
        timestamp: i64,
        time_window_start: i64,
        time_window_end: i64,
    },

    #[error("Document {document_id} has duplicate unique properties {duplicating_properties:?} with other documents")]
    DuplicateUniqueIndex {
        document_id: Identifier,
        duplicating_properties: Vec<String>,
    },

    #[error("Document {document_id} has invalid revision. The current one is {current_revision}")]
    InvalidDocumentRevision {
        document_id: Identifier,
        current_revision: Revision,
    },

    #[error("Identity {identity_id} already exists")]
    IdentityAlreadyExists { identity_id: Identifier },

    #[error("Identity public keys disabled time ({disabled_at}) is out of block time window from {time_window_start} and {time_window_end}")]
    IdentityPublicKeyDisabledAtWindowViolation {
        disabled_at: i64,
        time_window_start: i64,
        time_window_end: i64,
    },

    #[error("Identity Public Key #{public_key_index} is read only")]
    IdentityPublicKeyIsReadOnly { public_key_index: KeyId },

    #[error("Identity Public Key with Id {id} does not exist")]
    InvalidIdentityPublicKeyId { id: KeyId },

    #[error("Identity {identity_id} has invalid revision. The current revision is {current_revision}")]
    InvalidIdentityRevision {
        identity_id: Identifier,
        current_revision: Revision,
    },

    #[error("Identity cannot contain more than {max_items} public keys")]
    MaxIdentityPublicKeyLimitReached { max_items: usize },

    #[error("Duplicated public keys {duplicated_public_key_ids:?} found")]
    DuplicatedIdentityPublicKeyState { duplicated_public_key_ids: Vec<KeyId> },

    #[error("Duplicated public keys ids {duplicated_ids:?} found")]
    DuplicatedIdentityPublicKeyIdState { duplicated_ids: Vec<KeyId> },

    #[error("Identity Public Key #{public_key_index} is disabled")]
    IdentityPublicKeyIsDisabled { public_key_index: KeyId },
}

impl StateError {
    pub fn code(&self) -> u32 {
        match self {
            StateError::DataContractAlreadyPresent { .. } => 4000,
            StateError::DataTriggerCondition { .. } => 4001,
            StateError::DataTriggerExecution { .. } => 4002,
            StateError::DataTriggerInvalidResult { .. } => 4003,
            StateError::DocumentAlreadyPresent { .. } => 4004,
            StateError::DocumentNotFound { .. } => 4005,
            StateError::DocumentOwnerIdMismatch { .. } => 4006,
            StateError::DocumentTimestampsMismatch { .. } => 4007,
            StateError::DocumentTimestampWindowViolation { .. } => 4008,
            StateError::DuplicateUniqueIndex { .. } => 4009,
            StateError::InvalidDocumentRevision { .. } => 4010,
            StateError::IdentityAlreadyExists { .. } => 4011,
            StateError::IdentityPublicKeyDisabledAtWindowViolation { .. } => 4012,
            StateError::IdentityPublicKeyIsReadOnly { .. } => 4017,
            StateError::InvalidIdentityPublicKeyId { .. } => 4018,
            StateError::InvalidIdentityRevision { .. } => 4019,
            StateError::MaxIdentityPublicKeyLimitReached { .. } => 4020,
            StateError::DuplicatedIdentityPublicKeyState { .. } => 4021,
            StateError::DuplicatedIdentityPublicKeyIdState { .. } => 4022,
            StateError::IdentityPublicKeyIsDisabled { .. } => 4023,
        }
    }
}

// =============================================================================
// NON-CONSENSUS ERRORS
// =============================================================================

/// Failures of the external state repository.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum StateRepositoryError {
    /// The backing store failed to read or write.
    #[error("storage failure: {0}")]
    Storage(String),

    /// The store is temporarily unreachable. Retrying may succeed.
    #[error("state repository unavailable: {0}")]
    Unavailable(String),

    /// A stored record could not be decoded.
    #[error("corrupted record: {0}")]
    Corrupted(String),
}

/// Outcomes that are not consensus errors.
///
/// A transition that ends here is neither valid nor invalid: validity could
/// not be determined, or the engine itself was misused.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ProtocolError {
    /// A data contract required by the transition is not stored.
    #[error("Data Contract {data_contract_id} is not present")]
    DataContractNotPresent { data_contract_id: Identifier },

    /// The paying identity is not stored.
    #[error("Identity {identity_id} is not present")]
    IdentityNotPresent { identity_id: Identifier },

    #[error("state repository error: {0}")]
    StateRepository(#[from] StateRepositoryError),

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An entity violates a structural assumption that validation should have caught.
    #[error("invalid entity: {0}")]
    InvalidEntity(String),
}

impl From<shared_crypto::CryptoError> for ProtocolError {
    fn from(error: shared_crypto::CryptoError) -> Self {
        ProtocolError::Crypto(error.to_string())
    }
}

impl From<shared_types::EntityError> for ProtocolError {
    fn from(error: shared_types::EntityError) -> Self {
        ProtocolError::InvalidEntity(error.to_string())
    }
}

impl From<bincode::Error> for ProtocolError {
    fn from(error: bincode::Error) -> Self {
        ProtocolError::Codec(error.to_string())
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(error: serde_json::Error) -> Self {
        ProtocolError::Codec(error.to_string())
    }
}
