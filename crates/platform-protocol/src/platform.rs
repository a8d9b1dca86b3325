//! # Platform Facade
//!
//! Composition root: one [`PlatformProtocol`] owns the ports, the
//! configuration and the sub-facades built on them.
//!
//! | Sub-facade | Builds |
//! |------------|--------|
//! | [`DataContractFactory`] | contracts and their create/update transitions |
//! | [`DocumentFactory`] | documents and documents batches |
//! | [`IdentityFactory`] | identities and their create/top-up/update transitions |
//! | [`StateTransitionFacade`] | the validation pipeline and apply |
//!
//! Every factory offers `create` (fresh entity), `create_from_object` (JSON
//! form) and `create_from_buffer` (wire form). The last two validate the
//! entity unless told to skip it and report problems as consensus errors.

use crate::basic::identity::{validate_master_key_present, validate_public_keys};
use crate::codec::{decode_protocol_entity, encode_protocol_entity, MIN_PROTOCOL_VERSION};
use crate::config::ProtocolConfig;
use crate::domain::{
    DataContractCreateTransition, DataContractUpdateTransition, DocumentCreateTransition,
    DocumentTransition, DocumentsBatchTransition, IdentityCreateTransition,
    IdentityPublicKeyInCreation, IdentityTopUpTransition, IdentityUpdateTransition,
    StateTransition, ValidationResult,
};
use crate::errors::{BasicError, ProtocolError};
use crate::ports::{CryptoAdapter, SchemaValidator, StateRepository};
use crate::schema::data_contract::{document_validation_schema, validate_data_contract};
use crate::service::StateTransitionFacade;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use shared_types::{
    AssetLockProof, DataContract, ExtendedDocument, Identifier, Identity, IdentityPublicKey,
    KeyId, ProtocolVersion, TimestampMillis, LATEST_PROTOCOL_VERSION,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Protocol version shared by the facade and its factories.
#[derive(Debug, Clone)]
struct VersionHandle(Arc<AtomicU32>);

impl VersionHandle {
    fn new(version: ProtocolVersion) -> Self {
        Self(Arc::new(AtomicU32::new(version)))
    }

    fn get(&self) -> ProtocolVersion {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self, version: ProtocolVersion) {
        self.0.store(version, Ordering::Release);
    }
}

/// Parse the JSON form of `T`, reporting a failure as SerializedObjectParsing.
fn parse_object<T: DeserializeOwned>(object: JsonValue) -> ValidationResult<T> {
    match serde_json::from_value(object) {
        Ok(entity) => ValidationResult::valid_with_data(entity),
        Err(e) => ValidationResult::invalid(BasicError::SerializedObjectParsing {
            message: e.to_string(),
        }),
    }
}

/// Decode the wire form of `T`, reporting a failure as its basic error.
fn parse_buffer<T: DeserializeOwned>(buffer: &[u8]) -> ValidationResult<T> {
    match decode_protocol_entity(buffer) {
        Ok((_, entity)) => ValidationResult::valid_with_data(entity),
        Err(e) => ValidationResult::invalid(e),
    }
}

fn random_entropy() -> [u8; 32] {
    rand::random()
}

// =============================================================================
// DATA CONTRACTS
// =============================================================================

/// Builds and parses data contracts.
#[derive(Clone)]
pub struct DataContractFactory {
    schema_validator: Arc<dyn SchemaValidator>,
    config: Arc<ProtocolConfig>,
    version: VersionHandle,
}

impl DataContractFactory {
    /// A version-1 contract whose id derives from fresh entropy.
    pub fn create(
        &self,
        owner_id: Identifier,
        documents: BTreeMap<String, JsonValue>,
    ) -> DataContract {
        DataContract::new(
            owner_id,
            random_entropy(),
            self.version.get(),
            documents,
            BTreeMap::new(),
        )
    }

    fn validated(
        &self,
        parsed: ValidationResult<DataContract>,
        skip_validation: bool,
    ) -> ValidationResult<DataContract> {
        if skip_validation || !parsed.is_valid() {
            return parsed;
        }
        let Some(contract) = parsed.into_data() else {
            return ValidationResult::valid();
        };
        validate_data_contract(&contract, self.schema_validator.as_ref(), &self.config)
            .with_data(contract)
    }

    /// Parse and validate the JSON form of a contract.
    pub fn create_from_object(
        &self,
        object: JsonValue,
        skip_validation: bool,
    ) -> ValidationResult<DataContract> {
        self.validated(parse_object(object), skip_validation)
    }

    /// Parse and validate the wire form of a contract.
    pub fn create_from_buffer(
        &self,
        buffer: &[u8],
        skip_validation: bool,
    ) -> ValidationResult<DataContract> {
        self.validated(parse_buffer(buffer), skip_validation)
    }

    pub fn to_buffer(&self, data_contract: &DataContract) -> Result<Vec<u8>, ProtocolError> {
        encode_protocol_entity(data_contract, data_contract.protocol_version)
    }

    /// Unsigned create transition. The contract must carry its entropy.
    pub fn create_data_contract_create_transition(
        &self,
        data_contract: DataContract,
    ) -> Result<DataContractCreateTransition, ProtocolError> {
        let entropy = data_contract.entropy.ok_or_else(|| {
            ProtocolError::InvalidEntity(format!(
                "data contract {} carries no entropy",
                data_contract.id
            ))
        })?;
        Ok(DataContractCreateTransition {
            protocol_version: self.version.get(),
            data_contract,
            entropy,
            signature_public_key_id: 0,
            signature: Vec::new(),
        })
    }

    /// Unsigned update transition carrying `data_contract` as is.
    pub fn create_data_contract_update_transition(
        &self,
        data_contract: DataContract,
    ) -> DataContractUpdateTransition {
        DataContractUpdateTransition {
            protocol_version: self.version.get(),
            data_contract,
            signature_public_key_id: 0,
            signature: Vec::new(),
        }
    }
}

// =============================================================================
// DOCUMENTS
// =============================================================================

/// System properties that must hold identifiers.
const DOCUMENT_IDENTIFIER_PROPERTIES: [&str; 2] = ["$id", "$ownerId"];

/// Builds and parses documents.
#[derive(Clone)]
pub struct DocumentFactory {
    schema_validator: Arc<dyn SchemaValidator>,
    version: VersionHandle,
}

impl DocumentFactory {
    /// A create transition for a new document with an id derived from fresh
    /// entropy.
    pub fn create_transition(
        &self,
        data_contract: &DataContract,
        owner_id: &Identifier,
        document_type: &str,
        data: JsonValue,
    ) -> Result<DocumentCreateTransition, ProtocolError> {
        if !data_contract.has_document_type(document_type) {
            return Err(ProtocolError::InvalidEntity(format!(
                "data contract {} doesn't define document type {document_type}",
                data_contract.id
            )));
        }
        Ok(DocumentCreateTransition::new(
            data_contract,
            owner_id,
            document_type,
            random_entropy(),
            data,
        ))
    }

    /// A new document at revision 1.
    pub fn create(
        &self,
        data_contract: &DataContract,
        owner_id: &Identifier,
        document_type: &str,
        data: JsonValue,
    ) -> Result<ExtendedDocument, ProtocolError> {
        let transition = self.create_transition(data_contract, owner_id, document_type, data)?;
        Ok(ExtendedDocument::new(
            transition.to_document(*owner_id),
            document_type.to_string(),
            data_contract.clone(),
        ))
    }

    fn validated(
        &self,
        parsed: ValidationResult<ExtendedDocument>,
        skip_validation: bool,
    ) -> ValidationResult<ExtendedDocument> {
        if skip_validation || !parsed.is_valid() {
            return parsed;
        }
        let Some(document) = parsed.into_data() else {
            return ValidationResult::valid();
        };

        let contract = &document.data_contract;
        let Some(schema) = document_validation_schema(contract, &document.document_type_name) else {
            return ValidationResult::invalid(BasicError::InvalidDocumentType {
                document_type: document.document_type_name.clone(),
                data_contract_id: contract.id,
            });
        };
        let result = self.schema_validator.validate(&schema, &document.document.data);
        result.with_data(document)
    }

    /// Parse and validate the JSON form of an extended document.
    ///
    /// Malformed `$id` or `$ownerId` values are reported as InvalidIdentifier
    /// before the object is parsed.
    pub fn create_from_object(
        &self,
        object: JsonValue,
        skip_validation: bool,
    ) -> ValidationResult<ExtendedDocument> {
        let mut identifiers = Vec::new();
        if let Some(document) = object.get("document") {
            for property in DOCUMENT_IDENTIFIER_PROPERTIES {
                if let Some(value) = document.get(property) {
                    if let Err(e) = Identifier::from_json(value) {
                        identifiers.push(
                            BasicError::InvalidIdentifier {
                                name: property.to_string(),
                                message: e.to_string(),
                            }
                            .into(),
                        );
                    }
                }
            }
        }
        if !identifiers.is_empty() {
            return ValidationResult::new_with_errors(identifiers);
        }
        self.validated(parse_object(object), skip_validation)
    }

    /// Parse and validate the wire form of an extended document.
    pub fn create_from_buffer(
        &self,
        buffer: &[u8],
        skip_validation: bool,
    ) -> ValidationResult<ExtendedDocument> {
        self.validated(parse_buffer(buffer), skip_validation)
    }

    pub fn to_buffer(&self, document: &ExtendedDocument) -> Result<Vec<u8>, ProtocolError> {
        encode_protocol_entity(document, self.version.get())
    }

    /// Unsigned documents batch of `transitions`.
    pub fn create_state_transition(
        &self,
        owner_id: Identifier,
        transitions: Vec<DocumentTransition>,
    ) -> DocumentsBatchTransition {
        DocumentsBatchTransition {
            protocol_version: self.version.get(),
            owner_id,
            transitions,
            signature_public_key_id: 0,
            signature: Vec::new(),
        }
    }
}

// =============================================================================
// IDENTITIES
// =============================================================================

/// Builds and parses identities.
#[derive(Clone)]
pub struct IdentityFactory {
    crypto: Arc<dyn CryptoAdapter>,
    version: VersionHandle,
}

impl IdentityFactory {
    /// An empty-balance identity funded by `asset_lock_proof`.
    pub fn create(
        &self,
        asset_lock_proof: &AssetLockProof,
        public_keys: Vec<IdentityPublicKey>,
    ) -> Identity {
        Identity {
            id: asset_lock_proof.create_identifier(),
            protocol_version: self.version.get(),
            public_keys,
            balance: 0,
            revision: 0,
            metadata: None,
        }
    }

    fn validated(
        &self,
        parsed: ValidationResult<Identity>,
        skip_validation: bool,
    ) -> ValidationResult<Identity> {
        if skip_validation || !parsed.is_valid() {
            return parsed;
        }
        let Some(identity) = parsed.into_data() else {
            return ValidationResult::valid();
        };
        let keys: Vec<IdentityPublicKeyInCreation> = identity
            .public_keys
            .iter()
            .map(IdentityPublicKeyInCreation::from)
            .collect();
        let mut result = validate_public_keys(self.crypto.as_ref(), &keys);
        result.merge(validate_master_key_present(&keys));
        result.with_data(identity)
    }

    pub fn create_from_object(
        &self,
        object: JsonValue,
        skip_validation: bool,
    ) -> ValidationResult<Identity> {
        self.validated(parse_object(object), skip_validation)
    }

    pub fn create_from_buffer(
        &self,
        buffer: &[u8],
        skip_validation: bool,
    ) -> ValidationResult<Identity> {
        self.validated(parse_buffer(buffer), skip_validation)
    }

    pub fn to_buffer(&self, identity: &Identity) -> Result<Vec<u8>, ProtocolError> {
        encode_protocol_entity(identity, identity.protocol_version)
    }

    /// Unsigned create transition registering every key of `identity`.
    pub fn create_identity_create_transition(
        &self,
        identity: &Identity,
        asset_lock_proof: AssetLockProof,
    ) -> IdentityCreateTransition {
        IdentityCreateTransition {
            protocol_version: self.version.get(),
            identity_id: identity.id,
            asset_lock_proof,
            public_keys: identity
                .public_keys
                .iter()
                .map(IdentityPublicKeyInCreation::from)
                .collect(),
            signature: Vec::new(),
        }
    }

    pub fn create_identity_top_up_transition(
        &self,
        identity_id: Identifier,
        asset_lock_proof: AssetLockProof,
    ) -> IdentityTopUpTransition {
        IdentityTopUpTransition {
            protocol_version: self.version.get(),
            asset_lock_proof,
            identity_id,
            signature: Vec::new(),
        }
    }

    /// Unsigned update moving `identity` to its next revision.
    pub fn create_identity_update_transition(
        &self,
        identity: &Identity,
        add_public_keys: Vec<IdentityPublicKey>,
        disable_public_keys: Vec<KeyId>,
        public_keys_disabled_at: Option<TimestampMillis>,
    ) -> IdentityUpdateTransition {
        IdentityUpdateTransition {
            protocol_version: self.version.get(),
            identity_id: identity.id,
            revision: identity.revision + 1,
            add_public_keys: add_public_keys
                .iter()
                .map(IdentityPublicKeyInCreation::from)
                .collect(),
            disable_public_keys,
            public_keys_disabled_at,
            signature_public_key_id: 0,
            signature: Vec::new(),
        }
    }
}

// =============================================================================
// PLATFORM PROTOCOL
// =============================================================================

/// Entry point owning the ports and every sub-facade.
pub struct PlatformProtocol {
    version: VersionHandle,
    data_contracts: DataContractFactory,
    documents: DocumentFactory,
    identities: IdentityFactory,
    state_transitions: StateTransitionFacade,
}

impl PlatformProtocol {
    /// Wire the sub-facades. Fails when `config` does not validate.
    pub fn new(
        repository: Arc<dyn StateRepository>,
        crypto: Arc<dyn CryptoAdapter>,
        schema_validator: Arc<dyn SchemaValidator>,
        config: ProtocolConfig,
    ) -> Result<Self, ProtocolError> {
        config.validate()?;
        let config = Arc::new(config);
        let version = VersionHandle::new(config.protocol_version);

        let platform = Self {
            data_contracts: DataContractFactory {
                schema_validator: schema_validator.clone(),
                config: config.clone(),
                version: version.clone(),
            },
            documents: DocumentFactory {
                schema_validator: schema_validator.clone(),
                version: version.clone(),
            },
            identities: IdentityFactory {
                crypto: crypto.clone(),
                version: version.clone(),
            },
            state_transitions: StateTransitionFacade::new(
                repository,
                crypto,
                schema_validator,
                config.clone(),
            ),
            version,
        };
        info!(
            protocol_version = platform.protocol_version(),
            "Platform protocol initialized"
        );
        Ok(platform)
    }

    pub fn data_contracts(&self) -> &DataContractFactory {
        &self.data_contracts
    }

    pub fn documents(&self) -> &DocumentFactory {
        &self.documents
    }

    pub fn identities(&self) -> &IdentityFactory {
        &self.identities
    }

    pub fn state_transitions(&self) -> &StateTransitionFacade {
        &self.state_transitions
    }

    /// Version stamped on everything the factories build.
    pub fn protocol_version(&self) -> ProtocolVersion {
        self.version.get()
    }

    pub fn set_protocol_version(&self, version: ProtocolVersion) -> Result<(), ProtocolError> {
        if !(MIN_PROTOCOL_VERSION..=LATEST_PROTOCOL_VERSION).contains(&version) {
            return Err(ProtocolError::InvalidConfiguration(format!(
                "protocol version {version} is outside {MIN_PROTOCOL_VERSION}..={LATEST_PROTOCOL_VERSION}"
            )));
        }
        debug!(protocol_version = version, "Protocol version changed");
        self.version.set(version);
        Ok(())
    }

    /// Decode a state transition from its wire form.
    pub fn state_transition_from_buffer(&self, buffer: &[u8]) -> ValidationResult<StateTransition> {
        parse_buffer(buffer)
    }

    pub fn state_transition_to_buffer(
        &self,
        state_transition: &StateTransition,
    ) -> Result<Vec<u8>, ProtocolError> {
        encode_protocol_entity(state_transition, state_transition.protocol_version())
    }
}
