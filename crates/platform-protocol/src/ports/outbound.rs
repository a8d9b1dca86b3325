//! Driven ports (outbound dependencies)
//!
//! The engine consults three capabilities it does not implement:
//!
//! | Port | Provides |
//! |------|----------|
//! | [`StateRepository`] | contracts, documents, identities, balances, chain facts |
//! | [`CryptoAdapter`] | signature verification and signing per key type |
//! | [`SchemaValidator`] | JSON-schema compilation and validation |

use crate::domain::{ExecutionContext, ValidationResult};
use crate::errors::StateRepositoryError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use shared_crypto::CryptoError;
use shared_types::{
    BlockInfo, CoreTransaction, Credits, DataContract, Document, Hash, Identifier, Identity,
    IdentityPublicKey, InstantLock, KeyId, KeyType, OutPoint, Revision, TimestampMillis,
};

/// Result alias for repository calls.
pub type RepositoryResult<T> = Result<T, StateRepositoryError>;

/// Equality filter over document properties, dotted paths allowed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentQuery {
    pub where_clauses: Vec<(String, JsonValue)>,
    pub limit: Option<usize>,
}

impl DocumentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `path == value`.
    pub fn with_equal(mut self, path: impl Into<String>, value: JsonValue) -> Self {
        self.where_clauses.push((path.into(), value));
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `document` satisfies every clause.
    pub fn matches(&self, document: &Document) -> bool {
        self.where_clauses
            .iter()
            .all(|(path, expected)| document.get(path).as_ref() == Some(expected))
    }
}

/// A core-chain transaction with the height it was mined at, if known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionData {
    pub transaction: CoreTransaction,
    pub height: Option<u32>,
}

/// Externally supplied platform state.
///
/// Every method takes the transition's [`ExecutionContext`]. In dry-run mode
/// writes must be costed and recorded but not persisted.
#[async_trait]
pub trait StateRepository: Send + Sync {
    // === DATA CONTRACTS ===

    async fn fetch_data_contract(
        &self,
        id: &Identifier,
        context: &ExecutionContext,
    ) -> RepositoryResult<Option<DataContract>>;

    async fn store_data_contract(
        &self,
        data_contract: DataContract,
        context: &ExecutionContext,
    ) -> RepositoryResult<()>;

    async fn update_data_contract(
        &self,
        data_contract: DataContract,
        context: &ExecutionContext,
    ) -> RepositoryResult<()>;

    // === DOCUMENTS ===

    async fn fetch_documents(
        &self,
        data_contract_id: &Identifier,
        document_type: &str,
        query: &DocumentQuery,
        context: &ExecutionContext,
    ) -> RepositoryResult<Vec<Document>>;

    async fn create_document(
        &self,
        data_contract_id: &Identifier,
        document_type: &str,
        document: Document,
        context: &ExecutionContext,
    ) -> RepositoryResult<()>;

    async fn update_document(
        &self,
        data_contract_id: &Identifier,
        document_type: &str,
        document: Document,
        context: &ExecutionContext,
    ) -> RepositoryResult<()>;

    async fn remove_document(
        &self,
        data_contract_id: &Identifier,
        document_type: &str,
        document_id: &Identifier,
        context: &ExecutionContext,
    ) -> RepositoryResult<()>;

    // === IDENTITIES ===

    async fn fetch_identity(
        &self,
        id: &Identifier,
        context: &ExecutionContext,
    ) -> RepositoryResult<Option<Identity>>;

    async fn create_identity(
        &self,
        identity: Identity,
        context: &ExecutionContext,
    ) -> RepositoryResult<()>;

    async fn add_keys_to_identity(
        &self,
        identity_id: &Identifier,
        keys: Vec<IdentityPublicKey>,
        context: &ExecutionContext,
    ) -> RepositoryResult<()>;

    async fn disable_identity_keys(
        &self,
        identity_id: &Identifier,
        key_ids: &[KeyId],
        disabled_at: TimestampMillis,
        context: &ExecutionContext,
    ) -> RepositoryResult<()>;

    async fn update_identity_revision(
        &self,
        identity_id: &Identifier,
        revision: Revision,
        context: &ExecutionContext,
    ) -> RepositoryResult<()>;

    async fn fetch_identity_balance(
        &self,
        identity_id: &Identifier,
        context: &ExecutionContext,
    ) -> RepositoryResult<Option<Credits>>;

    async fn add_to_identity_balance(
        &self,
        identity_id: &Identifier,
        amount: Credits,
        context: &ExecutionContext,
    ) -> RepositoryResult<()>;

    async fn add_to_system_credits(
        &self,
        amount: Credits,
        context: &ExecutionContext,
    ) -> RepositoryResult<()>;

    // === CHAIN FACTS ===

    async fn fetch_latest_platform_block_header(
        &self,
        context: &ExecutionContext,
    ) -> RepositoryResult<BlockInfo>;

    async fn fetch_latest_platform_block_height(
        &self,
        context: &ExecutionContext,
    ) -> RepositoryResult<u64> {
        Ok(self.fetch_latest_platform_block_header(context).await?.height)
    }

    async fn fetch_latest_platform_block_time(
        &self,
        context: &ExecutionContext,
    ) -> RepositoryResult<TimestampMillis> {
        Ok(self.fetch_latest_platform_block_header(context).await?.time_ms)
    }

    async fn fetch_latest_platform_core_chain_locked_height(
        &self,
        context: &ExecutionContext,
    ) -> RepositoryResult<u32> {
        Ok(self
            .fetch_latest_platform_block_header(context)
            .await?
            .core_chain_locked_height)
    }

    async fn fetch_transaction(
        &self,
        txid: &Hash,
        context: &ExecutionContext,
    ) -> RepositoryResult<Option<TransactionData>>;

    async fn is_asset_lock_transaction_out_point_already_used(
        &self,
        out_point: &OutPoint,
        context: &ExecutionContext,
    ) -> RepositoryResult<bool>;

    async fn mark_asset_lock_transaction_out_point_as_used(
        &self,
        out_point: &OutPoint,
        context: &ExecutionContext,
    ) -> RepositoryResult<()>;

    async fn verify_instant_lock(
        &self,
        instant_lock: &InstantLock,
        context: &ExecutionContext,
    ) -> RepositoryResult<bool>;

    async fn is_in_the_valid_master_nodes_list(
        &self,
        identity_id: &Identifier,
        context: &ExecutionContext,
    ) -> RepositoryResult<bool>;
}

/// Signature primitives per identity key type.
///
/// Signatures cover `sha256d(message)`.
pub trait CryptoAdapter: Send + Sync {
    /// `Ok(())` when `signature` over `message` verifies against `public_key_data`.
    ///
    /// Key types that cannot verify return [`CryptoError::UnsupportedKeyType`].
    fn verify_signature(
        &self,
        key_type: KeyType,
        public_key_data: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), CryptoError>;

    fn sign(
        &self,
        key_type: KeyType,
        private_key: &[u8],
        message: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;

    /// Key data, in the identity key format of `key_type`, for a private key.
    fn private_key_to_public_key(
        &self,
        key_type: KeyType,
        private_key: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;

    /// Whether `data` is well-formed key material for `key_type`.
    fn validate_public_key(&self, key_type: KeyType, data: &[u8]) -> Result<(), CryptoError>;
}

/// JSON-schema capability.
pub trait SchemaValidator: Send + Sync {
    /// Validate `instance` against `schema`.
    ///
    /// A schema that fails to compile yields a single
    /// JsonSchemaCompilation error.
    fn validate(&self, schema: &JsonValue, instance: &JsonValue) -> ValidationResult;

    /// Compile `schema` without validating anything.
    fn compile(&self, schema: &JsonValue) -> ValidationResult;
}
