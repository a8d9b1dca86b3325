//! # Shared Types Crate
//!
//! Platform entities shared by every crate of the workspace.
//!
//! ## Clusters
//!
//! - **Identifiers**: [`Identifier`] and the content-addressed id helpers
//! - **Contracts & Documents**: [`DataContract`], [`Document`], [`ExtendedDocument`]
//! - **Identities**: [`Identity`], [`IdentityPublicKey`] and its enums
//! - **Core Chain**: [`CoreTransaction`], [`InstantLock`], [`AssetLockProof`]
//! - **Platform State**: [`BlockInfo`], [`Metadata`]
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every entity is defined once, here.
//! - **Pure Identifiers**: ids are derived by pure functions of their inputs,
//!   never by mutating an entity.
//! - **Dual Encoding**: every entity serializes to a human-readable JSON
//!   object and to a compact binary form. JSON payload fields cross the binary
//!   form as JSON text (see [`json_compat`]).

pub mod asset_lock;
pub mod block;
pub mod data_contract;
pub mod document;
pub mod errors;
pub mod hashing;
pub mod identifier;
pub mod identity;
pub mod json_compat;

pub use asset_lock::{
    AssetLockProof, ChainAssetLockProof, CoreTransaction, InstantAssetLockProof, InstantLock,
    OutPoint, TxOut, ASSET_LOCK_TRANSACTION_TYPE,
};
pub use block::{BlockInfo, Metadata};
pub use data_contract::{DataContract, IndexDefinition, IndexProperty};
pub use document::{Document, ExtendedDocument};
pub use errors::{EntityError, IdentifierError};
pub use hashing::{hash_double, sha256};
pub use identifier::{generate_data_contract_id, generate_document_id, Identifier};
pub use identity::{Identity, IdentityPublicKey, KeyType, Purpose, SecurityLevel};

/// A 32-byte hash (SHA-256 or double SHA-256).
pub type Hash = [u8; 32];

/// Platform credits. All monetary amounts are non-negative.
pub type Credits = u64;

/// Identity public key id, unique within one identity.
pub type KeyId = u32;

/// Entity revision counter.
pub type Revision = u64;

/// Milliseconds since the UNIX epoch.
pub type TimestampMillis = u64;

/// Fee epoch index.
pub type EpochIndex = u16;

/// Protocol version carried by every entity and state transition.
pub type ProtocolVersion = u32;

/// Latest protocol version understood by this workspace.
pub const LATEST_PROTOCOL_VERSION: ProtocolVersion = 1;
