//! # Platform Protocol
//!
//! Validation and application engine for state transitions: client-signed
//! intents that create or change data contracts, documents and identities.
//!
//! ## Architecture
//!
//! This crate follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): transitions, operation ledger, validation
//!   results and the type-state pipeline. No I/O.
//! - **Ports Layer** (`ports/`): the inbound `StateTransitionApi` and the
//!   outbound `StateRepository`, `CryptoAdapter` and `SchemaValidator`
//! - **Adapters Layer** (`adapters/`): in-memory repository, native crypto,
//!   `jsonschema` validator
//! - **Service Layer** (`service.rs`, `platform.rs`): wires the stages to
//!   the ports
//!
//! ## Pipeline
//!
//! ```text
//! decode → basic → signature → fee → state → apply
//! ```
//!
//! Each stage runs only when the previous one produced a valid
//! [`ValidationResult`]. Consensus violations travel inside that result;
//! infrastructure failures are returned as [`ProtocolError`].
//!
//! ## Feature Modules
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | `basic` | structure, schemas, protocol version, size |
//! | `signature` | identity-key and asset-lock-key signatures |
//! | `fees` | operation costs and the balance check |
//! | `state` | per-variant checks against stored state |
//! | `triggers` | system contract rules for documents |
//! | `uniqueness` | unique-index checks for documents batches |
//! | `asset_lock` | asset-lock proof checks and output lookups |
//! | `apply` | repository writes of an accepted transition |
//! | `codec` | version-framed wire encoding |

pub mod adapters;
pub mod apply;
pub mod asset_lock;
pub mod basic;
pub mod codec;
pub mod config;
pub mod domain;
pub mod errors;
pub mod fees;
pub mod platform;
pub mod ports;
pub mod schema;
pub mod service;
pub mod signature;
pub mod state;
pub mod triggers;
pub mod uniqueness;

// Re-export public API
pub use apply::apply_state_transition;
pub use basic::validate_state_transition_basic;
pub use codec::{
    decode_protocol_entity, deserialize_consensus_error, encode_protocol_entity,
    serialize_consensus_error,
};
pub use config::{ConfigError, ProtocolConfig, SystemContracts};
pub use domain::{
    DocumentTransition, DocumentTransitionAction, ExecutionContext, Operation, Pipeline,
    StageOutcome, StateTransition, StateTransitionType, ValidationResult,
};
pub use errors::{
    BasicError, ConsensusError, FeeError, ProtocolError, SignatureError, StateError,
    StateRepositoryError,
};
pub use fees::{
    calculate_operation_fees, calculate_state_transition_fee,
    calculate_state_transition_fee_from_operations, validate_state_transition_fee, FeeResult,
};
pub use platform::{DataContractFactory, DocumentFactory, IdentityFactory, PlatformProtocol};
pub use ports::{
    CryptoAdapter, DocumentQuery, SchemaValidator, StateRepository, StateTransitionApi,
    TransactionData,
};
pub use service::StateTransitionFacade;
pub use signature::validate_state_transition_signature;
pub use state::{validate_indices_are_backward_compatible, validate_state_transition_state};
pub use triggers::{execute_data_triggers, get_data_triggers, DataTriggerRegistry};
pub use uniqueness::{
    find_duplicates_by_id, find_duplicates_by_indices, validate_documents_uniqueness_by_indices,
    validate_partial_compound_indices,
};
