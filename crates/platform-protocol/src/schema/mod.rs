//! # Schemas
//!
//! - `state_transition`: fixed schemas of the six transition object forms
//! - `data_contract`: meta-schema and structural rules of data contracts

pub mod data_contract;
pub mod state_transition;

pub use data_contract::{
    data_contract_meta_schema, document_validation_schema, schema_depth, validate_data_contract,
};
pub use state_transition::state_transition_schema;
