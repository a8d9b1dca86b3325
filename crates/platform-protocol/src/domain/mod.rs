//! # Domain Layer
//!
//! ## Components
//!
//! - `state_transition`: the six transition variants and their shared surface
//! - `document_transition`: create/replace/delete actions of a documents batch
//! - `execution_context`: dry-run flag and operation ledger
//! - `operation`: billable units of work
//! - `validation`: the consensus-error accumulator
//! - `typestate`: compile-time ordering of the validation pipeline

pub mod document_transition;
pub mod execution_context;
pub mod operation;
pub mod state_transition;
pub mod typestate;
pub mod validation;

pub use document_transition::*;
pub use execution_context::*;
pub use operation::*;
pub use state_transition::*;
pub use typestate::{
    Applied, BasicValid, Decoded, FeeValid, Pipeline, SignatureValid, Stage, StageOutcome,
    StateValid,
};
pub use validation::*;
