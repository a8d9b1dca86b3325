//! # State Validation
//!
//! Checks a transition against stored platform state. Runs after the
//! basic, signature and fee stages passed.
//!
//! | Variant | Module |
//! |---------|--------|
//! | DataContractCreate, DataContractUpdate | [`data_contract`] |
//! | DocumentsBatch | [`documents_batch`] |
//! | IdentityCreate, IdentityTopUp, IdentityUpdate | [`identity`] |

pub mod data_contract;
pub mod documents_batch;
pub mod identity;

pub use data_contract::{
    validate_data_contract_create_state, validate_data_contract_update_state,
    validate_indices_are_backward_compatible, validate_schema_backward_compatibility,
};
pub use documents_batch::validate_documents_batch_state;
pub use identity::{
    validate_identity_create_state, validate_identity_top_up_state,
    validate_identity_update_state,
};

use crate::config::ProtocolConfig;
use crate::domain::{ExecutionContext, StateTransition, ValidationResult};
use crate::errors::ProtocolError;
use crate::ports::StateRepository;
use crate::triggers::DataTriggerRegistry;
use shared_types::TimestampMillis;

/// Block time +/- the configured window, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: TimestampMillis,
    pub end: TimestampMillis,
}

impl TimeWindow {
    pub fn around(block_time: TimestampMillis, window_ms: u64) -> Self {
        Self {
            start: block_time.saturating_sub(window_ms),
            end: block_time.saturating_add(window_ms),
        }
    }

    pub fn contains(&self, time: TimestampMillis) -> bool {
        (self.start..=self.end).contains(&time)
    }
}

pub(crate) fn millis_as_i64(time: TimestampMillis) -> i64 {
    i64::try_from(time).unwrap_or(i64::MAX)
}

/// Run the state checks of `state_transition`.
pub async fn validate_state_transition_state(
    repository: &dyn StateRepository,
    triggers: &DataTriggerRegistry,
    config: &ProtocolConfig,
    state_transition: &StateTransition,
    context: &ExecutionContext,
) -> Result<ValidationResult, ProtocolError> {
    match state_transition {
        StateTransition::DataContractCreate(t) => {
            validate_data_contract_create_state(repository, t, context).await
        }
        StateTransition::DataContractUpdate(t) => {
            validate_data_contract_update_state(repository, t, context).await
        }
        StateTransition::DocumentsBatch(t) => {
            validate_documents_batch_state(repository, triggers, config, t, context).await
        }
        StateTransition::IdentityCreate(t) => {
            validate_identity_create_state(repository, t, context).await
        }
        StateTransition::IdentityTopUp(t) => {
            validate_identity_top_up_state(repository, t, context).await
        }
        StateTransition::IdentityUpdate(t) => {
            validate_identity_update_state(repository, config, t, context).await
        }
    }
}
