//! Driving ports (inbound API)

use crate::domain::{ExecutionContext, StateTransition, ValidationResult};
use crate::errors::ProtocolError;
use crate::fees::FeeResult;
use async_trait::async_trait;

/// Validation and application of state transitions.
///
/// The outer `Result` reports infrastructure failures, the inner
/// [`ValidationResult`] reports consensus errors.
#[async_trait]
pub trait StateTransitionApi: Send + Sync {
    /// Run basic, signature, fee and state validation, stopping at the
    /// first invalid stage.
    async fn validate(
        &self,
        state_transition: &StateTransition,
        context: &ExecutionContext,
    ) -> Result<ValidationResult, ProtocolError>;

    /// Structural validation. Consults the repository only for the data
    /// contracts a documents batch references.
    async fn validate_basic(
        &self,
        state_transition: &StateTransition,
        context: &ExecutionContext,
    ) -> Result<ValidationResult, ProtocolError>;

    async fn validate_signature(
        &self,
        state_transition: &StateTransition,
        context: &ExecutionContext,
    ) -> Result<ValidationResult, ProtocolError>;

    /// Balance check. On success the data carries the computed fee.
    async fn validate_fee(
        &self,
        state_transition: &StateTransition,
        context: &ExecutionContext,
    ) -> Result<ValidationResult<FeeResult>, ProtocolError>;

    async fn validate_state(
        &self,
        state_transition: &StateTransition,
        context: &ExecutionContext,
    ) -> Result<ValidationResult, ProtocolError>;

    /// Validate and, when valid, apply. Returns the validation result.
    async fn process(
        &self,
        state_transition: StateTransition,
        context: &ExecutionContext,
    ) -> Result<ValidationResult, ProtocolError>;
}
