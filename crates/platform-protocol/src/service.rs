//! # State Transition Service
//!
//! Application service implementing [`StateTransitionApi`].
//!
//! ## Architecture
//!
//! This is the hexagonal "application service" that:
//! - Implements the inbound port (`StateTransitionApi`)
//! - Uses the outbound ports (`StateRepository`, `CryptoAdapter`,
//!   `SchemaValidator`) for everything it does not compute itself
//! - Drives a [`Pipeline`] through its stages so the apply step can only
//!   follow a passed state stage
//!
//! ## Stages
//!
//! | Stage | Function | Metric label |
//! |-------|----------|--------------|
//! | basic | [`validate_state_transition_basic`] | `basic` |
//! | signature | [`validate_state_transition_signature`] | `signature` |
//! | fee | [`validate_state_transition_fee`] | `fee` |
//! | state | [`validate_state_transition_state`] | `state` |
//! | apply | [`apply_state_transition`] | `apply` |

use crate::apply::apply_state_transition;
use crate::basic::validate_state_transition_basic;
use crate::config::ProtocolConfig;
use crate::domain::{
    Applied, BasicValid, ExecutionContext, FeeValid, Pipeline, SignatureValid, Stage,
    StageOutcome, StateTransition, StateTransitionType, StateValid, ValidationResult,
};
use crate::errors::ProtocolError;
use crate::fees::{validate_state_transition_fee, FeeResult};
use crate::ports::{CryptoAdapter, SchemaValidator, StateRepository, StateTransitionApi};
use crate::signature::validate_state_transition_signature;
use crate::state::validate_state_transition_state;
use crate::triggers::DataTriggerRegistry;
use async_trait::async_trait;
use platform_telemetry::{
    record_rejection, StageTimer, FEE_CREDITS_CHARGED, STATE_TRANSITIONS_APPLIED,
    STATE_TRANSITIONS_VALIDATED,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Validates and applies state transitions against one state repository.
#[derive(Clone)]
pub struct StateTransitionFacade {
    repository: Arc<dyn StateRepository>,
    crypto: Arc<dyn CryptoAdapter>,
    schema_validator: Arc<dyn SchemaValidator>,
    triggers: Arc<DataTriggerRegistry>,
    config: Arc<ProtocolConfig>,
}

impl StateTransitionFacade {
    /// Create a facade whose data triggers are bound to the configured
    /// system contracts.
    pub fn new(
        repository: Arc<dyn StateRepository>,
        crypto: Arc<dyn CryptoAdapter>,
        schema_validator: Arc<dyn SchemaValidator>,
        config: Arc<ProtocolConfig>,
    ) -> Self {
        let triggers = Arc::new(DataTriggerRegistry::from_system_contracts(
            &config.system_contracts,
        ));
        Self {
            repository,
            crypto,
            schema_validator,
            triggers,
            config,
        }
    }

    /// Replace the data-trigger registry.
    pub fn with_triggers(mut self, triggers: DataTriggerRegistry) -> Self {
        self.triggers = Arc::new(triggers);
        self
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Record a rejected stage and hand its result back.
    fn reject<S: Stage>(
        transition_type: StateTransitionType,
        stage: &'static str,
        result: ValidationResult,
    ) -> StageOutcome<S> {
        let codes = result.error_codes();
        record_rejection(transition_type.name(), stage, &codes);
        warn!(
            transition_type = %transition_type,
            stage,
            codes = ?codes,
            "State transition rejected"
        );
        StageOutcome::Rejected(result)
    }

    /// Run every validation stage, stopping at the first invalid one.
    #[instrument(skip_all, fields(transition_type = %state_transition.transition_type()))]
    pub async fn run_validation(
        &self,
        state_transition: StateTransition,
        context: &ExecutionContext,
    ) -> Result<StageOutcome<StateValid>, ProtocolError> {
        let transition_type = state_transition.transition_type();
        let pipeline = Pipeline::new(state_transition);

        let result = {
            let _timer = StageTimer::new(BasicValid::NAME);
            self.validate_basic(pipeline.transition(), context).await?
        };
        let pipeline = match pipeline.basic_checked(result) {
            StageOutcome::Passed(next) => next,
            StageOutcome::Rejected(result) => {
                return Ok(Self::reject(transition_type, BasicValid::NAME, result));
            }
        };

        let result = {
            let _timer = StageTimer::new(SignatureValid::NAME);
            self.validate_signature(pipeline.transition(), context).await?
        };
        let pipeline = match pipeline.signature_checked(result) {
            StageOutcome::Passed(next) => next,
            StageOutcome::Rejected(result) => {
                return Ok(Self::reject(transition_type, SignatureValid::NAME, result));
            }
        };

        let result = {
            let _timer = StageTimer::new(FeeValid::NAME);
            self.validate_fee(pipeline.transition(), context).await?
        };
        let pipeline = match pipeline.fee_checked(result) {
            StageOutcome::Passed(next) => next,
            StageOutcome::Rejected(result) => {
                return Ok(Self::reject(transition_type, FeeValid::NAME, result));
            }
        };

        let result = {
            let _timer = StageTimer::new(StateValid::NAME);
            self.validate_state(pipeline.transition(), context).await?
        };
        let valid = match pipeline.state_checked(result) {
            StageOutcome::Passed(valid) => valid,
            StageOutcome::Rejected(result) => {
                return Ok(Self::reject(transition_type, StateValid::NAME, result));
            }
        };

        STATE_TRANSITIONS_VALIDATED
            .with_label_values(&[transition_type.name()])
            .inc();
        if let Some(fee) = valid.fee() {
            FEE_CREDITS_CHARGED.inc_by(fee.desired_amount as f64);
        }
        debug!(
            desired_fee = valid.fee().map(|fee| fee.desired_amount),
            "State transition is valid"
        );
        Ok(StageOutcome::Passed(valid))
    }

    /// Write the effects of a fully validated transition.
    #[instrument(skip_all, fields(transition_type = %pipeline.transition().transition_type()))]
    pub async fn apply(
        &self,
        pipeline: Pipeline<StateValid>,
        context: &ExecutionContext,
    ) -> Result<Pipeline<Applied>, ProtocolError> {
        {
            let _timer = StageTimer::new(Applied::NAME);
            apply_state_transition(self.repository.as_ref(), pipeline.transition(), context)
                .await?;
        }

        let transition_type = pipeline.transition().transition_type();
        if !context.is_dry_run() {
            STATE_TRANSITIONS_APPLIED
                .with_label_values(&[transition_type.name()])
                .inc();
        }
        info!(
            transition_type = %transition_type,
            modified = pipeline.transition().modified_data_ids().len(),
            dry_run = context.is_dry_run(),
            "State transition applied"
        );
        Ok(pipeline.applied())
    }
}

#[async_trait]
impl StateTransitionApi for StateTransitionFacade {
    async fn validate(
        &self,
        state_transition: &StateTransition,
        context: &ExecutionContext,
    ) -> Result<ValidationResult, ProtocolError> {
        match self.run_validation(state_transition.clone(), context).await? {
            StageOutcome::Passed(_) => Ok(ValidationResult::valid()),
            StageOutcome::Rejected(result) => Ok(result),
        }
    }

    #[instrument(skip_all, fields(transition_type = %state_transition.transition_type(), stage = "basic"))]
    async fn validate_basic(
        &self,
        state_transition: &StateTransition,
        context: &ExecutionContext,
    ) -> Result<ValidationResult, ProtocolError> {
        validate_state_transition_basic(
            self.repository.as_ref(),
            self.crypto.as_ref(),
            self.schema_validator.as_ref(),
            &self.config,
            state_transition,
            context,
        )
        .await
    }

    #[instrument(skip_all, fields(transition_type = %state_transition.transition_type(), stage = "signature"))]
    async fn validate_signature(
        &self,
        state_transition: &StateTransition,
        context: &ExecutionContext,
    ) -> Result<ValidationResult, ProtocolError> {
        validate_state_transition_signature(
            self.repository.as_ref(),
            self.crypto.as_ref(),
            state_transition,
            context,
        )
        .await
    }

    #[instrument(skip_all, fields(transition_type = %state_transition.transition_type(), stage = "fee"))]
    async fn validate_fee(
        &self,
        state_transition: &StateTransition,
        context: &ExecutionContext,
    ) -> Result<ValidationResult<FeeResult>, ProtocolError> {
        validate_state_transition_fee(self.repository.as_ref(), state_transition, context).await
    }

    #[instrument(skip_all, fields(transition_type = %state_transition.transition_type(), stage = "state"))]
    async fn validate_state(
        &self,
        state_transition: &StateTransition,
        context: &ExecutionContext,
    ) -> Result<ValidationResult, ProtocolError> {
        validate_state_transition_state(
            self.repository.as_ref(),
            &self.triggers,
            &self.config,
            state_transition,
            context,
        )
        .await
    }

    async fn process(
        &self,
        state_transition: StateTransition,
        context: &ExecutionContext,
    ) -> Result<ValidationResult, ProtocolError> {
        match self.run_validation(state_transition, context).await? {
            StageOutcome::Passed(valid) => {
                self.apply(valid, context).await?;
                Ok(ValidationResult::valid())
            }
            StageOutcome::Rejected(result) => Ok(result),
        }
    }
}
