//! # Type-State Validation Pipeline
//!
//! Each pipeline stage is a distinct type. Stage transitions consume the
//! transition and return it at the next stage, so `apply` can only be
//! reached through every validation stage in order:
//!
//! ```text
//! [Decoded] ─basic─→ [BasicValid] ─signature─→ [SignatureValid]
//!     ─fee─→ [FeeValid] ─state─→ [StateValid] ─apply─→ [Applied]
//! ```
//!
//! A failing stage yields [`StageOutcome::Rejected`] and the transition is
//! dropped with it.

use super::state_transition::StateTransition;
use super::validation::ValidationResult;
use crate::fees::FeeResult;
use std::marker::PhantomData;

// =============================================================================
// STAGE MARKERS (Zero-Sized Types)
// =============================================================================

mod sealed {
    pub trait Sealed {}
}

/// A pipeline stage.
pub trait Stage: sealed::Sealed {
    /// Metric label of the stage.
    const NAME: &'static str;
}

macro_rules! stage {
    ($($(#[$doc:meta])* $name:ident => $label:literal),* $(,)?) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy)]
            pub struct $name;

            impl sealed::Sealed for $name {}

            impl Stage for $name {
                const NAME: &'static str = $label;
            }
        )*
    };
}

stage!(
    /// Marker: decoded, nothing checked yet.
    Decoded => "decoded",
    /// Marker: structurally valid.
    BasicValid => "basic",
    /// Marker: signed by an authorized key.
    SignatureValid => "signature",
    /// Marker: the owner can pay.
    FeeValid => "fee",
    /// Marker: consistent with platform state.
    StateValid => "state",
    /// Marker: effects written to the state repository.
    Applied => "apply",
);

// =============================================================================
// TYPE-STATE TRANSITION
// =============================================================================

/// A state transition at pipeline stage `S`.
#[derive(Debug)]
#[must_use]
pub struct Pipeline<S: Stage> {
    transition: StateTransition,
    fee: Option<FeeResult>,
    _stage: PhantomData<S>,
}

impl Pipeline<Decoded> {
    /// The only entry point into the pipeline.
    pub fn new(transition: StateTransition) -> Self {
        Self {
            transition,
            fee: None,
            _stage: PhantomData,
        }
    }
}

impl<S: Stage> Pipeline<S> {
    pub fn transition(&self) -> &StateTransition {
        &self.transition
    }

    pub fn into_transition(self) -> StateTransition {
        self.transition
    }

    /// Fee computed by the fee stage, once passed.
    pub fn fee(&self) -> Option<&FeeResult> {
        self.fee.as_ref()
    }

    pub fn stage(&self) -> &'static str {
        S::NAME
    }

    fn advance<T: Stage>(self) -> Pipeline<T> {
        Pipeline {
            transition: self.transition,
            fee: self.fee,
            _stage: PhantomData,
        }
    }

    /// Advance when `result` is valid, otherwise reject with it.
    fn gate<T: Stage, D>(self, result: ValidationResult<D>) -> StageOutcome<T> {
        if result.is_valid() {
            StageOutcome::Passed(self.advance())
        } else {
            StageOutcome::Rejected(result.without_data())
        }
    }
}

impl Pipeline<Decoded> {
    pub fn basic_checked(self, result: ValidationResult) -> StageOutcome<BasicValid> {
        self.gate(result)
    }
}

impl Pipeline<BasicValid> {
    pub fn signature_checked(self, result: ValidationResult) -> StageOutcome<SignatureValid> {
        self.gate(result)
    }
}

impl Pipeline<SignatureValid> {
    /// Keeps the computed fee on success.
    pub fn fee_checked(self, result: ValidationResult<FeeResult>) -> StageOutcome<FeeValid> {
        if !result.is_valid() {
            return StageOutcome::Rejected(result.without_data());
        }
        let fee = result.into_data();
        let mut next: Pipeline<FeeValid> = self.advance();
        next.fee = fee;
        StageOutcome::Passed(next)
    }
}

impl Pipeline<FeeValid> {
    pub fn state_checked(self, result: ValidationResult) -> StageOutcome<StateValid> {
        self.gate(result)
    }
}

impl Pipeline<StateValid> {
    /// Record that the effects were written.
    pub fn applied(self) -> Pipeline<Applied> {
        self.advance()
    }
}

/// Result of running one stage.
#[derive(Debug)]
pub enum StageOutcome<S: Stage> {
    Passed(Pipeline<S>),
    Rejected(ValidationResult),
}

impl<S: Stage> StageOutcome<S> {
    pub fn is_passed(&self) -> bool {
        matches!(self, StageOutcome::Passed(_))
    }
}
