//! # Validation Result
//!
//! Accumulator of consensus errors with an optional success payload.
//! Empty error list means valid.

use crate::errors::ConsensusError;
use serde::{Deserialize, Serialize};

/// Outcome of one validation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult<T = ()> {
    errors: Vec<ConsensusError>,
    data: Option<T>,
}

impl<T> Default for ValidationResult<T> {
    fn default() -> Self {
        Self {
            errors: Vec::new(),
            data: None,
        }
    }
}

impl<T> ValidationResult<T> {
    /// A valid result with no payload.
    pub fn valid() -> Self {
        Self::default()
    }

    /// A valid result carrying `data`.
    pub fn valid_with_data(data: T) -> Self {
        Self {
            errors: Vec::new(),
            data: Some(data),
        }
    }

    /// A result with one error.
    pub fn invalid(error: impl Into<ConsensusError>) -> Self {
        Self {
            errors: vec![error.into()],
            data: None,
        }
    }

    /// A result holding `errors`, order preserved.
    pub fn new_with_errors(errors: Vec<ConsensusError>) -> Self {
        Self { errors, data: None }
    }

    pub fn add_error(&mut self, error: impl Into<ConsensusError>) {
        self.errors.push(error.into());
    }

    pub fn add_errors(&mut self, errors: impl IntoIterator<Item = ConsensusError>) {
        self.errors.extend(errors);
    }

    /// Append another result's errors. Its payload is dropped.
    pub fn merge<U>(&mut self, other: ValidationResult<U>) {
        self.errors.extend(other.errors);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ConsensusError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ConsensusError> {
        self.errors
    }

    pub fn first_error(&self) -> Option<&ConsensusError> {
        self.errors.first()
    }

    /// Numeric codes of all errors, in order.
    pub fn error_codes(&self) -> Vec<u32> {
        self.errors.iter().map(ConsensusError::code).collect()
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn set_data(&mut self, data: T) {
        self.data = Some(data);
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }

    /// Same errors, payload replaced.
    pub fn with_data<U>(self, data: U) -> ValidationResult<U> {
        ValidationResult {
            errors: self.errors,
            data: Some(data),
        }
    }

    /// Same errors, payload dropped.
    pub fn without_data(self) -> ValidationResult {
        ValidationResult {
            errors: self.errors,
            data: None,
        }
    }
}

impl<T> From<ConsensusError> for ValidationResult<T> {
    fn from(error: ConsensusError) -> Self {
        Self::invalid(error)
    }
}

impl<T> From<Vec<ConsensusError>> for ValidationResult<T> {
    fn from(errors: Vec<ConsensusError>) -> Self {
        Self::new_with_errors(errors)
    }
}
