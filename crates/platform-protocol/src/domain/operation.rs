//! # Operations
//!
//! Billable units of work recorded in an [`ExecutionContext`](super::ExecutionContext).

use crate::fees::costs;
use serde::{Deserialize, Serialize};
use shared_types::{Credits, EpochIndex, Identifier, KeyType};
use std::collections::BTreeMap;

/// Credits returned to an identity, per epoch in which they were paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Refunds {
    pub identifier: Identifier,
    pub credits_per_epoch: BTreeMap<EpochIndex, Credits>,
}

impl Refunds {
    pub fn new(identifier: Identifier, epoch: EpochIndex, credits: Credits) -> Self {
        Self {
            identifier,
            credits_per_epoch: BTreeMap::from([(epoch, credits)]),
        }
    }

    pub fn total(&self) -> Credits {
        self.credits_per_epoch
            .values()
            .fold(0, |total, credits| total.saturating_add(*credits))
    }
}

/// A unit of billable work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    /// Costs computed by the state repository for a write or delete.
    PreCalculated {
        storage_cost: Credits,
        processing_cost: Credits,
        refunds: Vec<Refunds>,
    },
    /// A read of `value_size` bytes.
    Read { value_size: u64 },
    /// One signature verification.
    SignatureVerification { signature_type: KeyType },
}

impl Operation {
    /// Cost of a write of `size` bytes.
    pub fn write(size: u64) -> Self {
        Operation::PreCalculated {
            storage_cost: size.saturating_mul(costs::STORAGE_CREDIT_PER_BYTE),
            processing_cost: costs::WRITE_BASE_PROCESSING_COST
                .saturating_add(size.saturating_mul(costs::PROCESSING_CREDIT_PER_BYTE)),
            refunds: Vec::new(),
        }
    }

    /// Cost of removing `size` bytes, refunding their storage to `owner`.
    pub fn delete(size: u64, owner: Identifier, epoch: EpochIndex) -> Self {
        Operation::PreCalculated {
            storage_cost: 0,
            processing_cost: costs::DELETE_BASE_PROCESSING_COST,
            refunds: vec![Refunds::new(
                owner,
                epoch,
                size.saturating_mul(costs::STORAGE_CREDIT_PER_BYTE),
            )],
        }
    }

    pub fn storage_cost(&self) -> Credits {
        match self {
            Operation::PreCalculated { storage_cost, .. } => *storage_cost,
            Operation::Read { .. } | Operation::SignatureVerification { .. } => 0,
        }
    }

    pub fn processing_cost(&self) -> Credits {
        match self {
            Operation::PreCalculated {
                processing_cost, ..
            } => *processing_cost,
            Operation::Read { value_size } => costs::READ_BASE_PROCESSING_COST
                .saturating_add(value_size.saturating_mul(costs::PROCESSING_CREDIT_PER_BYTE)),
            Operation::SignatureVerification { signature_type } => {
                costs::signature_verification_cost(*signature_type)
            }
        }
    }

    pub fn refunds(&self) -> &[Refunds] {
        match self {
            Operation::PreCalculated { refunds, .. } => refunds,
            Operation::Read { .. } | Operation::SignatureVerification { .. } => &[],
        }
    }
}
