//! # Fee Calculator
//!
//! Sums operation costs into a fee. Pure functions: the same operation list
//! always yields the same result, whatever the order of its refunds.
//!
//! ## Amounts
//!
//! - `required_amount = storage_fee - owner_refunds + tip`
//! - `desired_amount = storage_fee + processing_fee - owner_refunds + tip`
//!
//! Subtractions saturate at zero.

use super::costs::DEFAULT_USER_TIP;
use crate::domain::{ExecutionContext, Operation, Refunds, StateTransition};
use serde::{Deserialize, Serialize};
use shared_types::{Credits, EpochIndex, Identifier};
use std::collections::BTreeMap;

/// Summed costs of an operation list, before owner-specific amounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DummyFeesResult {
    pub storage_fee: Credits,
    pub processing_fee: Credits,
    /// Refunds merged per identity, sorted by identifier.
    pub fee_refunds: Vec<Refunds>,
}

/// Fee of a state transition for its owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeResult {
    pub storage_fee: Credits,
    pub processing_fee: Credits,
    pub fee_refunds: Vec<Refunds>,
    /// Refunds owed to the owner.
    pub total_refunds: Credits,
    /// Minimum the owner must be able to pay.
    pub required_amount: Credits,
    /// Amount the owner is charged.
    pub desired_amount: Credits,
}

/// Sum storage and processing costs and merge refunds per (identity, epoch).
pub fn calculate_operation_fees(operations: &[Operation]) -> DummyFeesResult {
    let mut storage_fee: Credits = 0;
    let mut processing_fee: Credits = 0;
    let mut merged: BTreeMap<Identifier, BTreeMap<EpochIndex, Credits>> = BTreeMap::new();

    for operation in operations {
        storage_fee = storage_fee.saturating_add(operation.storage_cost());
        processing_fee = processing_fee.saturating_add(operation.processing_cost());

        for refund in operation.refunds() {
            let per_epoch = merged.entry(refund.identifier).or_default();
            for (epoch, credits) in &refund.credits_per_epoch {
                let entry = per_epoch.entry(*epoch).or_default();
                *entry = entry.saturating_add(*credits);
            }
        }
    }

    DummyFeesResult {
        storage_fee,
        processing_fee,
        fee_refunds: merged
            .into_iter()
            .map(|(identifier, credits_per_epoch)| Refunds {
                identifier,
                credits_per_epoch,
            })
            .collect(),
    }
}

/// Fee of `operations` for `owner_id`.
pub fn calculate_state_transition_fee_from_operations(
    operations: &[Operation],
    owner_id: &Identifier,
) -> FeeResult {
    let DummyFeesResult {
        storage_fee,
        processing_fee,
        fee_refunds,
    } = calculate_operation_fees(operations);

    let total_refunds = fee_refunds
        .iter()
        .filter(|refunds| refunds.identifier == *owner_id)
        .map(Refunds::total)
        .fold(0, Credits::saturating_add);

    let required_amount = storage_fee
        .saturating_sub(total_refunds)
        .saturating_add(DEFAULT_USER_TIP);
    let desired_amount = storage_fee
        .saturating_add(processing_fee)
        .saturating_sub(total_refunds)
        .saturating_add(DEFAULT_USER_TIP);

    FeeResult {
        storage_fee,
        processing_fee,
        fee_refunds,
        total_refunds,
        required_amount,
        desired_amount,
    }
}

/// Fee of everything recorded so far in `context`, both ledgers included.
pub fn calculate_state_transition_fee(
    state_transition: &StateTransition,
    context: &ExecutionContext,
) -> FeeResult {
    let mut operations = context.operations();
    operations.extend(context.dry_operations());
    calculate_state_transition_fee_from_operations(&operations, &state_transition.owner_id())
}
