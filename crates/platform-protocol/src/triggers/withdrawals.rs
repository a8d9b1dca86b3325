//! Withdrawal document rules.

use super::{
    condition_error, DataTriggerError, DataTriggerExecutionContext, DataTriggerExecutionResult,
    DataTriggerOutcome,
};
use crate::domain::DocumentTransition;
use crate::ports::DocumentQuery;

pub const WITHDRAWAL_DOCUMENT: &str = "withdrawal";

/// Lifecycle of a withdrawal document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WithdrawalStatus {
    Queued = 0,
    Pooled = 1,
    Broadcasted = 2,
    Complete = 3,
    Expired = 4,
}

impl TryFrom<u64> for WithdrawalStatus {
    type Error = u64;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Queued),
            1 => Ok(Self::Pooled),
            2 => Ok(Self::Broadcasted),
            3 => Ok(Self::Complete),
            4 => Ok(Self::Expired),
            other => Err(other),
        }
    }
}

/// Only finished withdrawals may be deleted.
pub async fn delete_withdrawal_data_trigger(
    transition: &DocumentTransition,
    context: &DataTriggerExecutionContext<'_>,
) -> DataTriggerOutcome {
    let mut result = DataTriggerExecutionResult::new();

    let query = DocumentQuery::new()
        .with_equal("$id", transition.id().to_json())
        .with_limit(1);
    let documents = context
        .repository
        .fetch_documents(
            &context.data_contract.id,
            WITHDRAWAL_DOCUMENT,
            &query,
            context.state_transition_execution_context,
        )
        .await?;

    let Some(withdrawal) = documents.first() else {
        result.add_error(condition_error(
            context,
            transition,
            "Withdrawal document was not found",
        ));
        return Ok(result);
    };

    let status = withdrawal
        .get("status")
        .and_then(|value| value.as_u64())
        .ok_or_else(|| DataTriggerError::Execution("property 'status' doesn't exist".to_string()))?;
    let status = WithdrawalStatus::try_from(status)
        .map_err(|value| DataTriggerError::Execution(format!("unknown withdrawal status {value}")))?;

    if !matches!(status, WithdrawalStatus::Complete | WithdrawalStatus::Expired) {
        result.add_error(condition_error(
            context,
            transition,
            "withdrawal deletion is allowed only for COMPLETE and EXPIRED statuses",
        ));
    }

    Ok(result)
}
