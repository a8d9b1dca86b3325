//! Forbids an action outright.

use super::{condition_error, DataTriggerExecutionContext, DataTriggerExecutionResult};
use crate::domain::DocumentTransition;

pub fn reject_data_trigger(
    transition: &DocumentTransition,
    context: &DataTriggerExecutionContext<'_>,
) -> DataTriggerExecutionResult {
    let mut result = DataTriggerExecutionResult::new();
    result.add_error(condition_error(
        context,
        transition,
        format!("Action {} is not allowed", transition.action()),
    ));
    result
}
