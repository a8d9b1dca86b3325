//! Contact request rules.

use super::{
    condition_error, get_identifier, get_optional_u64, DataTriggerExecutionContext,
    DataTriggerExecutionResult, DataTriggerOutcome,
};
use crate::domain::DocumentTransition;

pub const CONTACT_REQUEST_DOCUMENT: &str = "contactRequest";

/// Core blocks `coreHeightCreatedAt` may differ from the locked height.
pub const BLOCKS_SIZE_WINDOW: u64 = 8;

/// A contact request names an existing identity other than its sender, and
/// was created near the current core chain locked height.
pub async fn create_contact_request_data_trigger(
    transition: &DocumentTransition,
    context: &DataTriggerExecutionContext<'_>,
) -> DataTriggerOutcome {
    let mut result = DataTriggerExecutionResult::new();
    let is_dry_run = context.is_dry_run();

    let to_user_id = get_identifier(transition, "toUserId")?;
    let core_height_created_at = get_optional_u64(transition, "coreHeightCreatedAt")?;

    if !is_dry_run {
        if to_user_id == *context.owner_id {
            result.add_error(condition_error(
                context,
                transition,
                format!("Identity {to_user_id} must not be equal to owner id"),
            ));
            return Ok(result);
        }

        if let Some(core_height_created_at) = core_height_created_at {
            let core_chain_locked_height = u64::from(
                context
                    .repository
                    .fetch_latest_platform_core_chain_locked_height(
                        context.state_transition_execution_context,
                    )
                    .await?,
            );
            let window_start = core_chain_locked_height.saturating_sub(BLOCKS_SIZE_WINDOW);
            let window_end = core_chain_locked_height.saturating_add(BLOCKS_SIZE_WINDOW);

            if !(window_start..=window_end).contains(&core_height_created_at) {
                result.add_error(condition_error(
                    context,
                    transition,
                    format!(
                        "Core height {core_height_created_at} is out of block height window from {window_start} to {window_end}"
                    ),
                ));
                return Ok(result);
            }
        }
    }

    let identity = context
        .repository
        .fetch_identity(&to_user_id, context.state_transition_execution_context)
        .await?;

    if !is_dry_run && identity.is_none() {
        result.add_error(condition_error(
            context,
            transition,
            format!("Identity {to_user_id} doesn't exist"),
        ));
    }

    Ok(result)
}
