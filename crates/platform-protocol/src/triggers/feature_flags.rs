//! Feature flag rules.

use super::{
    condition_error, get_u64, DataTriggerExecutionContext, DataTriggerExecutionResult,
    DataTriggerOutcome,
};
use crate::domain::DocumentTransition;
use shared_types::Identifier;

/// Only the top-level identity creates flags, and never for a past height.
pub async fn create_feature_flag_data_trigger(
    transition: &DocumentTransition,
    context: &DataTriggerExecutionContext<'_>,
    top_level_identity: Option<&Identifier>,
) -> DataTriggerOutcome {
    let mut result = DataTriggerExecutionResult::new();

    let enable_at_height = get_u64(transition, "enableAtHeight")?;
    let block_height = context
        .repository
        .fetch_latest_platform_block_height(context.state_transition_execution_context)
        .await?;

    if context.is_dry_run() {
        return Ok(result);
    }

    if enable_at_height < block_height {
        result.add_error(condition_error(
            context,
            transition,
            "Feature flag cannot be enabled in the past",
        ));
        return Ok(result);
    }

    if top_level_identity != Some(context.owner_id) {
        result.add_error(condition_error(
            context,
            transition,
            "This identity can't activate selected feature flag",
        ));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DocumentCreateTransition;
    use crate::triggers::fixtures::TriggerFixture;
    use serde_json::json;
    use shared_types::BlockInfo;

    fn owner() -> Identifier {
        Identifier::new([1; 32])
    }

    async fn messages(enable_at_height: u64, top_level_identity: Identifier) -> Vec<String> {
        let fixture = TriggerFixture::new(owner());
        fixture.repository.set_block_info(BlockInfo {
            height: 42,
            ..BlockInfo::default()
        });
        let transition = DocumentTransition::Create(DocumentCreateTransition::new(
            &fixture.data_contract,
            &fixture.owner_id,
            "updateConsensusParams",
            [1; 32],
            json!({"enableAtHeight": enable_at_height}),
        ));
        create_feature_flag_data_trigger(&transition, &fixture.context(), Some(&top_level_identity))
            .await
            .unwrap()
            .errors()
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_top_level_identity_enables_future_flag() {
        assert!(messages(42, owner()).await.is_empty());
    }

    #[tokio::test]
    async fn test_past_height_rejected() {
        assert_eq!(
            messages(41, owner()).await,
            vec!["Feature flag cannot be enabled in the past".to_string()]
        );
    }

    #[tokio::test]
    async fn test_other_identity_rejected() {
        assert_eq!(
            messages(50, Identifier::new([2; 32])).await,
            vec!["This identity can't activate selected feature flag".to_string()]
        );
    }
}
