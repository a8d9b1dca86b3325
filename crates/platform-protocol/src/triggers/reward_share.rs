//! Masternode reward share rules.
//!
//! A masternode may share its rewards with at most
//! [`MAX_REWARD_SHARE_DOCUMENTS`] identities, and the shares may not add up
//! to more than [`MAX_REWARD_SHARE_PERCENTAGE`] basis points.

use super::{
    condition_error, get_identifier, get_u64, DataTriggerExecutionContext,
    DataTriggerExecutionResult, DataTriggerOutcome,
};
use crate::domain::DocumentTransition;
use crate::ports::DocumentQuery;

pub const REWARD_SHARE_DOCUMENT: &str = "rewardShare";

/// 100% in basis points.
pub const MAX_REWARD_SHARE_PERCENTAGE: u64 = 10_000;
pub const MAX_REWARD_SHARE_DOCUMENTS: usize = 16;

pub async fn create_masternode_reward_shares_data_trigger(
    transition: &DocumentTransition,
    context: &DataTriggerExecutionContext<'_>,
) -> DataTriggerOutcome {
    let mut result = DataTriggerExecutionResult::new();
    let is_dry_run = context.is_dry_run();
    let owner_id = context.owner_id;
    let execution_context = context.state_transition_execution_context;

    let pay_to_id = get_identifier(transition, "payToId")?;
    let percentage = get_u64(transition, "percentage")?;

    if !is_dry_run {
        let is_masternode = context
            .repository
            .is_in_the_valid_master_nodes_list(owner_id, execution_context)
            .await?;
        if !is_masternode {
            result.add_error(condition_error(
                context,
                transition,
                "Only masternode identities can share rewards",
            ));
            return Ok(result);
        }
    }

    let identity = context
        .repository
        .fetch_identity(&pay_to_id, execution_context)
        .await?;
    if !is_dry_run && identity.is_none() {
        result.add_error(condition_error(
            context,
            transition,
            format!("Identity '{pay_to_id}' doesn't exist"),
        ));
        return Ok(result);
    }

    let query = DocumentQuery::new()
        .with_equal("$ownerId", owner_id.to_json())
        .with_limit(MAX_REWARD_SHARE_DOCUMENTS + 1);
    let documents = context
        .repository
        .fetch_documents(
            &context.data_contract.id,
            REWARD_SHARE_DOCUMENT,
            &query,
            execution_context,
        )
        .await?;

    if is_dry_run {
        return Ok(result);
    }

    if documents.len() >= MAX_REWARD_SHARE_DOCUMENTS {
        result.add_error(condition_error(
            context,
            transition,
            format!("Reward shares cannot contain more than {MAX_REWARD_SHARE_DOCUMENTS} identities"),
        ));
        return Ok(result);
    }

    // A replaced share no longer counts at its stored percentage.
    let existing: u64 = documents
        .iter()
        .filter(|document| document.id != transition.id())
        .filter_map(|document| document.get("percentage").and_then(|value| value.as_u64()))
        .sum();

    if existing.saturating_add(percentage) > MAX_REWARD_SHARE_PERCENTAGE {
        result.add_error(condition_error(
            context,
            transition,
            format!("Percentage can not be more than {MAX_REWARD_SHARE_PERCENTAGE}"),
        ));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DocumentCreateTransition, DocumentReplaceTransition};
    use crate::triggers::fixtures::TriggerFixture;
    use serde_json::{json, Value as JsonValue};
    use shared_types::{Document, Identifier, Identity};

    fn owner() -> Identifier {
        Identifier::new([1; 32])
    }

    fn pay_to() -> Identifier {
        Identifier::new([2; 32])
    }

    fn fixture() -> TriggerFixture {
        let fixture = TriggerFixture::new(owner());
        fixture.repository.insert_masternode(owner());
        fixture.repository.insert_identity(Identity {
            id: pay_to(),
            protocol_version: 1,
            public_keys: Vec::new(),
            balance: 0,
            revision: 0,
            metadata: None,
        });
        fixture
    }

    fn share(id: u8, percentage: u64) -> Document {
        Document {
            id: Identifier::new([id; 32]),
            owner_id: owner(),
            revision: 1,
            created_at: None,
            updated_at: None,
            data: json!({"payToId": pay_to().to_json(), "percentage": percentage}),
        }
    }

    fn create(fixture: &TriggerFixture, data: JsonValue) -> DocumentTransition {
        DocumentTransition::Create(DocumentCreateTransition::new(
            &fixture.data_contract,
            &fixture.owner_id,
            REWARD_SHARE_DOCUMENT,
            [9; 32],
            data,
        ))
    }

    async fn messages(fixture: &TriggerFixture, transition: &DocumentTransition) -> Vec<String> {
        create_masternode_reward_shares_data_trigger(transition, &fixture.context())
            .await
            .unwrap()
            .errors()
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_valid_share() {
        let fixture = fixture();
        let transition = create(&fixture, json!({"payToId": pay_to().to_json(), "percentage": 500}));
        assert!(messages(&fixture, &transition).await.is_empty());
    }

    #[tokio::test]
    async fn test_only_masternodes_share() {
        let fixture = TriggerFixture::new(owner());
        let transition = create(&fixture, json!({"payToId": pay_to().to_json(), "percentage": 500}));
        assert_eq!(
            messages(&fixture, &transition).await,
            vec!["Only masternode identities can share rewards".to_string()]
        );
    }

    #[tokio::test]
    async fn test_recipient_must_exist() {
        let fixture = fixture();
        let stranger = Identifier::new([3; 32]);
        let transition = create(&fixture, json!({"payToId": stranger.to_json(), "percentage": 1}));
        assert_eq!(
            messages(&fixture, &transition).await,
            vec![format!("Identity '{stranger}' doesn't exist")]
        );
    }

    #[tokio::test]
    async fn test_share_count_limit() {
        let fixture = fixture();
        for id in 0..MAX_REWARD_SHARE_DOCUMENTS as u8 {
            fixture
                .repository
                .insert_document(fixture.data_contract.id, REWARD_SHARE_DOCUMENT, share(100 + id, 1));
        }
        let transition = create(&fixture, json!({"payToId": pay_to().to_json(), "percentage": 1}));
        assert_eq!(
            messages(&fixture, &transition).await,
            vec!["Reward shares cannot contain more than 16 identities".to_string()]
        );
    }

    #[tokio::test]
    async fn test_percentage_sum_limit() {
        let fixture = fixture();
        let stored = share(50, 6_000);
        fixture
            .repository
            .insert_document(fixture.data_contract.id, REWARD_SHARE_DOCUMENT, stored.clone());

        let transition = create(&fixture, json!({"payToId": pay_to().to_json(), "percentage": 4_001}));
        assert_eq!(
            messages(&fixture, &transition).await,
            vec!["Percentage can not be more than 10000".to_string()]
        );

        // replacing the stored share does not count it twice
        let replace = DocumentTransition::Replace(DocumentReplaceTransition::new(
            &fixture.data_contract,
            REWARD_SHARE_DOCUMENT,
            &stored,
            json!({"payToId": pay_to().to_json(), "percentage": 9_000}),
        ));
        assert!(messages(&fixture, &replace).await.is_empty());
    }
}
