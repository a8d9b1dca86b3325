//! Documents batch state rules.
//!
//! | Action | Rule | Code |
//! |--------|------|------|
//! | create | document id not yet stored | 4004 |
//! | create | `$createdAt` equals `$updatedAt` | 4007 |
//! | create, replace | timestamps within the block time window | 4008 |
//! | replace, delete | document stored | 4005 |
//! | replace | revision is the stored revision + 1 | 4010 |
//! | replace, delete | batch owner owns the stored document | 4006 |
//! | create, replace | no stored document shares a unique index tuple | 4009 |
//!
//! Data triggers run once every transition passed these rules.

use super::{millis_as_i64, TimeWindow};
use crate::config::ProtocolConfig;
use crate::domain::{
    DocumentTransition, DocumentsBatchTransition, ExecutionContext, ValidationResult,
};
use crate::errors::{ProtocolError, StateError};
use crate::ports::{DocumentQuery, StateRepository};
use crate::triggers::{execute_data_triggers, DataTriggerExecutionContext, DataTriggerRegistry};
use crate::uniqueness::validate_documents_uniqueness_by_indices;
use shared_types::{DataContract, Document, Identifier, TimestampMillis};
use std::collections::BTreeMap;
use tracing::debug;

async fn fetch_stored_document(
    repository: &dyn StateRepository,
    transition: &DocumentTransition,
    context: &ExecutionContext,
) -> Result<Option<Document>, ProtocolError> {
    let query = DocumentQuery::new()
        .with_equal("$id", transition.id().to_json())
        .with_limit(1);
    let documents = repository
        .fetch_documents(
            &transition.data_contract_id(),
            transition.document_type(),
            &query,
            context,
        )
        .await?;
    Ok(documents.into_iter().next())
}

fn check_timestamp(
    result: &mut ValidationResult,
    transition: &DocumentTransition,
    name: &str,
    timestamp: Option<TimestampMillis>,
    window: &TimeWindow,
) {
    let Some(timestamp) = timestamp else {
        return;
    };
    if !window.contains(timestamp) {
        result.add_error(StateError::DocumentTimestampWindowViolation {
            timestamp_name: name.to_string(),
            document_id: transition.id(),
            timestamp: millis_as_i64(timestamp),
            time_window_start: millis_as_i64(window.start),
            time_window_end: millis_as_i64(window.end),
        });
    }
}

fn check_owner(
    result: &mut ValidationResult,
    transition: &DocumentTransition,
    owner_id: &Identifier,
    stored: &Document,
) {
    if stored.owner_id != *owner_id {
        result.add_error(StateError::DocumentOwnerIdMismatch {
            document_id: transition.id(),
            document_owner_id: *owner_id,
            existing_document_owner_id: stored.owner_id,
        });
    }
}

/// Rules of one transition against its stored document. `window` is `None`
/// in dry-run.
fn validate_transition(
    transition: &DocumentTransition,
    stored: Option<&Document>,
    owner_id: &Identifier,
    window: Option<&TimeWindow>,
) -> ValidationResult {
    let mut result = ValidationResult::valid();

    match transition {
        DocumentTransition::Create(create) => {
            if stored.is_some() {
                result.add_error(StateError::DocumentAlreadyPresent {
                    document_id: transition.id(),
                });
            }
            if let (Some(created_at), Some(updated_at)) = (create.created_at, create.updated_at) {
                if created_at != updated_at {
                    result.add_error(StateError::DocumentTimestampsMismatch {
                        document_id: transition.id(),
                    });
                }
            }
            if let Some(window) = window {
                check_timestamp(&mut result, transition, "createdAt", create.created_at, window);
                check_timestamp(&mut result, transition, "updatedAt", create.updated_at, window);
            }
        }
        DocumentTransition::Replace(replace) => {
            let Some(stored) = stored else {
                result.add_error(StateError::DocumentNotFound {
                    document_id: transition.id(),
                });
                return result;
            };
            if replace.revision != stored.revision + 1 {
                result.add_error(StateError::InvalidDocumentRevision {
                    document_id: transition.id(),
                    current_revision: stored.revision,
                });
            }
            check_owner(&mut result, transition, owner_id, stored);
            if let Some(window) = window {
                check_timestamp(&mut result, transition, "updatedAt", replace.updated_at, window);
            }
        }
        DocumentTransition::Delete(_) => {
            let Some(stored) = stored else {
                result.add_error(StateError::DocumentNotFound {
                    document_id: transition.id(),
                });
                return result;
            };
            check_owner(&mut result, transition, owner_id, stored);
        }
    }

    result
}

/// Validate every document transition against stored state, then run the
/// data triggers of each contract the batch touches.
pub async fn validate_documents_batch_state(
    repository: &dyn StateRepository,
    triggers: &DataTriggerRegistry,
    config: &ProtocolConfig,
    batch: &DocumentsBatchTransition,
    context: &ExecutionContext,
) -> Result<ValidationResult, ProtocolError> {
    let mut result = ValidationResult::valid();

    let mut by_contract: BTreeMap<Identifier, Vec<&DocumentTransition>> = BTreeMap::new();
    for transition in &batch.transitions {
        by_contract
            .entry(transition.data_contract_id())
            .or_default()
            .push(transition);
    }

    let window = if context.is_dry_run() {
        None
    } else {
        let block_time = repository.fetch_latest_platform_block_time(context).await?;
        Some(TimeWindow::around(block_time, config.block_time_window_ms))
    };

    let mut contracts: Vec<(DataContract, Vec<&DocumentTransition>)> = Vec::new();
    for (contract_id, transitions) in by_contract {
        let contract = repository
            .fetch_data_contract(&contract_id, context)
            .await?
            .ok_or(ProtocolError::DataContractNotPresent {
                data_contract_id: contract_id,
            })?;

        for transition in &transitions {
            let stored = fetch_stored_document(repository, transition, context).await?;
            result.merge(validate_transition(
                transition,
                stored.as_ref(),
                &batch.owner_id,
                window.as_ref(),
            ));
        }

        result.merge(
            validate_documents_uniqueness_by_indices(
                repository,
                &batch.owner_id,
                &transitions,
                &contract,
                context,
            )
            .await?,
        );
        contracts.push((contract, transitions));
    }

    if !result.is_valid() {
        debug!(
            owner_id = %batch.owner_id,
            errors = result.errors().len(),
            "Documents batch conflicts with stored state"
        );
        return Ok(result);
    }

    for (contract, transitions) in &contracts {
        let trigger_context = DataTriggerExecutionContext {
            repository,
            owner_id: &batch.owner_id,
            data_contract: contract,
            state_transition_execution_context: context,
        };
        result.merge(execute_data_triggers(triggers, transitions, &trigger_context).await?);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryStateRepository;
    use crate::domain::{
        DocumentCreateTransition, DocumentDeleteTransition, DocumentReplaceTransition,
        DocumentTransitionAction, DocumentTransitionBase,
    };
    use crate::triggers::{DataTrigger, DataTriggerKind};
    use serde_json::{json, Value as JsonValue};
    use shared_types::BlockInfo;

    const BLOCK_TIME: TimestampMillis = 1_000_000;

    fn owner() -> Identifier {
        Identifier::new([7; 32])
    }

    fn contract() -> DataContract {
        DataContract::new(
            owner(),
            [1; 32],
            1,
            BTreeMap::from([(
                "profile".to_string(),
                json!({
                    "type": "object",
                    "properties": {"username": {"type": "string", "maxLength": 63}},
                    "indices": [
                        {"name": "byUsername", "properties": [{"username": "asc"}], "unique": true}
                    ],
                    "additionalProperties": false
                }),
            )]),
            BTreeMap::new(),
        )
    }

    fn repository() -> (InMemoryStateRepository, DataContract) {
        let repository = InMemoryStateRepository::new().with_block_info(BlockInfo {
            height: 1,
            time_ms: BLOCK_TIME,
            core_chain_locked_height: 1,
            epoch: 0,
        });
        let contract = contract();
        repository.insert_data_contract(contract.clone());
        (repository, contract)
    }

    fn stored(id: Identifier, owner_id: Identifier, username: &str) -> Document {
        Document {
            id,
            owner_id,
            revision: 1,
            created_at: Some(BLOCK_TIME),
            updated_at: Some(BLOCK_TIME),
            data: json!({"username": username}),
        }
    }

    fn create(contract: &DataContract, entropy: u8, data: JsonValue) -> DocumentTransition {
        let mut create = DocumentCreateTransition::new(contract, &owner(), "profile", [entropy; 32], data);
        create.created_at = Some(BLOCK_TIME);
        create.updated_at = Some(BLOCK_TIME);
        DocumentTransition::Create(create)
    }

    fn batch(transitions: Vec<DocumentTransition>) -> DocumentsBatchTransition {
        DocumentsBatchTransition {
            protocol_version: 1,
            owner_id: owner(),
            transitions,
            signature_public_key_id: 0,
            signature: Vec::new(),
        }
    }

    async fn codes(
        repository: &InMemoryStateRepository,
        triggers: &DataTriggerRegistry,
        batch: &DocumentsBatchTransition,
        context: &ExecutionContext,
    ) -> Vec<u32> {
        validate_documents_batch_state(repository, triggers, &ProtocolConfig::default(), batch, context)
            .await
            .unwrap()
            .error_codes()
    }

    #[tokio::test]
    async fn test_create_rules() {
        let (repository, contract) = repository();
        let triggers = DataTriggerRegistry::default();
        let context = ExecutionContext::new();

        let fresh = create(&contract, 1, json!({"username": "alice"}));
        assert!(codes(&repository, &triggers, &batch(vec![fresh.clone()]), &context).await.is_empty());

        repository.insert_document(contract.id, "profile", stored(fresh.id(), owner(), "alice"));
        assert_eq!(
            codes(&repository, &triggers, &batch(vec![fresh]), &context).await,
            vec![4004]
        );

        let taken = create(&contract, 2, json!({"username": "alice"}));
        assert_eq!(
            codes(&repository, &triggers, &batch(vec![taken]), &context).await,
            vec![4009]
        );
    }

    #[tokio::test]
    async fn test_timestamps() {
        let (repository, contract) = repository();
        let triggers = DataTriggerRegistry::default();
        let mut transition = create(&contract, 1, json!({"username": "alice"}));
        if let DocumentTransition::Create(create) = &mut transition {
            create.created_at = Some(BLOCK_TIME + 10 * 60 * 1000);
        }
        let batch = batch(vec![transition]);

        assert_eq!(
            codes(&repository, &triggers, &batch, &ExecutionContext::new()).await,
            vec![4007, 4008]
        );
        // the window is not checked in dry-run
        assert_eq!(
            codes(&repository, &triggers, &batch, &ExecutionContext::dry_run()).await,
            vec![4007]
        );
    }

    #[tokio::test]
    async fn test_replace_rules() {
        let (repository, contract) = repository();
        let triggers = DataTriggerRegistry::default();
        let context = ExecutionContext::new();
        let document = stored(Identifier::new([3; 32]), owner(), "alice");
        repository.insert_document(contract.id, "profile", document.clone());

        let next = DocumentReplaceTransition::new(&contract, "profile", &document, json!({"username": "alicia"}));
        assert!(codes(&repository, &triggers, &batch(vec![DocumentTransition::Replace(next.clone())]), &context)
            .await
            .is_empty());

        let mut stale = next.clone();
        stale.revision = 5;
        assert_eq!(
            codes(&repository, &triggers, &batch(vec![DocumentTransition::Replace(stale)]), &context).await,
            vec![4010]
        );

        let mut missing = next;
        missing.base.id = Identifier::new([4; 32]);
        assert_eq!(
            codes(&repository, &triggers, &batch(vec![DocumentTransition::Replace(missing)]), &context).await,
            vec![4005]
        );
    }

    #[tokio::test]
    async fn test_delete_of_foreign_document() {
        let (repository, contract) = repository();
        let document = stored(Identifier::new([3; 32]), Identifier::new([8; 32]), "bob");
        repository.insert_document(contract.id, "profile", document.clone());

        let delete = DocumentTransition::Delete(DocumentDeleteTransition {
            base: DocumentTransitionBase {
                id: document.id,
                document_type: "profile".to_string(),
                data_contract_id: contract.id,
            },
        });
        assert_eq!(
            codes(&repository, &DataTriggerRegistry::default(), &batch(vec![delete]), &ExecutionContext::new()).await,
            vec![4006]
        );
    }

    #[tokio::test]
    async fn test_triggers_run_after_state_rules() {
        let (repository, contract) = repository();
        let triggers = DataTriggerRegistry::new(vec![DataTrigger::new(
            contract.id,
            Some("profile"),
            DocumentTransitionAction::Create,
            DataTriggerKind::Reject,
        )]);
        let transition = create(&contract, 1, json!({"username": "alice"}));
        assert_eq!(
            codes(&repository, &triggers, &batch(vec![transition]), &ExecutionContext::new()).await,
            vec![4001]
        );
    }

    #[tokio::test]
    async fn test_unknown_contract_is_not_consensus() {
        let repository = InMemoryStateRepository::new();
        let transition = create(&contract(), 1, json!({"username": "alice"}));
        let error = validate_documents_batch_state(
            &repository,
            &DataTriggerRegistry::default(),
            &ProtocolConfig::default(),
            &batch(vec![transition]),
            &ExecutionContext::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(error, ProtocolError::DataContractNotPresent { .. }));
    }
}
