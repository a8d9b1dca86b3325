//! Fee stage: can the paying identity afford the transition?

use super::{calculate_state_transition_fee, FeeResult};
use crate::apply::{apply_state_transition, fetch_asset_lock_credits};
use crate::domain::{ExecutionContext, StateTransition, ValidationResult};
use crate::errors::{FeeError, ProtocolError};
use crate::ports::StateRepository;
use shared_types::Credits;
use tracing::debug;

/// Credits available to pay for `state_transition`.
async fn fetch_paying_balance(
    repository: &dyn StateRepository,
    state_transition: &StateTransition,
    context: &ExecutionContext,
) -> Result<Credits, ProtocolError> {
    match state_transition {
        StateTransition::IdentityCreate(t) => {
            fetch_asset_lock_credits(repository, &t.asset_lock_proof, context).await
        }
        StateTransition::IdentityTopUp(t) => {
            let locked = fetch_asset_lock_credits(repository, &t.asset_lock_proof, context).await?;
            let balance = repository
                .fetch_identity_balance(&t.identity_id, context)
                .await?
                .unwrap_or(0);
            Ok(locked.saturating_add(balance))
        }
        _ => {
            let owner_id = state_transition.owner_id();
            repository
                .fetch_identity_balance(&owner_id, context)
                .await?
                .ok_or(ProtocolError::IdentityNotPresent {
                    identity_id: owner_id,
                })
        }
    }
}

/// Cost `state_transition` by applying it in a scratch dry-run context and
/// compare the fee with the paying balance.
///
/// The scratch operations are copied into `context`, so the returned fee
/// also covers reads and signature checks recorded by earlier stages. When
/// `context` itself is in dry-run mode the fee is computed but never
/// rejected.
pub async fn validate_state_transition_fee(
    repository: &dyn StateRepository,
    state_transition: &StateTransition,
    context: &ExecutionContext,
) -> Result<ValidationResult<FeeResult>, ProtocolError> {
    let balance = fetch_paying_balance(repository, state_transition, context).await?;

    let scratch = ExecutionContext::dry_run();
    apply_state_transition(repository, state_transition, &scratch).await?;
    context.add_operations(scratch.dry_operations());

    let fee = calculate_state_transition_fee(state_transition, context);

    if context.is_dry_run() {
        return Ok(ValidationResult::valid_with_data(fee));
    }

    if balance < fee.desired_amount {
        debug!(
            balance,
            desired_amount = fee.desired_amount,
            "Balance does not cover the fee"
        );
        return Ok(ValidationResult::invalid(FeeError::BalanceIsNotEnough {
            balance,
            fee: fee.desired_amount,
        }));
    }

    Ok(ValidationResult::valid_with_data(fee))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryStateRepository;
    use crate::domain::{
        DocumentCreateTransition, DocumentTransition, DocumentsBatchTransition,
        IdentityCreateTransition, IdentityTopUpTransition,
    };
    use crate::ports::TransactionData;
    use serde_json::json;
    use shared_types::{
        AssetLockProof, BlockInfo, ChainAssetLockProof, CoreTransaction, DataContract,
        Identifier, Identity, OutPoint, TxOut, ASSET_LOCK_TRANSACTION_TYPE,
    };
    use std::collections::BTreeMap;

    fn owner() -> Identifier {
        Identifier::new([1; 32])
    }

    fn repository_with_balance(balance: Option<Credits>) -> InMemoryStateRepository {
        let repository = InMemoryStateRepository::new().with_block_info(BlockInfo {
            height: 1,
            time_ms: 1_000,
            core_chain_locked_height: 10,
            epoch: 0,
        });
        if let Some(balance) = balance {
            repository.insert_identity(Identity {
                id: owner(),
                protocol_version: 1,
                public_keys: Vec::new(),
                balance,
                revision: 0,
                metadata: None,
            });
        }
        repository
    }

    fn note_batch() -> StateTransition {
        let contract = DataContract::new(
            owner(),
            [2; 32],
            1,
            BTreeMap::from([("note".to_string(), json!({"type": "object"}))]),
            BTreeMap::new(),
        );
        StateTransition::DocumentsBatch(DocumentsBatchTransition {
            protocol_version: 1,
            owner_id: owner(),
            transitions: vec![DocumentTransition::Create(DocumentCreateTransition::new(
                &contract,
                &owner(),
                "note",
                [3; 32],
                json!({"text": "hello"}),
            ))],
            signature_public_key_id: 0,
            signature: Vec::new(),
        })
    }

    fn funded(repository: &InMemoryStateRepository, duffs: u64) -> AssetLockProof {
        let transaction = CoreTransaction {
            version: 3,
            tx_type: ASSET_LOCK_TRANSACTION_TYPE,
            inputs: vec![OutPoint::new([4; 32], 0)],
            outputs: vec![TxOut::op_return(duffs, &[7; 20])],
            lock_time: 0,
        };
        let out_point = OutPoint::new(transaction.txid(), 0);
        repository.insert_transaction(TransactionData {
            transaction,
            height: Some(5),
        });
        AssetLockProof::Chain(ChainAssetLockProof {
            core_chain_locked_height: 10,
            out_point,
        })
    }

    #[tokio::test]
    async fn test_fee_covers_scratch_writes() {
        let repository = repository_with_balance(Some(Credits::MAX));
        let context = ExecutionContext::new();
        let result = validate_state_transition_fee(&repository, &note_batch(), &context)
            .await
            .unwrap();

        assert!(result.is_valid());
        let fee = result.data().unwrap();
        assert!(fee.storage_fee > 0);
        assert_eq!(fee.desired_amount, fee.storage_fee + fee.processing_fee);
        assert!(!context.operations().is_empty());
        assert!(context.dry_operations().is_empty());
    }

    #[tokio::test]
    async fn test_balance_is_not_enough() {
        let repository = repository_with_balance(Some(10));
        let result = validate_state_transition_fee(&repository, &note_batch(), &ExecutionContext::new())
            .await
            .unwrap();
        assert_eq!(result.error_codes(), vec![3000]);

        let dry_run = validate_state_transition_fee(&repository, &note_batch(), &ExecutionContext::dry_run())
            .await
            .unwrap();
        assert!(dry_run.is_valid());
    }

    #[tokio::test]
    async fn test_missing_owner_is_not_a_consensus_error() {
        let repository = repository_with_balance(None);
        let error = validate_state_transition_fee(&repository, &note_batch(), &ExecutionContext::new())
            .await
            .unwrap_err();
        assert!(matches!(error, ProtocolError::IdentityNotPresent { .. }));
    }

    #[tokio::test]
    async fn test_identity_create_pays_from_asset_lock() {
        let repository = repository_with_balance(None);
        let rich = funded(&repository, 1_000_000);
        let create = |proof: AssetLockProof| {
            StateTransition::IdentityCreate(IdentityCreateTransition {
                protocol_version: 1,
                identity_id: proof.create_identifier(),
                asset_lock_proof: proof,
                public_keys: Vec::new(),
                signature: Vec::new(),
            })
        };

        let result = validate_state_transition_fee(&repository, &create(rich), &ExecutionContext::new())
            .await
            .unwrap();
        assert!(result.is_valid());

        let repository = repository_with_balance(None);
        let poor = funded(&repository, 1);
        let result = validate_state_transition_fee(&repository, &create(poor), &ExecutionContext::new())
            .await
            .unwrap();
        assert_eq!(result.error_codes(), vec![3000]);
    }

    #[tokio::test]
    async fn test_top_up_adds_existing_balance() {
        let repository = repository_with_balance(Some(Credits::MAX / 2));
        let proof = funded(&repository, 1);
        let top_up = StateTransition::IdentityTopUp(IdentityTopUpTransition {
            protocol_version: 1,
            asset_lock_proof: proof,
            identity_id: owner(),
            signature: Vec::new(),
        });
        let result = validate_state_transition_fee(&repository, &top_up, &ExecutionContext::new())
            .await
            .unwrap();
        assert!(result.is_valid());
    }
}
