//! # Apply
//!
//! Writes the effects of a validated state transition through the
//! [`StateRepository`].
//!
//! | Variant | Writes |
//! |---------|--------|
//! | DataContractCreate | `store_data_contract` |
//! | DataContractUpdate | `update_data_contract` |
//! | DocumentsBatch | `create_document` / `update_document` / `remove_document` per transition |
//! | IdentityCreate | `create_identity`, `add_to_system_credits`, out-point marked used |
//! | IdentityTopUp | `add_to_identity_balance`, `add_to_system_credits`, out-point marked used |
//! | IdentityUpdate | `add_keys_to_identity`, `disable_identity_keys`, `update_identity_revision` |
//!
//! The same code path runs in dry-run mode to cost a transition before its
//! state checks. Entities the transition expects but that are missing are
//! then skipped instead of failing.

use crate::asset_lock::fetch_asset_lock_transaction_output;
use crate::domain::{
    DataContractCreateTransition, DataContractUpdateTransition, DocumentTransition,
    DocumentsBatchTransition, ExecutionContext, IdentityCreateTransition,
    IdentityPublicKeyInCreation, IdentityTopUpTransition, IdentityUpdateTransition,
    StateTransition,
};
use crate::errors::ProtocolError;
use crate::fees::duffs_to_credits;
use crate::ports::{DocumentQuery, StateRepository};
use shared_types::{AssetLockProof, Credits, Document, Identity, LATEST_PROTOCOL_VERSION};
use tracing::{debug, instrument};

/// Apply `state_transition`. Only sound after every validation stage passed,
/// or in dry-run mode.
#[instrument(skip_all, fields(transition_type = %state_transition.transition_type()))]
pub async fn apply_state_transition(
    repository: &dyn StateRepository,
    state_transition: &StateTransition,
    context: &ExecutionContext,
) -> Result<(), ProtocolError> {
    match state_transition {
        StateTransition::DataContractCreate(t) => {
            apply_data_contract_create(repository, t, context).await
        }
        StateTransition::DataContractUpdate(t) => {
            apply_data_contract_update(repository, t, context).await
        }
        StateTransition::DocumentsBatch(t) => apply_documents_batch(repository, t, context).await,
        StateTransition::IdentityCreate(t) => apply_identity_create(repository, t, context).await,
        StateTransition::IdentityTopUp(t) => apply_identity_top_up(repository, t, context).await,
        StateTransition::IdentityUpdate(t) => apply_identity_update(repository, t, context).await,
    }
}

// =============================================================================
// DATA CONTRACTS
// =============================================================================

pub async fn apply_data_contract_create(
    repository: &dyn StateRepository,
    transition: &DataContractCreateTransition,
    context: &ExecutionContext,
) -> Result<(), ProtocolError> {
    repository
        .store_data_contract(transition.data_contract.clone(), context)
        .await?;
    Ok(())
}

pub async fn apply_data_contract_update(
    repository: &dyn StateRepository,
    transition: &DataContractUpdateTransition,
    context: &ExecutionContext,
) -> Result<(), ProtocolError> {
    repository
        .update_data_contract(transition.data_contract.clone(), context)
        .await?;
    Ok(())
}

// =============================================================================
// DOCUMENTS
// =============================================================================

async fn fetch_document(
    repository: &dyn StateRepository,
    transition: &DocumentTransition,
    context: &ExecutionContext,
) -> Result<Option<Document>, ProtocolError> {
    let query = DocumentQuery::new()
        .with_equal("$id", transition.id().to_json())
        .with_limit(1);
    let mut documents = repository
        .fetch_documents(
            &transition.data_contract_id(),
            transition.document_type(),
            &query,
            context,
        )
        .await?;
    Ok(documents.pop())
}

fn missing_document(transition: &DocumentTransition) -> ProtocolError {
    ProtocolError::InvalidEntity(format!(
        "document {} of type {} is not stored",
        transition.id(),
        transition.document_type()
    ))
}

pub async fn apply_documents_batch(
    repository: &dyn StateRepository,
    batch: &DocumentsBatchTransition,
    context: &ExecutionContext,
) -> Result<(), ProtocolError> {
    for transition in &batch.transitions {
        let contract_id = transition.data_contract_id();
        let document_type = transition.document_type();

        match transition {
            DocumentTransition::Create(create) => {
                let document = create.to_document(batch.owner_id);
                repository
                    .create_document(&contract_id, document_type, document, context)
                    .await?;
            }
            DocumentTransition::Replace(replace) => {
                let document = match fetch_document(repository, transition, context).await? {
                    Some(stored) => replace.patch(&stored),
                    // costed as if the document existed
                    None if context.is_dry_run() => replace.patch(&Document {
                        id: transition.id(),
                        owner_id: batch.owner_id,
                        revision: replace.revision.saturating_sub(1),
                        created_at: None,
                        updated_at: None,
                        data: replace.data.clone(),
                    }),
                    None => return Err(missing_document(transition)),
                };
                repository
                    .update_document(&contract_id, document_type, document, context)
                    .await?;
            }
            DocumentTransition::Delete(_) => {
                if fetch_document(repository, transition, context).await?.is_none() {
                    if context.is_dry_run() {
                        continue;
                    }
                    return Err(missing_document(transition));
                }
                repository
                    .remove_document(&contract_id, document_type, &transition.id(), context)
                    .await?;
            }
        }
    }

    debug!(
        owner_id = %batch.owner_id,
        transitions = batch.transitions.len(),
        dry_run = context.is_dry_run(),
        "Documents batch written"
    );
    Ok(())
}

// =============================================================================
// IDENTITIES
// =============================================================================

/// Credits locked by `proof`, zero when its output cannot be found.
pub async fn fetch_asset_lock_credits(
    repository: &dyn StateRepository,
    proof: &AssetLockProof,
    context: &ExecutionContext,
) -> Result<Credits, ProtocolError> {
    let output = fetch_asset_lock_transaction_output(repository, proof, context).await?;
    Ok(output.map_or(0, |output| duffs_to_credits(output.value)))
}

pub async fn apply_identity_create(
    repository: &dyn StateRepository,
    transition: &IdentityCreateTransition,
    context: &ExecutionContext,
) -> Result<(), ProtocolError> {
    let credits =
        fetch_asset_lock_credits(repository, &transition.asset_lock_proof, context).await?;

    let identity = Identity {
        id: transition.identity_id,
        protocol_version: LATEST_PROTOCOL_VERSION,
        public_keys: transition
            .public_keys
            .iter()
            .map(IdentityPublicKeyInCreation::to_identity_public_key)
            .collect(),
        balance: credits,
        revision: 0,
        metadata: None,
    };

    repository.create_identity(identity, context).await?;
    repository.add_to_system_credits(credits, context).await?;
    repository
        .mark_asset_lock_transaction_out_point_as_used(
            &transition.asset_lock_proof.out_point(),
            context,
        )
        .await?;

    debug!(identity_id = %transition.identity_id, credits, "Identity created");
    Ok(())
}

pub async fn apply_identity_top_up(
    repository: &dyn StateRepository,
    transition: &IdentityTopUpTransition,
    context: &ExecutionContext,
) -> Result<(), ProtocolError> {
    let credits =
        fetch_asset_lock_credits(repository, &transition.asset_lock_proof, context).await?;

    let exists = repository
        .fetch_identity(&transition.identity_id, context)
        .await?
        .is_some();
    if exists {
        repository
            .add_to_identity_balance(&transition.identity_id, credits, context)
            .await?;
    } else if !context.is_dry_run() {
        return Err(ProtocolError::IdentityNotPresent {
            identity_id: transition.identity_id,
        });
    }

    repository.add_to_system_credits(credits, context).await?;
    repository
        .mark_asset_lock_transaction_out_point_as_used(
            &transition.asset_lock_proof.out_point(),
            context,
        )
        .await?;

    debug!(identity_id = %transition.identity_id, credits, "Identity topped up");
    Ok(())
}

pub async fn apply_identity_update(
    repository: &dyn StateRepository,
    transition: &IdentityUpdateTransition,
    context: &ExecutionContext,
) -> Result<(), ProtocolError> {
    let identity_id = &transition.identity_id;
    if repository.fetch_identity(identity_id, context).await?.is_none() {
        if context.is_dry_run() {
            return Ok(());
        }
        return Err(ProtocolError::IdentityNotPresent {
            identity_id: *identity_id,
        });
    }

    if !transition.add_public_keys.is_empty() {
        let keys = transition
            .add_public_keys
            .iter()
            .map(IdentityPublicKeyInCreation::to_identity_public_key)
            .collect();
        repository
            .add_keys_to_identity(identity_id, keys, context)
            .await?;
    }

    if !transition.disable_public_keys.is_empty() {
        let disabled_at = match transition.public_keys_disabled_at {
            Some(disabled_at) => disabled_at,
            None => repository.fetch_latest_platform_block_time(context).await?,
        };
        repository
            .disable_identity_keys(
                identity_id,
                &transition.disable_public_keys,
                disabled_at,
                context,
            )
            .await?;
    }

    repository
        .update_identity_revision(identity_id, transition.revision, context)
        .await?;
    Ok(())
}
