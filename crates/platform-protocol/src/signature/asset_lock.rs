//! Signatures by the one-time key an asset lock pays to.

use crate::asset_lock::fetch_asset_lock_public_key_hash;
use crate::domain::{ExecutionContext, Operation, StateTransition, ValidationResult};
use crate::errors::{ProtocolError, SignatureError};
use crate::ports::{CryptoAdapter, StateRepository};
use shared_types::{AssetLockProof, KeyType};
use tracing::debug;

fn asset_lock_proof(state_transition: &StateTransition) -> Option<&AssetLockProof> {
    match state_transition {
        StateTransition::IdentityCreate(t) => Some(&t.asset_lock_proof),
        StateTransition::IdentityTopUp(t) => Some(&t.asset_lock_proof),
        _ => None,
    }
}

/// Verify that the transition is signed by the key whose HASH160 the
/// locked output carries.
pub async fn validate_asset_lock_signature(
    repository: &dyn StateRepository,
    crypto: &dyn CryptoAdapter,
    state_transition: &StateTransition,
    context: &ExecutionContext,
) -> Result<ValidationResult, ProtocolError> {
    let Some(proof) = asset_lock_proof(state_transition) else {
        return Err(ProtocolError::InvalidEntity(format!(
            "{} carries no asset lock proof",
            state_transition.transition_type()
        )));
    };

    let Some(key_hash) = fetch_asset_lock_public_key_hash(repository, proof, context).await? else {
        return Ok(ValidationResult::invalid(
            SignatureError::InvalidStateTransitionSignature,
        ));
    };

    context.add_operation(Operation::SignatureVerification {
        signature_type: KeyType::EcdsaHash160,
    });
    if context.is_dry_run() {
        return Ok(ValidationResult::valid());
    }

    let message = state_transition.signable_bytes()?;
    if let Err(e) = crypto.verify_signature(
        KeyType::EcdsaHash160,
        &key_hash,
        &message,
        state_transition.signature(),
    ) {
        debug!(
            identity_id = %state_transition.owner_id(),
            error = %e,
            "Asset lock signature rejected"
        );
        return Ok(ValidationResult::invalid(
            SignatureError::InvalidStateTransitionSignature,
        ));
    }

    Ok(ValidationResult::valid())
}
