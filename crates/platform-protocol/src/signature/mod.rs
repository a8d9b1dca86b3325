//! # Signature Validation
//!
//! - `identity`: transitions signed by a stored identity key (2000-2007)
//! - `asset_lock`: identity create and top-up, signed by the asset-lock key
//! - `public_keys`: proof of possession of keys being added (1056)
//!
//! Every signature check records an [`Operation::SignatureVerification`]
//! so the fee stage can bill it.
//!
//! [`Operation::SignatureVerification`]: crate::domain::Operation::SignatureVerification

pub mod asset_lock;
pub mod identity;
pub mod public_keys;

pub use asset_lock::validate_asset_lock_signature;
pub use identity::{
    document_type_security_level, is_signature_supported,
    validate_state_transition_identity_signature,
};
pub use public_keys::validate_public_key_signatures;

use crate::domain::{ExecutionContext, StateTransition, ValidationResult};
use crate::errors::ProtocolError;
use crate::ports::{CryptoAdapter, StateRepository};

/// Check the signature of `state_transition` with the key its variant
/// requires.
pub async fn validate_state_transition_signature(
    repository: &dyn StateRepository,
    crypto: &dyn CryptoAdapter,
    state_transition: &StateTransition,
    context: &ExecutionContext,
) -> Result<ValidationResult, ProtocolError> {
    if state_transition.is_identity_signed() {
        validate_state_transition_identity_signature(repository, crypto, state_transition, context)
            .await
    } else {
        validate_asset_lock_signature(repository, crypto, state_transition, context).await
    }
}
