//! Proof of possession of keys being added to an identity.

use crate::domain::{IdentityPublicKeyInCreation, StateTransition, ValidationResult};
use crate::errors::{BasicError, ProtocolError};
use crate::ports::CryptoAdapter;
use shared_types::KeyType;

/// Each key in creation must sign the transition's signable bytes.
///
/// BIP13 script hashes cannot sign and are not checked.
pub fn validate_public_key_signatures(
    crypto: &dyn CryptoAdapter,
    state_transition: &StateTransition,
    public_keys: &[IdentityPublicKeyInCreation],
) -> Result<ValidationResult, ProtocolError> {
    let message = state_transition.signable_bytes()?;
    let mut result = ValidationResult::valid();

    for key in public_keys
        .iter()
        .filter(|key| key.key_type != KeyType::Bip13ScriptHash)
    {
        if crypto
            .verify_signature(key.key_type, &key.data, &message, &key.signature)
            .is_err()
        {
            result.add_error(BasicError::InvalidIdentityKeySignature {
                public_key_id: key.id,
            });
        }
    }

    Ok(result)
}
