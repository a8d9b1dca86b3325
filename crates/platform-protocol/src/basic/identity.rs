//! Structural checks of identity transitions.
//!
//! ## Public keys in creation
//!
//! | Rule | Code |
//! |------|------|
//! | key ids unique within the transition | 1030 |
//! | key data unique within the transition | 1029 |
//! | key data well-formed for its type | 1040 |
//! | MASTER keys are AUTHENTICATION keys | 1047 |
//! | a new identity has a MASTER AUTHENTICATION key | 1046 |
//! | every key signed the transition | 1056 |

use crate::asset_lock::validate_asset_lock_proof;
use crate::domain::{
    ExecutionContext, IdentityCreateTransition, IdentityPublicKeyInCreation,
    IdentityTopUpTransition, IdentityUpdateTransition, StateTransition, ValidationResult,
};
use crate::errors::{BasicError, ProtocolError};
use crate::ports::{CryptoAdapter, StateRepository};
use crate::signature::validate_public_key_signatures;
use shared_types::{KeyId, Purpose, SecurityLevel};
use std::collections::{BTreeSet, HashSet};

/// Ids that occur more than once, ascending.
fn duplicated_ids(keys: &[IdentityPublicKeyInCreation]) -> Vec<KeyId> {
    let mut seen = HashSet::new();
    let duplicated: BTreeSet<KeyId> = keys
        .iter()
        .filter(|key| !seen.insert(key.id))
        .map(|key| key.id)
        .collect();
    duplicated.into_iter().collect()
}

/// Ids of keys repeating the data of an earlier key.
pub(crate) fn duplicated_key_data<'a>(
    keys: impl IntoIterator<Item = (KeyId, &'a [u8])>,
) -> Vec<KeyId> {
    let mut seen = HashSet::new();
    keys.into_iter()
        .filter(|(_, data)| !seen.insert(*data))
        .map(|(id, _)| id)
        .collect()
}

/// Uniqueness and key material of keys being added.
pub fn validate_public_keys(
    crypto: &dyn CryptoAdapter,
    keys: &[IdentityPublicKeyInCreation],
) -> ValidationResult {
    let mut result = ValidationResult::valid();

    let ids = duplicated_ids(keys);
    if !ids.is_empty() {
        result.add_error(BasicError::DuplicatedIdentityPublicKeyId { duplicated_ids: ids });
    }

    let data = duplicated_key_data(keys.iter().map(|key| (key.id, key.data.as_slice())));
    if !data.is_empty() {
        result.add_error(BasicError::DuplicatedIdentityPublicKey {
            duplicated_public_key_ids: data,
        });
    }

    for key in keys {
        if let Err(e) = crypto.validate_public_key(key.key_type, &key.data) {
            result.add_error(BasicError::InvalidIdentityPublicKeyData {
                public_key_id: key.id,
                message: e.to_string(),
            });
        }
    }

    for key in keys
        .iter()
        .filter(|key| key.security_level == SecurityLevel::Master)
        .filter(|key| key.purpose != Purpose::Authentication)
    {
        result.add_error(BasicError::InvalidIdentityPublicKeySecurityLevel {
            public_key_id: key.id,
            security_level: key.security_level,
        });
    }

    result
}

/// A new identity needs an enabled MASTER AUTHENTICATION key.
pub fn validate_master_key_present(keys: &[IdentityPublicKeyInCreation]) -> ValidationResult {
    let has_master = keys.iter().any(|key| {
        key.purpose == Purpose::Authentication && key.security_level == SecurityLevel::Master
    });
    if has_master {
        ValidationResult::valid()
    } else {
        ValidationResult::invalid(BasicError::MissingMasterPublicKey)
    }
}

pub async fn validate_identity_create_basic(
    repository: &dyn StateRepository,
    crypto: &dyn CryptoAdapter,
    transition: &IdentityCreateTransition,
    context: &ExecutionContext,
) -> Result<ValidationResult, ProtocolError> {
    let proof = validate_asset_lock_proof(repository, &transition.asset_lock_proof, context).await?;
    if !proof.is_valid() {
        return Ok(proof.without_data());
    }

    let mut result = validate_public_keys(crypto, &transition.public_keys);
    result.merge(validate_master_key_present(&transition.public_keys));
    if !result.is_valid() {
        return Ok(result);
    }

    validate_public_key_signatures(
        crypto,
        &StateTransition::IdentityCreate(transition.clone()),
        &transition.public_keys,
    )
}

pub async fn validate_identity_top_up_basic(
    repository: &dyn StateRepository,
    transition: &IdentityTopUpTransition,
    context: &ExecutionContext,
) -> Result<ValidationResult, ProtocolError> {
    let proof = validate_asset_lock_proof(repository, &transition.asset_lock_proof, context).await?;
    Ok(proof.without_data())
}

pub fn validate_identity_update_basic(
    crypto: &dyn CryptoAdapter,
    transition: &IdentityUpdateTransition,
) -> Result<ValidationResult, ProtocolError> {
    let result = validate_public_keys(crypto, &transition.add_public_keys);
    if !result.is_valid() {
        return Ok(result);
    }

    validate_public_key_signatures(
        crypto,
        &StateTransition::IdentityUpdate(transition.clone()),
        &transition.add_public_keys,
    )
}
