//! Identity state rules.

use super::{millis_as_i64, TimeWindow};
use crate::basic::identity::duplicated_key_data;
use crate::config::ProtocolConfig;
use crate::domain::{
    ExecutionContext, IdentityCreateTransition, IdentityPublicKeyInCreation,
    IdentityTopUpTransition, IdentityUpdateTransition, ValidationResult,
};
use crate::errors::{BasicError, ProtocolError, SignatureError, StateError};
use crate::ports::StateRepository;
use shared_types::{Identity, IdentityPublicKey, KeyId};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

pub async fn validate_identity_create_state(
    repository: &dyn StateRepository,
    transition: &IdentityCreateTransition,
    context: &ExecutionContext,
) -> Result<ValidationResult, ProtocolError> {
    let identity_id = transition.identity_id;
    if repository.fetch_identity(&identity_id, context).await?.is_some() {
        return Ok(ValidationResult::invalid(StateError::IdentityAlreadyExists {
            identity_id,
        }));
    }

    let mut result = ValidationResult::valid();

    let expected = transition.asset_lock_proof.create_identifier();
    if identity_id != expected {
        result.add_error(BasicError::IdentityAssetLockProofLockedTransactionMismatch {
            message: format!("identity id {identity_id} is not funded by the proof, expected {expected}"),
        });
    }

    Ok(result)
}

/// The topped-up identity must exist.
pub async fn validate_identity_top_up_state(
    repository: &dyn StateRepository,
    transition: &IdentityTopUpTransition,
    context: &ExecutionContext,
) -> Result<ValidationResult, ProtocolError> {
    let identity_id = transition.identity_id;
    if repository.fetch_identity(&identity_id, context).await?.is_none() {
        return Ok(ValidationResult::invalid(SignatureError::IdentityNotFound {
            identity_id,
        }));
    }
    Ok(ValidationResult::valid())
}

fn validate_disabled_keys(identity: &Identity, key_ids: &[KeyId]) -> ValidationResult {
    let mut result = ValidationResult::valid();
    for &id in key_ids {
        match identity.public_key(id) {
            None => result.add_error(StateError::InvalidIdentityPublicKeyId { id }),
            Some(key) if key.read_only => {
                result.add_error(StateError::IdentityPublicKeyIsReadOnly {
                    public_key_index: id,
                })
            }
            Some(key) if key.is_disabled() => {
                result.add_error(StateError::IdentityPublicKeyIsDisabled {
                    public_key_index: id,
                })
            }
            Some(_) => {}
        }
    }
    result
}

fn validate_added_keys(identity: &Identity, keys: &[IdentityPublicKeyInCreation]) -> ValidationResult {
    let mut result = ValidationResult::valid();

    let existing_ids: HashSet<KeyId> = identity.public_keys.iter().map(|key| key.id).collect();
    let colliding_ids: BTreeSet<KeyId> = keys
        .iter()
        .map(|key| key.id)
        .filter(|id| existing_ids.contains(id))
        .collect();
    if !colliding_ids.is_empty() {
        result.add_error(StateError::DuplicatedIdentityPublicKeyIdState {
            duplicated_ids: colliding_ids.into_iter().collect(),
        });
    }

    let colliding_data = duplicated_key_data(
        identity
            .public_keys
            .iter()
            .map(|key| (key.id, key.data.as_slice()))
            .chain(keys.iter().map(|key| (key.id, key.data.as_slice()))),
    );
    if !colliding_data.is_empty() {
        result.add_error(StateError::DuplicatedIdentityPublicKeyState {
            duplicated_public_key_ids: colliding_data,
        });
    }

    result
}

/// The identity as it would be after `transition`.
fn updated_identity(identity: &Identity, transition: &IdentityUpdateTransition, disabled_at: u64) -> Identity {
    let mut updated = identity.clone();
    for id in &transition.disable_public_keys {
        if let Some(key) = updated.public_key_mut(*id) {
            key.disabled_at = Some(disabled_at);
        }
    }
    updated.public_keys.extend(
        transition
            .add_public_keys
            .iter()
            .map(IdentityPublicKeyInCreation::to_identity_public_key),
    );
    updated
}

pub async fn validate_identity_update_state(
    repository: &dyn StateRepository,
    config: &ProtocolConfig,
    transition: &IdentityUpdateTransition,
    context: &ExecutionContext,
) -> Result<ValidationResult, ProtocolError> {
    let identity_id = transition.identity_id;
    let Some(identity) = repository.fetch_identity(&identity_id, context).await? else {
        return Ok(ValidationResult::invalid(SignatureError::IdentityNotFound {
            identity_id,
        }));
    };

    if transition.revision != identity.revision + 1 {
        return Ok(ValidationResult::invalid(StateError::InvalidIdentityRevision {
            identity_id,
            current_revision: identity.revision,
        }));
    }

    let mut result = validate_disabled_keys(&identity, &transition.disable_public_keys);
    result.merge(validate_added_keys(&identity, &transition.add_public_keys));
    if !result.is_valid() {
        return Ok(result);
    }

    let block_time = repository.fetch_latest_platform_block_time(context).await?;
    let disabled_at = transition.public_keys_disabled_at.unwrap_or(block_time);

    let updated = updated_identity(&identity, transition, disabled_at);
    let enabled = updated.enabled_keys().count();
    if enabled > config.max_identity_public_keys {
        result.add_error(StateError::MaxIdentityPublicKeyLimitReached {
            max_items: config.max_identity_public_keys,
        });
    }
    if !updated
        .enabled_keys()
        .any(IdentityPublicKey::is_master_authentication)
    {
        result.add_error(BasicError::MissingMasterPublicKey);
    }

    if let Some(disabled_at) = transition.public_keys_disabled_at {
        let window = TimeWindow::around(block_time, config.block_time_window_ms);
        if !context.is_dry_run() && !window.contains(disabled_at) {
            result.add_error(StateError::IdentityPublicKeyDisabledAtWindowViolation {
                disabled_at: millis_as_i64(disabled_at),
                time_window_start: millis_as_i64(window.start),
                time_window_end: millis_as_i64(window.end),
            });
        }
    }

    if !result.is_valid() {
        debug!(
            identity_id = %identity_id,
            errors = result.errors().len(),
            "Identity update conflicts with stored identity"
        );
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryStateRepository;
    use shared_types::{
        AssetLockProof, BlockInfo, ChainAssetLockProof, Identifier, KeyType, OutPoint, Purpose,
        SecurityLevel,
    };

    const BLOCK_TIME: u64 = 5_000_000;

    fn key(id: KeyId, level: SecurityLevel, data: u8) -> IdentityPublicKey {
        IdentityPublicKey {
            id,
            key_type: KeyType::EcdsaSecp256k1,
            purpose: Purpose::Authentication,
            security_level: level,
            data: vec![data; 33],
            read_only: false,
            disabled_at: None,
        }
    }

    fn identity() -> Identity {
        let mut read_only = key(2, SecurityLevel::High, 3);
        read_only.read_only = true;
        Identity {
            id: Identifier::new([1; 32]),
            protocol_version: 1,
            public_keys: vec![
                key(0, SecurityLevel::Master, 1),
                key(1, SecurityLevel::High, 2),
                read_only,
            ],
            balance: 1_000,
            revision: 1,
            metadata: None,
        }
    }

    fn repository() -> InMemoryStateRepository {
        let repository = InMemoryStateRepository::new().with_block_info(BlockInfo {
            height: 1,
            time_ms: BLOCK_TIME,
            core_chain_locked_height: 1,
            epoch: 0,
        });
        repository.insert_identity(identity());
        repository
    }

    fn update() -> IdentityUpdateTransition {
        IdentityUpdateTransition {
            protocol_version: 1,
            identity_id: Identifier::new([1; 32]),
            revision: 2,
            add_public_keys: Vec::new(),
            disable_public_keys: Vec::new(),
            public_keys_disabled_at: None,
            signature_public_key_id: 0,
            signature: Vec::new(),
        }
    }

    async fn codes(repository: &InMemoryStateRepository, transition: &IdentityUpdateTransition) -> Vec<u32> {
        validate_identity_update_state(
            repository,
            &ProtocolConfig::default(),
            transition,
            &ExecutionContext::new(),
        )
        .await
        .unwrap()
        .error_codes()
    }

    #[tokio::test]
    async fn test_revision_must_increment() {
        let repository = repository();
        let mut transition = update();
        transition.revision = 3;
        assert_eq!(codes(&repository, &transition).await, vec![4019]);
    }

    #[tokio::test]
    async fn test_disable_rules() {
        let repository = repository();
        let mut transition = update();
        transition.disable_public_keys = vec![9, 2];
        assert_eq!(codes(&repository, &transition).await, vec![4018, 4017]);

        let mut identity = identity();
        identity.public_keys[1].disabled_at = Some(1);
        repository.insert_identity(identity);
        transition.disable_public_keys = vec![1];
        assert_eq!(codes(&repository, &transition).await, vec![4023]);
    }

    #[tokio::test]
    async fn test_only_master_key_cannot_be_disabled() {
        let repository = repository();
        let mut transition = update();
        transition.disable_public_keys = vec![0];
        assert_eq!(codes(&repository, &transition).await, vec![1046]);
    }

    #[tokio::test]
    async fn test_added_key_collisions() {
        let repository = repository();
        let mut transition = update();
        let colliding = IdentityPublicKeyInCreation::from(&key(1, SecurityLevel::High, 9));
        let same_data = IdentityPublicKeyInCreation::from(&key(5, SecurityLevel::High, 2));
        transition.add_public_keys = vec![colliding, same_data];
        assert_eq!(codes(&repository, &transition).await, vec![4022, 4021]);
    }

    #[tokio::test]
    async fn test_key_limit_and_disabled_at_window() {
        let repository = repository();
        let mut transition = update();
        transition.add_public_keys = (10..18)
            .map(|id| IdentityPublicKeyInCreation::from(&key(id, SecurityLevel::High, id as u8)))
            .collect();
        transition.public_keys_disabled_at = Some(BLOCK_TIME * 2);
        assert_eq!(codes(&repository, &transition).await, vec![4020, 4012]);
    }

    #[tokio::test]
    async fn test_identity_create_rules() {
        let proof = AssetLockProof::Chain(ChainAssetLockProof {
            core_chain_locked_height: 1,
            out_point: OutPoint::new([4; 32], 0),
        });
        let mut transition = IdentityCreateTransition {
            protocol_version: 1,
            identity_id: proof.create_identifier(),
            asset_lock_proof: proof,
            public_keys: vec![IdentityPublicKeyInCreation::from(&key(0, SecurityLevel::Master, 1))],
            signature: Vec::new(),
        };
        let repository = InMemoryStateRepository::new();
        let context = ExecutionContext::new();

        let result = validate_identity_create_state(&repository, &transition, &context)
            .await
            .unwrap();
        assert!(result.is_valid());

        transition.identity_id = Identifier::new([1; 32]);
        let mismatch = validate_identity_create_state(&repository, &transition, &context)
            .await
            .unwrap();
        assert_eq!(mismatch.error_codes(), vec![1031]);

        repository.insert_identity(identity());
        let exists = validate_identity_create_state(&repository, &transition, &context)
            .await
            .unwrap();
        assert_eq!(exists.error_codes(), vec![4011]);
    }

    #[tokio::test]
    async fn test_top_up_needs_identity() {
        let transition = IdentityTopUpTransition {
            protocol_version: 1,
            asset_lock_proof: AssetLockProof::Chain(ChainAssetLockProof {
                core_chain_locked_height: 1,
                out_point: OutPoint::new([4; 32], 0),
            }),
            identity_id: Identifier::new([1; 32]),
            signature: Vec::new(),
        };
        let empty = InMemoryStateRepository::new();
        let result = validate_identity_top_up_state(&empty, &transition, &ExecutionContext::new())
            .await
            .unwrap();
        assert_eq!(result.error_codes(), vec![2000]);
        assert!(validate_identity_top_up_state(&repository(), &transition, &ExecutionContext::new())
            .await
            .unwrap()
            .is_valid());
    }
}
