//! # Test Fixtures
//!
//! A platform seeded with one funded identity and the helpers the
//! integration scenarios share.

use platform_protocol::adapters::{InMemoryStateRepository, JsonSchemaValidator, NativeCryptoAdapter};
use platform_protocol::{CryptoAdapter, ProtocolConfig, StateTransition, StateTransitionFacade};
use serde_json::{json, Value as JsonValue};
use shared_types::{
    AssetLockProof, BlockInfo, CoreTransaction, Credits, DataContract, Identifier, Identity,
    IdentityPublicKey, InstantAssetLockProof, InstantLock, KeyId, KeyType, OutPoint, Purpose,
    SecurityLevel, TimestampMillis, TxOut, ASSET_LOCK_TRANSACTION_TYPE,
};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const BLOCK_TIME: TimestampMillis = 1_700_000_000_000;
pub const CORE_CHAIN_LOCKED_HEIGHT: u32 = 100;
pub const OWNER_BALANCE: Credits = 1_000_000_000_000;

/// Private key of the owner's MASTER key, id 0.
pub const MASTER_PRIVATE_KEY: [u8; 32] = [0x11; 32];
pub const MASTER_KEY_ID: KeyId = 0;

/// Private key of the owner's HIGH key, id 1.
pub const HIGH_PRIVATE_KEY: [u8; 32] = [0x22; 32];
pub const HIGH_KEY_ID: KeyId = 1;

// =============================================================================
// PLATFORM
// =============================================================================

pub struct TestPlatform {
    pub repository: Arc<InMemoryStateRepository>,
    pub facade: StateTransitionFacade,
    pub crypto: NativeCryptoAdapter,
    pub owner_id: Identifier,
}

impl TestPlatform {
    /// Platform at [`BLOCK_TIME`] with the owner identity holding a MASTER
    /// and a HIGH authentication key.
    pub fn new() -> anyhow::Result<Self> {
        let crypto = NativeCryptoAdapter::new();
        let repository = Arc::new(InMemoryStateRepository::new().with_block_info(BlockInfo {
            height: 10,
            time_ms: BLOCK_TIME,
            core_chain_locked_height: CORE_CHAIN_LOCKED_HEIGHT,
            epoch: 0,
        }));

        let owner_id = Identifier::new([0xA1; 32]);
        repository.insert_identity(Identity {
            id: owner_id,
            protocol_version: 1,
            public_keys: vec![
                authentication_key(&crypto, MASTER_KEY_ID, SecurityLevel::Master, &MASTER_PRIVATE_KEY)?,
                authentication_key(&crypto, HIGH_KEY_ID, SecurityLevel::High, &HIGH_PRIVATE_KEY)?,
            ],
            balance: OWNER_BALANCE,
            revision: 0,
            metadata: None,
        });

        let facade = StateTransitionFacade::new(
            repository.clone(),
            Arc::new(crypto),
            Arc::new(JsonSchemaValidator::new()),
            Arc::new(ProtocolConfig::default()),
        );

        Ok(Self {
            repository,
            facade,
            crypto,
            owner_id,
        })
    }

    /// Sign `transition` with an ECDSA private key of the owner.
    pub fn signed(
        &self,
        transition: impl Into<StateTransition>,
        private_key: &[u8],
    ) -> anyhow::Result<StateTransition> {
        let mut transition = transition.into();
        transition.sign(KeyType::EcdsaSecp256k1, private_key, &self.crypto)?;
        Ok(transition)
    }

    pub fn owner(&self) -> anyhow::Result<Identity> {
        self.repository
            .identity(&self.owner_id)
            .ok_or_else(|| anyhow::anyhow!("owner identity missing"))
    }
}

fn authentication_key(
    crypto: &NativeCryptoAdapter,
    id: KeyId,
    security_level: SecurityLevel,
    private_key: &[u8],
) -> anyhow::Result<IdentityPublicKey> {
    Ok(IdentityPublicKey {
        id,
        key_type: KeyType::EcdsaSecp256k1,
        purpose: Purpose::Authentication,
        security_level,
        data: crypto.private_key_to_public_key(KeyType::EcdsaSecp256k1, private_key)?,
        read_only: false,
        disabled_at: None,
    })
}

// =============================================================================
// CONTRACTS
// =============================================================================

/// `profile` documents with a unique `username` index.
pub fn profile_contract(owner_id: Identifier) -> DataContract {
    DataContract::new(
        owner_id,
        [0x31; 32],
        1,
        BTreeMap::from([(
            "profile".to_string(),
            json!({
                "type": "object",
                "properties": {
                    "username": {"type": "string", "maxLength": 63},
                    "bio": {"type": "string", "maxLength": 255}
                },
                "indices": [
                    {"name": "byUsername", "properties": [{"username": "asc"}], "unique": true}
                ],
                "required": ["username"],
                "additionalProperties": false
            }),
        )]),
        BTreeMap::new(),
    )
}

/// `note` documents with a required `title`.
pub fn note_schema() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "title": {"type": "string", "maxLength": 63},
            "text": {"type": "string", "maxLength": 1024}
        },
        "required": ["title"],
        "additionalProperties": false
    })
}

pub fn note_contract(owner_id: Identifier) -> DataContract {
    DataContract::new(
        owner_id,
        [0x32; 32],
        1,
        BTreeMap::from([("note".to_string(), note_schema())]),
        BTreeMap::new(),
    )
}

// =============================================================================
// ASSET LOCKS
// =============================================================================

/// Instant proof for an asset-lock transaction paying `duffs` to `key_hash`.
pub fn instant_asset_lock_proof(key_hash: &[u8; 20], duffs: u64, seed: u8) -> AssetLockProof {
    let transaction = CoreTransaction {
        version: 3,
        tx_type: ASSET_LOCK_TRANSACTION_TYPE,
        inputs: vec![OutPoint::new([seed; 32], 0)],
        outputs: vec![TxOut::op_return(duffs, key_hash)],
        lock_time: 0,
    };
    AssetLockProof::Instant(InstantAssetLockProof {
        instant_lock: InstantLock {
            version: 1,
            inputs: transaction.inputs.clone(),
            txid: transaction.txid(),
            cycle_hash: [0; 32],
            signature: vec![0; 96],
        },
        transaction,
        output_index: 0,
    })
}
