//! # Identity Flows
//!
//! Funding through asset locks and key management through identity
//! updates, end to end.

#[cfg(test)]
mod tests {
    use crate::fixtures::{
        instant_asset_lock_proof, TestPlatform, BLOCK_TIME, HIGH_KEY_ID, MASTER_KEY_ID,
        MASTER_PRIVATE_KEY, OWNER_BALANCE,
    };
    use platform_protocol::domain::{
        IdentityCreateTransition, IdentityPublicKeyInCreation, IdentityTopUpTransition,
        IdentityUpdateTransition,
    };
    use platform_protocol::{CryptoAdapter, ExecutionContext, StateTransition, StateTransitionApi};
    use shared_crypto::Secp256k1KeyPair;
    use shared_types::{AssetLockProof, KeyId, KeyType, Purpose, SecurityLevel};

    const CREDITS_PER_DUFF: u64 = 1_000;

    fn top_up(
        platform: &TestPlatform,
        one_time_key: &Secp256k1KeyPair,
        proof: AssetLockProof,
    ) -> anyhow::Result<StateTransition> {
        let mut transition = StateTransition::from(IdentityTopUpTransition {
            protocol_version: 1,
            asset_lock_proof: proof,
            identity_id: platform.owner_id,
            signature: Vec::new(),
        });
        transition.sign(KeyType::EcdsaHash160, &one_time_key.to_bytes(), &platform.crypto)?;
        Ok(transition)
    }

    fn disable(platform: &TestPlatform, revision: u64, keys: Vec<KeyId>) -> anyhow::Result<StateTransition> {
        platform.signed(
            IdentityUpdateTransition {
                protocol_version: 1,
                identity_id: platform.owner_id,
                revision,
                add_public_keys: Vec::new(),
                disable_public_keys: keys,
                public_keys_disabled_at: None,
                signature_public_key_id: MASTER_KEY_ID,
                signature: Vec::new(),
            },
            &MASTER_PRIVATE_KEY,
        )
    }

    // =========================================================================
    // FUNDING
    // =========================================================================

    #[tokio::test]
    async fn test_identity_created_from_asset_lock() -> anyhow::Result<()> {
        let platform = TestPlatform::new()?;
        let one_time_key = Secp256k1KeyPair::generate();
        let proof = instant_asset_lock_proof(&one_time_key.public_key().hash160(), 1_000_000, 7);
        let out_point = proof.out_point();

        let master_private_key = [0x33; 32];
        let mut create = IdentityCreateTransition {
            protocol_version: 1,
            identity_id: proof.create_identifier(),
            asset_lock_proof: proof,
            public_keys: vec![IdentityPublicKeyInCreation {
                id: 0,
                key_type: KeyType::EcdsaSecp256k1,
                purpose: Purpose::Authentication,
                security_level: SecurityLevel::Master,
                data: platform
                    .crypto
                    .private_key_to_public_key(KeyType::EcdsaSecp256k1, &master_private_key)?,
                read_only: false,
                signature: Vec::new(),
            }],
            signature: Vec::new(),
        };
        create.sign_public_keys(&[master_private_key.as_slice()], &platform.crypto)?;
        let identity_id = create.identity_id;

        let mut transition = StateTransition::from(create);
        transition.sign(KeyType::EcdsaHash160, &one_time_key.to_bytes(), &platform.crypto)?;

        let result = platform
            .facade
            .process(transition.clone(), &ExecutionContext::new())
            .await?;
        assert!(result.is_valid(), "{:?}", result.errors());

        let identity = platform
            .repository
            .identity(&identity_id)
            .ok_or_else(|| anyhow::anyhow!("identity not created"))?;
        assert_eq!(identity.balance, 1_000_000 * CREDITS_PER_DUFF);
        assert_eq!(identity.public_keys.len(), 1);
        assert_eq!(identity.revision, 0);
        assert!(platform.repository.is_out_point_used(&out_point));
        assert_eq!(platform.repository.system_credits(), identity.balance);

        // the same proof cannot fund a second identity
        let replay = platform
            .facade
            .validate(&transition, &ExecutionContext::new())
            .await?;
        assert_eq!(replay.error_codes(), vec![1033]);
        Ok(())
    }

    #[tokio::test]
    async fn test_top_up_with_used_out_point_is_rejected() -> anyhow::Result<()> {
        let platform = TestPlatform::new()?;
        let one_time_key = Secp256k1KeyPair::generate();
        let proof = instant_asset_lock_proof(&one_time_key.public_key().hash160(), 500, 8);

        let transition = top_up(&platform, &one_time_key, proof.clone())?;
        let result = platform
            .facade
            .process(transition.clone(), &ExecutionContext::new())
            .await?;
        assert!(result.is_valid(), "{:?}", result.errors());
        assert_eq!(platform.owner()?.balance, OWNER_BALANCE + 500 * CREDITS_PER_DUFF);

        // an otherwise valid resubmission
        let result = platform
            .facade
            .process(transition, &ExecutionContext::new())
            .await?;
        assert_eq!(result.error_codes(), vec![1033]);
        assert_eq!(platform.owner()?.balance, OWNER_BALANCE + 500 * CREDITS_PER_DUFF);
        Ok(())
    }

    #[tokio::test]
    async fn test_top_up_signed_by_other_key_is_rejected() -> anyhow::Result<()> {
        let platform = TestPlatform::new()?;
        let one_time_key = Secp256k1KeyPair::generate();
        let proof = instant_asset_lock_proof(&one_time_key.public_key().hash160(), 500, 9);

        let transition = top_up(&platform, &Secp256k1KeyPair::generate(), proof.clone())?;
        let result = platform
            .facade
            .process(transition, &ExecutionContext::new())
            .await?;
        assert_eq!(result.error_codes(), vec![2002]);
        assert!(!platform.repository.is_out_point_used(&proof.out_point()));
        Ok(())
    }

    // =========================================================================
    // KEY MANAGEMENT
    // =========================================================================

    #[tokio::test]
    async fn test_only_master_key_cannot_be_disabled() -> anyhow::Result<()> {
        let platform = TestPlatform::new()?;

        let result = platform
            .facade
            .process(disable(&platform, 1, vec![MASTER_KEY_ID])?, &ExecutionContext::new())
            .await?;
        assert_eq!(result.error_codes(), vec![1046]);

        let owner = platform.owner()?;
        assert_eq!(owner.revision, 0);
        assert!(owner.public_keys.iter().all(|key| key.disabled_at.is_none()));
        Ok(())
    }

    #[tokio::test]
    async fn test_disable_key_at_block_time() -> anyhow::Result<()> {
        let platform = TestPlatform::new()?;

        let result = platform
            .facade
            .process(disable(&platform, 1, vec![HIGH_KEY_ID])?, &ExecutionContext::new())
            .await?;
        assert!(result.is_valid(), "{:?}", result.errors());

        let owner = platform.owner()?;
        assert_eq!(owner.revision, 1);
        let high = owner
            .public_keys
            .iter()
            .find(|key| key.id == HIGH_KEY_ID)
            .ok_or_else(|| anyhow::anyhow!("key missing"))?;
        assert_eq!(high.disabled_at, Some(BLOCK_TIME));

        // disabling it again needs the next revision and still fails
        let result = platform
            .facade
            .process(disable(&platform, 1, vec![HIGH_KEY_ID])?, &ExecutionContext::new())
            .await?;
        assert_eq!(result.error_codes(), vec![4019]);

        let result = platform
            .facade
            .process(disable(&platform, 2, vec![HIGH_KEY_ID])?, &ExecutionContext::new())
            .await?;
        assert_eq!(result.error_codes(), vec![4023]);
        Ok(())
    }
}
