//! # Pipeline Properties
//!
//! Stage ordering, fee determinism and the wire codec, observed through
//! the public API.

#[cfg(test)]
mod tests {
    use crate::fixtures::{note_contract, TestPlatform, HIGH_PRIVATE_KEY};
    use platform_protocol::domain::{
        DataContractCreateTransition, DocumentCreateTransition, DocumentsBatchTransition,
        IdentityTopUpTransition,
    };
    use platform_protocol::{
        calculate_operation_fees, calculate_state_transition_fee, decode_protocol_entity,
        encode_protocol_entity, validate_state_transition_fee, DocumentTransition,
        ExecutionContext, StateTransition, StateTransitionApi,
    };
    use serde_json::json;
    use shared_types::{AssetLockProof, ChainAssetLockProof, OutPoint};

    fn contract_create(platform: &TestPlatform, protocol_version: u32) -> anyhow::Result<StateTransition> {
        let data_contract = note_contract(platform.owner_id);
        let entropy = data_contract
            .entropy
            .ok_or_else(|| anyhow::anyhow!("contract without entropy"))?;
        platform.signed(
            DataContractCreateTransition {
                protocol_version,
                data_contract,
                entropy,
                signature_public_key_id: 1,
                signature: Vec::new(),
            },
            &HIGH_PRIVATE_KEY,
        )
    }

    #[tokio::test]
    async fn test_basic_failure_never_reaches_state() -> anyhow::Result<()> {
        let platform = TestPlatform::new()?;
        let transition = contract_create(&platform, 99)?;
        platform.repository.reset_call_count();

        let result = platform
            .facade
            .validate(&transition, &ExecutionContext::new())
            .await?;

        assert_eq!(result.error_codes(), vec![1002]);
        assert_eq!(platform.repository.call_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_valid_transition_touches_repository() -> anyhow::Result<()> {
        let platform = TestPlatform::new()?;
        let transition = contract_create(&platform, 1)?;
        platform.repository.reset_call_count();

        let result = platform
            .facade
            .validate(&transition, &ExecutionContext::new())
            .await?;

        assert!(result.is_valid(), "{:?}", result.errors());
        assert!(platform.repository.call_count() > 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_fees_are_deterministic() -> anyhow::Result<()> {
        let platform = TestPlatform::new()?;
        let transition = contract_create(&platform, 1)?;

        let context = ExecutionContext::new();
        let result = validate_state_transition_fee(platform.repository.as_ref(), &transition, &context)
            .await?;
        assert!(result.is_valid(), "{:?}", result.errors());

        let operations = context.operations();
        assert!(!operations.is_empty());
        assert_eq!(
            calculate_operation_fees(&operations),
            calculate_operation_fees(&operations)
        );
        assert_eq!(
            calculate_state_transition_fee(&transition, &context),
            calculate_state_transition_fee(&transition, &context)
        );
        assert_eq!(
            result.data().cloned(),
            Some(calculate_state_transition_fee(&transition, &context))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_dry_run_validates_without_writes() -> anyhow::Result<()> {
        let platform = TestPlatform::new()?;
        let transition = contract_create(&platform, 1)?;
        let id = match &transition {
            StateTransition::DataContractCreate(t) => t.data_contract.id,
            _ => anyhow::bail!("not a contract create"),
        };

        let context = ExecutionContext::dry_run();
        let result = platform.facade.process(transition, &context).await?;

        assert!(result.is_valid(), "{:?}", result.errors());
        assert!(platform.repository.data_contract(&id).is_none());
        assert!(!context.dry_operations().is_empty());
        Ok(())
    }

    #[test]
    fn test_codec_round_trip_per_variant() -> anyhow::Result<()> {
        let platform = TestPlatform::new()?;
        let contract = note_contract(platform.owner_id);

        let batch = StateTransition::from(DocumentsBatchTransition {
            protocol_version: 1,
            owner_id: platform.owner_id,
            transitions: vec![DocumentTransition::Create(DocumentCreateTransition::new(
                &contract,
                &platform.owner_id,
                "note",
                [5; 32],
                json!({"title": "hello", "nested": {"list": [1, 2, 3]}}),
            ))],
            signature_public_key_id: 1,
            signature: vec![9; 65],
        });
        let top_up = StateTransition::from(IdentityTopUpTransition {
            protocol_version: 1,
            asset_lock_proof: AssetLockProof::Chain(ChainAssetLockProof {
                core_chain_locked_height: 42,
                out_point: OutPoint::new([6; 32], 1),
            }),
            identity_id: platform.owner_id,
            signature: vec![8; 65],
        });

        for transition in [contract_create(&platform, 1)?, batch, top_up] {
            let buffer = encode_protocol_entity(&transition, transition.protocol_version())?;
            let (version, decoded): (u32, StateTransition) = decode_protocol_entity(&buffer)?;
            assert_eq!(version, 1);
            assert_eq!(decoded, transition);
        }
        Ok(())
    }
}
