//! # Document and Data Contract Flows
//!
//! Contracts are registered through the pipeline, then documents are
//! created, replaced and deleted under them.

#[cfg(test)]
mod tests {
    use crate::fixtures::{
        note_contract, profile_contract, TestPlatform, HIGH_PRIVATE_KEY, MASTER_KEY_ID,
        MASTER_PRIVATE_KEY,
    };
    use platform_protocol::domain::{
        DataContractCreateTransition, DataContractUpdateTransition, DocumentCreateTransition,
        DocumentDeleteTransition, DocumentReplaceTransition, DocumentTransitionBase,
        DocumentsBatchTransition,
    };
    use platform_protocol::{
        BasicError, ConsensusError, DocumentTransition, ExecutionContext, StateTransitionApi,
    };
    use serde_json::{json, Value as JsonValue};
    use shared_types::{DataContract, Identifier};
    use std::collections::BTreeSet;

    // =========================================================================
    // HELPERS
    // =========================================================================

    async fn register(platform: &TestPlatform, contract: &DataContract) -> anyhow::Result<()> {
        let entropy = contract
            .entropy
            .ok_or_else(|| anyhow::anyhow!("contract without entropy"))?;
        let transition = platform.signed(
            DataContractCreateTransition {
                protocol_version: 1,
                data_contract: contract.clone(),
                entropy,
                signature_public_key_id: 1,
                signature: Vec::new(),
            },
            &HIGH_PRIVATE_KEY,
        )?;
        let result = platform
            .facade
            .process(transition, &ExecutionContext::new())
            .await?;
        anyhow::ensure!(result.is_valid(), "contract rejected: {:?}", result.errors());
        Ok(())
    }

    async fn update(
        platform: &TestPlatform,
        data_contract: DataContract,
    ) -> anyhow::Result<Vec<u32>> {
        let transition = platform.signed(
            DataContractUpdateTransition {
                protocol_version: 1,
                data_contract,
                signature_public_key_id: 1,
                signature: Vec::new(),
            },
            &HIGH_PRIVATE_KEY,
        )?;
        let result = platform
            .facade
            .process(transition, &ExecutionContext::new())
            .await?;
        Ok(result.error_codes())
    }

    async fn submit_batch(
        platform: &TestPlatform,
        transitions: Vec<DocumentTransition>,
    ) -> anyhow::Result<Vec<u32>> {
        let transition = platform.signed(
            DocumentsBatchTransition {
                protocol_version: 1,
                owner_id: platform.owner_id,
                transitions,
                signature_public_key_id: 1,
                signature: Vec::new(),
            },
            &HIGH_PRIVATE_KEY,
        )?;
        let result = platform
            .facade
            .process(transition, &ExecutionContext::new())
            .await?;
        Ok(result.error_codes())
    }

    fn create_profile(
        platform: &TestPlatform,
        contract: &DataContract,
        entropy: u8,
        data: JsonValue,
    ) -> DocumentCreateTransition {
        DocumentCreateTransition::new(contract, &platform.owner_id, "profile", [entropy; 32], data)
    }

    fn profile_base(contract: &DataContract, id: Identifier) -> DocumentTransitionBase {
        DocumentTransitionBase {
            id,
            document_type: "profile".to_string(),
            data_contract_id: contract.id,
        }
    }

    // =========================================================================
    // DOCUMENT LIFECYCLE
    // =========================================================================

    #[tokio::test]
    async fn test_document_create_replace_delete() -> anyhow::Result<()> {
        let platform = TestPlatform::new()?;
        let contract = profile_contract(platform.owner_id);
        register(&platform, &contract).await?;

        let create = create_profile(&platform, &contract, 1, json!({"username": "alice"}));
        let id = create.base.id;
        let codes = submit_batch(&platform, vec![DocumentTransition::Create(create)]).await?;
        assert!(codes.is_empty(), "{codes:?}");

        let stored = platform
            .repository
            .document(&contract.id, "profile", &id)
            .ok_or_else(|| anyhow::anyhow!("document not stored"))?;
        assert_eq!(stored.revision, 1);
        assert_eq!(stored.owner_id, platform.owner_id);

        // revision 2 follows revision 1
        let replace = DocumentReplaceTransition::new(
            &contract,
            "profile",
            &stored,
            json!({"username": "alice", "bio": "hello"}),
        );
        assert_eq!(replace.revision, 2);
        let codes = submit_batch(&platform, vec![DocumentTransition::Replace(replace)]).await?;
        assert!(codes.is_empty(), "{codes:?}");

        let stored = platform
            .repository
            .document(&contract.id, "profile", &id)
            .ok_or_else(|| anyhow::anyhow!("document lost"))?;
        assert_eq!(stored.revision, 2);
        assert_eq!(stored.data["bio"], "hello");

        // any other revision is a mismatch
        for revision in [2, 4] {
            let mut replace =
                DocumentReplaceTransition::new(&contract, "profile", &stored, json!({"username": "alice"}));
            replace.revision = revision;
            let codes = submit_batch(&platform, vec![DocumentTransition::Replace(replace)]).await?;
            assert_eq!(codes, vec![4010]);
        }

        let delete = DocumentTransition::Delete(DocumentDeleteTransition {
            base: profile_base(&contract, id),
        });
        let codes = submit_batch(&platform, vec![delete]).await?;
        assert!(codes.is_empty(), "{codes:?}");
        assert!(platform.repository.document(&contract.id, "profile", &id).is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_twice_reports_present_document() -> anyhow::Result<()> {
        let platform = TestPlatform::new()?;
        let contract = profile_contract(platform.owner_id);
        register(&platform, &contract).await?;

        let create = create_profile(&platform, &contract, 1, json!({"username": "bob"}));
        let codes = submit_batch(&platform, vec![DocumentTransition::Create(create.clone())]).await?;
        assert!(codes.is_empty(), "{codes:?}");

        let codes = submit_batch(&platform, vec![DocumentTransition::Create(create)]).await?;
        assert!(codes.contains(&4004), "{codes:?}");
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_unique_index_in_one_batch() -> anyhow::Result<()> {
        let platform = TestPlatform::new()?;
        let contract = profile_contract(platform.owner_id);
        register(&platform, &contract).await?;

        let first = create_profile(&platform, &contract, 1, json!({"username": "carol"}));
        let second = create_profile(&platform, &contract, 2, json!({"username": "carol"}));
        let expected = BTreeSet::from([first.base.id, second.base.id]);

        let transition = platform.signed(
            DocumentsBatchTransition {
                protocol_version: 1,
                owner_id: platform.owner_id,
                transitions: vec![
                    DocumentTransition::Create(first),
                    DocumentTransition::Create(second),
                ],
                signature_public_key_id: 1,
                signature: Vec::new(),
            },
            &HIGH_PRIVATE_KEY,
        )?;
        let result = platform
            .facade
            .validate(&transition, &ExecutionContext::new())
            .await?;

        assert_eq!(result.error_codes(), vec![1020]);
        match result.first_error() {
            Some(ConsensusError::Basic(BasicError::DuplicateDocumentTransitionsWithIndices {
                references,
            })) => {
                let ids: BTreeSet<Identifier> = references.iter().map(|(_, id)| *id).collect();
                assert_eq!(ids, expected);
            }
            other => panic!("unexpected error {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_documents_need_a_high_enough_key() -> anyhow::Result<()> {
        let platform = TestPlatform::new()?;
        let contract = profile_contract(platform.owner_id);
        register(&platform, &contract).await?;

        let create = create_profile(&platform, &contract, 1, json!({"username": "dave"}));
        let transition = platform.signed(
            DocumentsBatchTransition {
                protocol_version: 1,
                owner_id: platform.owner_id,
                transitions: vec![DocumentTransition::Create(create)],
                signature_public_key_id: MASTER_KEY_ID,
                signature: Vec::new(),
            },
            &MASTER_PRIVATE_KEY,
        )?;
        let result = platform
            .facade
            .validate(&transition, &ExecutionContext::new())
            .await?;
        assert_eq!(result.error_codes(), vec![2004]);
        Ok(())
    }

    // =========================================================================
    // DATA CONTRACT EVOLUTION
    // =========================================================================

    #[tokio::test]
    async fn test_version_counts_successful_updates() -> anyhow::Result<()> {
        let platform = TestPlatform::new()?;
        let contract = note_contract(platform.owner_id);
        register(&platform, &contract).await?;

        for _ in 0..3 {
            let stored = platform
                .repository
                .data_contract(&contract.id)
                .ok_or_else(|| anyhow::anyhow!("contract missing"))?;
            let codes = update(&platform, stored.next_version()).await?;
            assert!(codes.is_empty(), "{codes:?}");
        }

        let stored = platform
            .repository
            .data_contract(&contract.id)
            .ok_or_else(|| anyhow::anyhow!("contract missing"))?;
        assert_eq!(stored.version, contract.version + 3);

        let mut skipping = stored.next_version();
        skipping.version += 1;
        assert_eq!(update(&platform, skipping).await?, vec![1050]);

        let stale = stored.clone();
        assert_eq!(update(&platform, stale).await?, vec![1050]);
        Ok(())
    }

    #[tokio::test]
    async fn test_removing_required_property_is_incompatible() -> anyhow::Result<()> {
        let platform = TestPlatform::new()?;
        let contract = note_contract(platform.owner_id);
        register(&platform, &contract).await?;

        let mut updated = contract.next_version();
        updated.documents.insert(
            "note".to_string(),
            json!({
                "type": "object",
                "properties": {
                    "text": {"type": "string", "maxLength": 1024}
                },
                "additionalProperties": false
            }),
        );
        assert_eq!(update(&platform, updated).await?, vec![1051]);

        let stored = platform
            .repository
            .data_contract(&contract.id)
            .ok_or_else(|| anyhow::anyhow!("contract missing"))?;
        assert_eq!(stored.version, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_adding_optional_property_is_compatible() -> anyhow::Result<()> {
        let platform = TestPlatform::new()?;
        let contract = note_contract(platform.owner_id);
        register(&platform, &contract).await?;

        let mut updated = contract.next_version();
        updated.documents.insert(
            "note".to_string(),
            json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "maxLength": 63},
                    "text": {"type": "string", "maxLength": 1024},
                    "subtitle": {"type": "string", "maxLength": 63}
                },
                "required": ["title"],
                "additionalProperties": false
            }),
        );
        let codes = update(&platform, updated).await?;
        assert!(codes.is_empty(), "{codes:?}");
        Ok(())
    }
}
