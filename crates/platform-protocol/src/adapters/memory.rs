//! # In-Memory State Repository
//!
//! A complete [`StateRepository`] over process memory, for tests, benches
//! and local tooling.
//!
//! ## Costing
//!
//! Every call records its operation in the caller's [`ExecutionContext`]:
//! reads as [`Operation::Read`], writes as [`Operation::write`] and removals
//! as [`Operation::delete`] refunding the removed bytes to the owner. In
//! dry-run mode writes are costed and recorded but never persisted.

use crate::domain::{ExecutionContext, Operation};
use crate::errors::StateRepositoryError;
use crate::ports::{DocumentQuery, RepositoryResult, StateRepository, TransactionData};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use shared_types::{
    BlockInfo, Credits, DataContract, Document, Hash, Identifier, Identity, IdentityPublicKey,
    InstantLock, KeyId, OutPoint, Revision, TimestampMillis,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

type DocumentKey = (Identifier, String);

#[derive(Debug, Default)]
struct Store {
    data_contracts: HashMap<Identifier, DataContract>,
    documents: HashMap<DocumentKey, BTreeMap<Identifier, Document>>,
    identities: HashMap<Identifier, Identity>,
    system_credits: Credits,
    transactions: HashMap<Hash, TransactionData>,
    used_out_points: HashSet<OutPoint>,
    block: BlockInfo,
    masternodes: HashSet<Identifier>,
    reject_instant_locks: bool,
}

/// Process-memory platform state.
#[derive(Debug, Default)]
pub struct InMemoryStateRepository {
    store: RwLock<Store>,
    calls: AtomicU64,
}

fn encoded_len<T: Serialize>(value: &T) -> u64 {
    bincode::serialized_size(value).unwrap_or_default()
}

impl InMemoryStateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_block_info(self, block: BlockInfo) -> Self {
        self.store.write().block = block;
        self
    }

    // === SEEDING (bypasses costing and the call counter) ===

    pub fn set_block_info(&self, block: BlockInfo) {
        self.store.write().block = block;
    }

    pub fn insert_data_contract(&self, data_contract: DataContract) {
        self.store
            .write()
            .data_contracts
            .insert(data_contract.id, data_contract);
    }

    pub fn insert_document(
        &self,
        data_contract_id: Identifier,
        document_type: &str,
        document: Document,
    ) {
        self.store
            .write()
            .documents
            .entry((data_contract_id, document_type.to_string()))
            .or_default()
            .insert(document.id, document);
    }

    pub fn insert_identity(&self, identity: Identity) {
        self.store.write().identities.insert(identity.id, identity);
    }

    pub fn insert_transaction(&self, data: TransactionData) {
        let txid = data.transaction.txid();
        self.store.write().transactions.insert(txid, data);
    }

    pub fn insert_masternode(&self, identity_id: Identifier) {
        self.store.write().masternodes.insert(identity_id);
    }

    pub fn mark_out_point_used(&self, out_point: OutPoint) {
        self.store.write().used_out_points.insert(out_point);
    }

    /// Make `verify_instant_lock` fail from now on.
    pub fn reject_instant_locks(&self, reject: bool) {
        self.store.write().reject_instant_locks = reject;
    }

    // === INSPECTION ===

    /// Repository calls made through the [`StateRepository`] trait.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset_call_count(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }

    pub fn data_contract(&self, id: &Identifier) -> Option<DataContract> {
        self.store.read().data_contracts.get(id).cloned()
    }

    pub fn document(
        &self,
        data_contract_id: &Identifier,
        document_type: &str,
        id: &Identifier,
    ) -> Option<Document> {
        self.store
            .read()
            .documents
            .get(&(*data_contract_id, document_type.to_string()))
            .and_then(|documents| documents.get(id))
            .cloned()
    }

    pub fn identity(&self, id: &Identifier) -> Option<Identity> {
        self.store.read().identities.get(id).cloned()
    }

    pub fn system_credits(&self) -> Credits {
        self.store.read().system_credits
    }

    pub fn is_out_point_used(&self, out_point: &OutPoint) -> bool {
        self.store.read().used_out_points.contains(out_point)
    }

    // === INTERNALS ===

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn read<T: Serialize>(&self, value: &T, context: &ExecutionContext) {
        context.add_operation(Operation::Read {
            value_size: encoded_len(value),
        });
    }

    /// Cost a write and report whether to persist it.
    fn write<T: Serialize>(&self, value: &T, context: &ExecutionContext) -> bool {
        context.add_operation(Operation::write(encoded_len(value)));
        !context.is_dry_run()
    }

    fn with_identity<F>(&self, id: &Identifier, update: F) -> RepositoryResult<()>
    where
        F: FnOnce(&mut Identity),
    {
        let mut store = self.store.write();
        let identity = store
            .identities
            .get_mut(id)
            .ok_or_else(|| StateRepositoryError::Storage(format!("identity {id} not found")))?;
        update(identity);
        Ok(())
    }
}

#[async_trait]
impl StateRepository for InMemoryStateRepository {
    async fn fetch_data_contract(
        &self,
        id: &Identifier,
        context: &ExecutionContext,
    ) -> RepositoryResult<Option<DataContract>> {
        self.record_call();
        let data_contract = self.data_contract(id);
        self.read(&data_contract, context);
        Ok(data_contract)
    }

    async fn store_data_contract(
        &self,
        data_contract: DataContract,
        context: &ExecutionContext,
    ) -> RepositoryResult<()> {
        self.record_call();
        if self.write(&data_contract, context) {
            self.insert_data_contract(data_contract);
        }
        Ok(())
    }

    async fn update_data_contract(
        &self,
        data_contract: DataContract,
        context: &ExecutionContext,
    ) -> RepositoryResult<()> {
        self.record_call();
        if self.write(&data_contract, context) {
            self.insert_data_contract(data_contract);
        }
        Ok(())
    }

    async fn fetch_documents(
        &self,
        data_contract_id: &Identifier,
        document_type: &str,
        query: &DocumentQuery,
        context: &ExecutionContext,
    ) -> RepositoryResult<Vec<Document>> {
        self.record_call();
        let documents: Vec<Document> = {
            let store = self.store.read();
            let matching = store
                .documents
                .get(&(*data_contract_id, document_type.to_string()))
                .into_iter()
                .flat_map(BTreeMap::values)
                .filter(|document| query.matches(document))
                .cloned();
            match query.limit {
                Some(limit) => matching.take(limit).collect(),
                None => matching.collect(),
            }
        };
        self.read(&documents, context);
        Ok(documents)
    }

    async fn create_document(
        &self,
        data_contract_id: &Identifier,
        document_type: &str,
        document: Document,
        context: &ExecutionContext,
    ) -> RepositoryResult<()> {
        self.record_call();
        if self.write(&document, context) {
            self.insert_document(*data_contract_id, document_type, document);
        }
        Ok(())
    }

    async fn update_document(
        &self,
        data_contract_id: &Identifier,
        document_type: &str,
        document: Document,
        context: &ExecutionContext,
    ) -> RepositoryResult<()> {
        self.record_call();
        if self.write(&document, context) {
            self.insert_document(*data_contract_id, document_type, document);
        }
        Ok(())
    }

    async fn remove_document(
        &self,
        data_contract_id: &Identifier,
        document_type: &str,
        document_id: &Identifier,
        context: &ExecutionContext,
    ) -> RepositoryResult<()> {
        self.record_call();
        let epoch = self.store.read().block.epoch;
        let Some(existing) = self.document(data_contract_id, document_type, document_id) else {
            return Err(StateRepositoryError::Storage(format!(
                "document {document_id} not found"
            )));
        };

        context.add_operation(Operation::delete(
            encoded_len(&existing),
            existing.owner_id,
            epoch,
        ));
        if !context.is_dry_run() {
            if let Some(documents) = self
                .store
                .write()
                .documents
                .get_mut(&(*data_contract_id, document_type.to_string()))
            {
                documents.remove(document_id);
            }
        }
        Ok(())
    }

    async fn fetch_identity(
        &self,
        id: &Identifier,
        context: &ExecutionContext,
    ) -> RepositoryResult<Option<Identity>> {
        self.record_call();
        let identity = self.identity(id);
        self.read(&identity, context);
        Ok(identity)
    }

    async fn create_identity(
        &self,
        identity: Identity,
        context: &ExecutionContext,
    ) -> RepositoryResult<()> {
        self.record_call();
        if self.write(&identity, context) {
            self.insert_identity(identity);
        }
        Ok(())
    }

    async fn add_keys_to_identity(
        &self,
        identity_id: &Identifier,
        keys: Vec<IdentityPublicKey>,
        context: &ExecutionContext,
    ) -> RepositoryResult<()> {
        self.record_call();
        if self.write(&keys, context) {
            self.with_identity(identity_id, |identity| identity.public_keys.extend(keys))?;
        }
        Ok(())
    }

    async fn disable_identity_keys(
        &self,
        identity_id: &Identifier,
        key_ids: &[KeyId],
        disabled_at: TimestampMillis,
        context: &ExecutionContext,
    ) -> RepositoryResult<()> {
        self.record_call();
        if self.write(&(key_ids, disabled_at), context) {
            self.with_identity(identity_id, |identity| {
                for key in identity
                    .public_keys
                    .iter_mut()
                    .filter(|key| key_ids.contains(&key.id))
                {
                    key.disabled_at = Some(disabled_at);
                }
            })?;
        }
        Ok(())
    }

    async fn update_identity_revision(
        &self,
        identity_id: &Identifier,
        revision: Revision,
        context: &ExecutionContext,
    ) -> RepositoryResult<()> {
        self.record_call();
        if self.write(&revision, context) {
            self.with_identity(identity_id, |identity| identity.revision = revision)?;
        }
        Ok(())
    }

    async fn fetch_identity_balance(
        &self,
        identity_id: &Identifier,
        context: &ExecutionContext,
    ) -> RepositoryResult<Option<Credits>> {
        self.record_call();
        let balance = self.identity(identity_id).map(|identity| identity.balance);
        self.read(&balance, context);
        Ok(balance)
    }

    async fn add_to_identity_balance(
        &self,
        identity_id: &Identifier,
        amount: Credits,
        context: &ExecutionContext,
    ) -> RepositoryResult<()> {
        self.record_call();
        if self.write(&amount, context) {
            self.with_identity(identity_id, |identity| {
                identity.balance = identity.balance.saturating_add(amount);
            })?;
        }
        Ok(())
    }

    async fn add_to_system_credits(
        &self,
        amount: Credits,
        context: &ExecutionContext,
    ) -> RepositoryResult<()> {
        self.record_call();
        if self.write(&amount, context) {
            let mut store = self.store.write();
            store.system_credits = store.system_credits.saturating_add(amount);
        }
        Ok(())
    }

    async fn fetch_latest_platform_block_header(
        &self,
        context: &ExecutionContext,
    ) -> RepositoryResult<BlockInfo> {
        self.record_call();
        let block = self.store.read().block;
        self.read(&block, context);
        Ok(block)
    }

    async fn fetch_transaction(
        &self,
        txid: &Hash,
        context: &ExecutionContext,
    ) -> RepositoryResult<Option<TransactionData>> {
        self.record_call();
        let data = self.store.read().transactions.get(txid).cloned();
        self.read(&data, context);
        Ok(data)
    }

    async fn is_asset_lock_transaction_out_point_already_used(
        &self,
        out_point: &OutPoint,
        context: &ExecutionContext,
    ) -> RepositoryResult<bool> {
        self.record_call();
        self.read(out_point, context);
        Ok(self.is_out_point_used(out_point))
    }

    async fn mark_asset_lock_transaction_out_point_as_used(
        &self,
        out_point: &OutPoint,
        context: &ExecutionContext,
    ) -> RepositoryResult<()> {
        self.record_call();
        if self.write(out_point, context) {
            self.mark_out_point_used(*out_point);
        }
        Ok(())
    }

    async fn verify_instant_lock(
        &self,
        instant_lock: &InstantLock,
        context: &ExecutionContext,
    ) -> RepositoryResult<bool> {
        self.record_call();
        self.read(instant_lock, context);
        Ok(!self.store.read().reject_instant_locks)
    }

    async fn is_in_the_valid_master_nodes_list(
        &self,
        identity_id: &Identifier,
        context: &ExecutionContext,
    ) -> RepositoryResult<bool> {
        self.record_call();
        self.read(identity_id, context);
        Ok(self.store.read().masternodes.contains(identity_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(id: u8, label: &str) -> Document {
        Document {
            id: Identifier::new([id; 32]),
            owner_id: Identifier::new([9; 32]),
            revision: 1,
            created_at: None,
            updated_at: None,
            data: json!({ "label": label }),
        }
    }

    #[tokio::test]
    async fn test_dry_run_writes_are_costed_not_persisted() {
        let repository = InMemoryStateRepository::new();
        let contract_id = Identifier::new([1; 32]);
        let context = ExecutionContext::dry_run();

        repository
            .create_document(&contract_id, "note", document(2, "a"), &context)
            .await
            .unwrap();

        assert!(repository
            .document(&contract_id, "note", &Identifier::new([2; 32]))
            .is_none());
        assert_eq!(context.dry_operations().len(), 1);
        assert!(context.operations().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_documents_filters_and_counts_calls() {
        let repository = InMemoryStateRepository::new();
        let contract_id = Identifier::new([1; 32]);
        repository.insert_document(contract_id, "note", document(2, "a"));
        repository.insert_document(contract_id, "note", document(3, "b"));
        let context = ExecutionContext::new();

        let query = DocumentQuery::new().with_equal("label", json!("b"));
        let found = repository
            .fetch_documents(&contract_id, "note", &query, &context)
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, Identifier::new([3; 32]));
        assert_eq!(repository.call_count(), 1);
        assert!(matches!(
            context.operations().as_slice(),
            [Operation::Read { .. }]
        ));
    }

    #[tokio::test]
    async fn test_remove_document_refunds_owner() {
        let repository = InMemoryStateRepository::new();
        let contract_id = Identifier::new([1; 32]);
        repository.insert_document(contract_id, "note", document(2, "a"));
        let context = ExecutionContext::new();

        repository
            .remove_document(&contract_id, "note", &Identifier::new([2; 32]), &context)
            .await
            .unwrap();

        let operations = context.operations();
        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].refunds()[0].identifier, Identifier::new([9; 32]));
        assert!(repository
            .document(&contract_id, "note", &Identifier::new([2; 32]))
            .is_none());
    }

    #[tokio::test]
    async fn test_balance_and_system_credits() {
        let repository = InMemoryStateRepository::new();
        let identity = Identity {
            id: Identifier::new([4; 32]),
            protocol_version: 1,
            public_keys: Vec::new(),
            balance: 10,
            revision: 0,
            metadata: None,
        };
        repository.insert_identity(identity.clone());
        let context = ExecutionContext::new();

        repository
            .add_to_identity_balance(&identity.id, 5, &context)
            .await
            .unwrap();
        repository.add_to_system_credits(5, &context).await.unwrap();

        assert_eq!(
            repository
                .fetch_identity_balance(&identity.id, &context)
                .await
                .unwrap(),
            Some(15)
        );
        assert_eq!(repository.system_credits(), 5);
    }
}
