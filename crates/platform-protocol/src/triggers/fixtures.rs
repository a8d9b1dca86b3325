//! Shared setup for trigger tests.

use super::DataTriggerExecutionContext;
use crate::adapters::InMemoryStateRepository;
use crate::domain::ExecutionContext;
use serde_json::json;
use shared_types::{DataContract, Identifier};
use std::collections::BTreeMap;

pub(crate) struct TriggerFixture {
    pub repository: InMemoryStateRepository,
    pub owner_id: Identifier,
    pub data_contract: DataContract,
    pub execution_context: ExecutionContext,
}

impl TriggerFixture {
    pub fn new(owner_id: Identifier) -> Self {
        let data_contract = DataContract::new(
            Identifier::new([42; 32]),
            [42; 32],
            1,
            BTreeMap::from([("document".to_string(), json!({"type": "object"}))]),
            BTreeMap::new(),
        );
        Self {
            repository: InMemoryStateRepository::new(),
            owner_id,
            data_contract,
            execution_context: ExecutionContext::new(),
        }
    }

    pub fn context(&self) -> DataTriggerExecutionContext<'_> {
        DataTriggerExecutionContext {
            repository: &self.repository,
            owner_id: &self.owner_id,
            data_contract: &self.data_contract,
            state_transition_execution_context: &self.execution_context,
        }
    }
}
