//! # Data Triggers
//!
//! Contract-specific rules run against document transitions before a
//! documents batch is accepted.
//!
//! The registry maps `(data contract id, document type, action)` to an
//! ordered list of triggers. It is built once from [`SystemContracts`] and
//! never mutated afterwards.
//!
//! | Contract | Type | Action | Trigger |
//! |----------|------|--------|---------|
//! | DPNS | `domain` | create | [`dpns::create_domain_data_trigger`] |
//! | DPNS | `domain`, `preorder` | replace, delete | reject |
//! | DashPay | `contactRequest` | create | [`dashpay::create_contact_request_data_trigger`] |
//! | DashPay | `contactRequest` | replace, delete | reject |
//! | Feature flags | any | create | [`feature_flags::create_feature_flag_data_trigger`] |
//! | Feature flags | any | replace, delete | reject |
//! | Reward shares | `rewardShare` | create, replace | [`reward_share::create_masternode_reward_shares_data_trigger`] |
//! | Withdrawals | `withdrawal` | delete | [`withdrawals::delete_withdrawal_data_trigger`] |
//! | Withdrawals | `withdrawal` | replace | reject |
//!
//! A trigger reports rule violations as DataTriggerCondition (4001) in its
//! result. A trigger that cannot run (missing or malformed document data)
//! becomes DataTriggerExecution (4002). A result carrying anything other
//! than condition errors about the triggering transition becomes
//! DataTriggerInvalidResult (4003). Repository failures are not consensus
//! errors and propagate.

pub mod dashpay;
pub mod dpns;
pub mod feature_flags;
pub mod reject;
pub mod reward_share;
pub mod withdrawals;

#[cfg(test)]
pub(crate) mod fixtures;

use crate::config::SystemContracts;
use crate::domain::{
    DocumentTransition, DocumentTransitionAction, ExecutionContext, ValidationResult,
};
use crate::errors::{ConsensusError, ProtocolError, StateError, StateRepositoryError};
use crate::ports::StateRepository;
use serde_json::Value as JsonValue;
use shared_types::document::get_path;
use shared_types::{DataContract, Identifier};
use thiserror::Error;
use tracing::debug;

// =============================================================================
// EXECUTION CONTEXT AND RESULT
// =============================================================================

/// What a trigger may consult.
#[derive(Clone, Copy)]
pub struct DataTriggerExecutionContext<'a> {
    pub repository: &'a dyn StateRepository,
    /// Owner of the documents batch.
    pub owner_id: &'a Identifier,
    pub data_contract: &'a DataContract,
    pub state_transition_execution_context: &'a ExecutionContext,
}

impl DataTriggerExecutionContext<'_> {
    pub fn is_dry_run(&self) -> bool {
        self.state_transition_execution_context.is_dry_run()
    }
}

/// Errors a trigger reported for one document transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataTriggerExecutionResult {
    errors: Vec<StateError>,
}

impl DataTriggerExecutionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: StateError) {
        self.errors.push(error);
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[StateError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<StateError> {
        self.errors
    }
}

/// Why a trigger could not run.
#[derive(Debug, Error)]
pub enum DataTriggerError {
    /// The document lacks data the trigger needs.
    #[error("{0}")]
    Execution(String),

    #[error(transparent)]
    Repository(#[from] StateRepositoryError),
}

pub type DataTriggerOutcome = Result<DataTriggerExecutionResult, DataTriggerError>;

/// A condition error about `transition`.
pub(crate) fn condition_error(
    context: &DataTriggerExecutionContext<'_>,
    transition: &DocumentTransition,
    message: impl Into<String>,
) -> StateError {
    StateError::DataTriggerCondition {
        data_contract_id: context.data_contract.id,
        document_transition_id: transition.id(),
        message: message.into(),
    }
}

// =============================================================================
// DOCUMENT DATA ACCESS
// =============================================================================

fn data_value<'a>(
    transition: &'a DocumentTransition,
    path: &str,
) -> Result<&'a JsonValue, DataTriggerError> {
    transition
        .data()
        .and_then(|data| get_path(data, path))
        .ok_or_else(|| DataTriggerError::Execution(format!("property '{path}' doesn't exist")))
}

fn optional_data_value<'a>(transition: &'a DocumentTransition, path: &str) -> Option<&'a JsonValue> {
    transition
        .data()
        .and_then(|data| get_path(data, path))
        .filter(|value| !value.is_null())
}

pub(crate) fn get_str<'a>(
    transition: &'a DocumentTransition,
    path: &str,
) -> Result<&'a str, DataTriggerError> {
    data_value(transition, path)?
        .as_str()
        .ok_or_else(|| DataTriggerError::Execution(format!("property '{path}' is not a string")))
}

pub(crate) fn get_u64(transition: &DocumentTransition, path: &str) -> Result<u64, DataTriggerError> {
    data_value(transition, path)?.as_u64().ok_or_else(|| {
        DataTriggerError::Execution(format!("property '{path}' is not an unsigned integer"))
    })
}

pub(crate) fn get_optional_u64(
    transition: &DocumentTransition,
    path: &str,
) -> Result<Option<u64>, DataTriggerError> {
    optional_data_value(transition, path)
        .map(|value| {
            value.as_u64().ok_or_else(|| {
                DataTriggerError::Execution(format!("property '{path}' is not an unsigned integer"))
            })
        })
        .transpose()
}

pub(crate) fn get_bool_or_false(
    transition: &DocumentTransition,
    path: &str,
) -> Result<bool, DataTriggerError> {
    optional_data_value(transition, path)
        .map(|value| {
            value.as_bool().ok_or_else(|| {
                DataTriggerError::Execution(format!("property '{path}' is not a boolean"))
            })
        })
        .transpose()
        .map(Option::unwrap_or_default)
}

pub(crate) fn get_bytes(
    transition: &DocumentTransition,
    path: &str,
) -> Result<Vec<u8>, DataTriggerError> {
    let malformed = || DataTriggerError::Execution(format!("property '{path}' is not a byte array"));
    data_value(transition, path)?
        .as_array()
        .ok_or_else(malformed)?
        .iter()
        .map(|item| {
            item.as_u64()
                .and_then(|byte| u8::try_from(byte).ok())
                .ok_or_else(malformed)
        })
        .collect()
}

pub(crate) fn get_identifier(
    transition: &DocumentTransition,
    path: &str,
) -> Result<Identifier, DataTriggerError> {
    let value = data_value(transition, path)?;
    Identifier::from_json(value)
        .map_err(|e| DataTriggerError::Execution(format!("property '{path}': {e}")))
}

pub(crate) fn get_optional_identifier(
    transition: &DocumentTransition,
    path: &str,
) -> Result<Option<Identifier>, DataTriggerError> {
    optional_data_value(transition, path)
        .map(|value| {
            Identifier::from_json(value)
                .map_err(|e| DataTriggerError::Execution(format!("property '{path}': {e}")))
        })
        .transpose()
}

// =============================================================================
// TRIGGERS AND REGISTRY
// =============================================================================

/// Trigger implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataTriggerKind {
    CreateDomain,
    CreateContactRequest,
    CreateFeatureFlag,
    CreateRewardShare,
    DeleteWithdrawal,
    Reject,
}

/// A trigger bound to a contract, document type and action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTrigger {
    pub data_contract_id: Identifier,
    /// `None` binds every document type of the contract.
    pub document_type: Option<String>,
    pub action: DocumentTransitionAction,
    pub kind: DataTriggerKind,
    /// Identity allowed to perform top-level operations.
    pub top_level_identity: Option<Identifier>,
}

impl DataTrigger {
    pub fn new(
        data_contract_id: Identifier,
        document_type: Option<&str>,
        action: DocumentTransitionAction,
        kind: DataTriggerKind,
    ) -> Self {
        Self {
            data_contract_id,
            document_type: document_type.map(str::to_string),
            action,
            kind,
            top_level_identity: None,
        }
    }

    pub fn with_top_level_identity(mut self, identity: Option<Identifier>) -> Self {
        self.top_level_identity = identity;
        self
    }

    pub fn is_matching(
        &self,
        data_contract_id: &Identifier,
        document_type: &str,
        action: DocumentTransitionAction,
    ) -> bool {
        self.data_contract_id == *data_contract_id
            && self.action == action
            && self
                .document_type
                .as_deref()
                .map_or(true, |bound| bound == document_type)
    }

    /// Run the trigger against `transition`.
    pub async fn execute(
        &self,
        transition: &DocumentTransition,
        context: &DataTriggerExecutionContext<'_>,
    ) -> DataTriggerOutcome {
        let top_level_identity = self.top_level_identity.as_ref();
        match self.kind {
            DataTriggerKind::CreateDomain => {
                dpns::create_domain_data_trigger(transition, context, top_level_identity).await
            }
            DataTriggerKind::CreateContactRequest => {
                dashpay::create_contact_request_data_trigger(transition, context).await
            }
            DataTriggerKind::CreateFeatureFlag => {
                feature_flags::create_feature_flag_data_trigger(transition, context, top_level_identity)
                    .await
            }
            DataTriggerKind::CreateRewardShare => {
                reward_share::create_masternode_reward_shares_data_trigger(transition, context).await
            }
            DataTriggerKind::DeleteWithdrawal => {
                withdrawals::delete_withdrawal_data_trigger(transition, context).await
            }
            DataTriggerKind::Reject => Ok(reject::reject_data_trigger(transition, context)),
        }
    }
}

/// Immutable trigger bindings, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataTriggerRegistry {
    triggers: Vec<DataTrigger>,
}

impl DataTriggerRegistry {
    pub fn new(triggers: Vec<DataTrigger>) -> Self {
        Self { triggers }
    }

    /// Bindings of the configured system contracts.
    pub fn from_system_contracts(contracts: &SystemContracts) -> Self {
        use DataTriggerKind::*;
        use DocumentTransitionAction::{Create, Delete, Replace};

        let mut triggers = Vec::new();

        if let Some(id) = contracts.dpns_contract_id {
            triggers.push(
                DataTrigger::new(id, Some(dpns::DOMAIN_DOCUMENT), Create, CreateDomain)
                    .with_top_level_identity(contracts.dpns_top_level_identity),
            );
            for document_type in [dpns::DOMAIN_DOCUMENT, dpns::PREORDER_DOCUMENT] {
                triggers.push(DataTrigger::new(id, Some(document_type), Replace, Reject));
                triggers.push(DataTrigger::new(id, Some(document_type), Delete, Reject));
            }
        }

        if let Some(id) = contracts.dashpay_contract_id {
            let document_type = Some(dashpay::CONTACT_REQUEST_DOCUMENT);
            triggers.push(DataTrigger::new(id, document_type, Create, CreateContactRequest));
            triggers.push(DataTrigger::new(id, document_type, Replace, Reject));
            triggers.push(DataTrigger::new(id, document_type, Delete, Reject));
        }

        if let Some(id) = contracts.feature_flags_contract_id {
            triggers.push(
                DataTrigger::new(id, None, Create, CreateFeatureFlag)
                    .with_top_level_identity(contracts.feature_flags_top_level_identity),
            );
            triggers.push(DataTrigger::new(id, None, Replace, Reject));
            triggers.push(DataTrigger::new(id, None, Delete, Reject));
        }

        if let Some(id) = contracts.masternode_reward_shares_contract_id {
            let document_type = Some(reward_share::REWARD_SHARE_DOCUMENT);
            triggers.push(DataTrigger::new(id, document_type, Create, CreateRewardShare));
            triggers.push(DataTrigger::new(id, document_type, Replace, CreateRewardShare));
        }

        if let Some(id) = contracts.withdrawals_contract_id {
            let document_type = Some(withdrawals::WITHDRAWAL_DOCUMENT);
            triggers.push(DataTrigger::new(id, document_type, Delete, DeleteWithdrawal));
            triggers.push(DataTrigger::new(id, document_type, Replace, Reject));
        }

        Self { triggers }
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}

/// Triggers bound to a contract, document type and action, in
/// registration order.
pub fn get_data_triggers<'a>(
    registry: &'a DataTriggerRegistry,
    data_contract_id: &Identifier,
    document_type: &str,
    action: DocumentTransitionAction,
) -> Vec<&'a DataTrigger> {
    registry
        .triggers
        .iter()
        .filter(|trigger| trigger.is_matching(data_contract_id, document_type, action))
        .collect()
}

/// Keep condition errors about `transition`. Anything else means the
/// trigger broke its contract.
fn checked_result(
    result: DataTriggerExecutionResult,
    transition: &DocumentTransition,
    data_contract_id: Identifier,
) -> Vec<StateError> {
    let consistent = result.errors().iter().all(|error| {
        matches!(
            error,
            StateError::DataTriggerCondition { data_contract_id: contract, document_transition_id, .. }
                if *contract == data_contract_id && *document_transition_id == transition.id()
        )
    });
    if consistent {
        result.into_errors()
    } else {
        vec![StateError::DataTriggerInvalidResult {
            data_contract_id,
            document_transition_id: transition.id(),
        }]
    }
}

/// Run every applicable trigger for each transition and collect their
/// errors into one result.
pub async fn execute_data_triggers(
    registry: &DataTriggerRegistry,
    transitions: &[&DocumentTransition],
    context: &DataTriggerExecutionContext<'_>,
) -> Result<ValidationResult, ProtocolError> {
    let mut result = ValidationResult::valid();

    for transition in transitions {
        let data_contract_id = transition.data_contract_id();
        let triggers = get_data_triggers(
            registry,
            &data_contract_id,
            transition.document_type(),
            transition.action(),
        );

        for trigger in triggers {
            let errors = match trigger.execute(transition, context).await {
                Ok(outcome) => checked_result(outcome, transition, data_contract_id),
                Err(DataTriggerError::Repository(e)) => return Err(e.into()),
                Err(DataTriggerError::Execution(message)) => {
                    debug!(
                        document_transition_id = %transition.id(),
                        trigger = ?trigger.kind,
                        %message,
                        "Data trigger failed to execute"
                    );
                    vec![StateError::DataTriggerExecution {
                        data_contract_id,
                        document_transition_id: transition.id(),
                        message,
                    }]
                }
            };
            result.add_errors(errors.into_iter().map(ConsensusError::from));
        }
    }

    Ok(result)
}
