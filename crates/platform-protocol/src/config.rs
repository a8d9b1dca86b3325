//! Engine configuration.
//!
//! Invalid configuration is the only fatal precondition of the engine: it
//! surfaces as [`ConfigError`] at construction time, never as a consensus
//! error.

use crate::errors::ProtocolError;
use shared_types::{Identifier, ProtocolVersion, LATEST_PROTOCOL_VERSION};
use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("{variable} is not a base58 identifier: {message}")]
    InvalidIdentifier { variable: &'static str, message: String },
}

impl From<ConfigError> for ProtocolError {
    fn from(error: ConfigError) -> Self {
        ProtocolError::InvalidConfiguration(error.to_string())
    }
}

// =============================================================================
// SYSTEM CONTRACTS
// =============================================================================

/// Contracts with built-in data triggers, and their top-level identities.
///
/// An unset contract id disables its triggers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemContracts {
    pub dpns_contract_id: Option<Identifier>,
    pub dpns_top_level_identity: Option<Identifier>,
    pub dashpay_contract_id: Option<Identifier>,
    pub feature_flags_contract_id: Option<Identifier>,
    pub feature_flags_top_level_identity: Option<Identifier>,
    pub masternode_reward_shares_contract_id: Option<Identifier>,
    pub withdrawals_contract_id: Option<Identifier>,
}

impl SystemContracts {
    /// Read contract ids and identities from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DPNS_CONTRACT_ID`, `DPNS_TOP_LEVEL_IDENTITY`
    /// - `DASHPAY_CONTRACT_ID`
    /// - `FEATURE_FLAGS_CONTRACT_ID`, `FEATURE_FLAGS_TOP_LEVEL_IDENTITY`
    /// - `MN_REWARD_SHARES_CONTRACT_ID`
    /// - `WITHDRAWALS_CONTRACT_ID`
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dpns_contract_id: identifier_var("DPNS_CONTRACT_ID")?,
            dpns_top_level_identity: identifier_var("DPNS_TOP_LEVEL_IDENTITY")?,
            dashpay_contract_id: identifier_var("DASHPAY_CONTRACT_ID")?,
            feature_flags_contract_id: identifier_var("FEATURE_FLAGS_CONTRACT_ID")?,
            feature_flags_top_level_identity: identifier_var("FEATURE_FLAGS_TOP_LEVEL_IDENTITY")?,
            masternode_reward_shares_contract_id: identifier_var("MN_REWARD_SHARES_CONTRACT_ID")?,
            withdrawals_contract_id: identifier_var("WITHDRAWALS_CONTRACT_ID")?,
        })
    }
}

fn identifier_var(variable: &'static str) -> Result<Option<Identifier>, ConfigError> {
    match env::var(variable) {
        Ok(text) if !text.trim().is_empty() => Identifier::from_base58(text.trim())
            .map(Some)
            .map_err(|e| ConfigError::InvalidIdentifier {
                variable,
                message: e.to_string(),
            }),
        _ => Ok(None),
    }
}

fn number_var<T: FromStr>(variable: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(variable) {
        Ok(text) => text.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            field: variable,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

// =============================================================================
// PROTOCOL CONFIG
// =============================================================================

/// Limits and versions of the validation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Version new entities are created with and the highest accepted.
    pub protocol_version: ProtocolVersion,
    /// Lowest accepted protocol version.
    pub min_protocol_version: ProtocolVersion,
    /// Largest accepted encoded transition, in bytes.
    pub max_state_transition_size: usize,
    /// Allowed distance of client timestamps from block time.
    pub block_time_window_ms: u64,
    pub max_identity_public_keys: usize,
    /// Deepest contract schema, counted with local `$ref`s resolved.
    ///
    /// Schemas decoded from the wire are parsed by `serde_json`, which stops
    /// at 128 levels of raw nesting. Above that the limit is reached only
    /// through `$ref` chains or by contracts built in process.
    pub max_data_contract_depth: usize,
    /// Most unique indices one document type may define.
    pub unique_index_limit: usize,
    pub system_contracts: SystemContracts,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            protocol_version: LATEST_PROTOCOL_VERSION,
            min_protocol_version: 1,
            max_state_transition_size: 20_480,
            block_time_window_ms: 300_000,
            max_identity_public_keys: 10,
            max_data_contract_depth: 500,
            unique_index_limit: 3,
            system_contracts: SystemContracts::default(),
        }
    }
}

impl ProtocolConfig {
    /// Defaults overridden by environment variables, then validated.
    ///
    /// # Environment Variables
    ///
    /// - `PP_PROTOCOL_VERSION`, `PP_MIN_PROTOCOL_VERSION`
    /// - `PP_MAX_STATE_TRANSITION_SIZE`
    /// - `PP_BLOCK_TIME_WINDOW_MS`
    /// - `PP_MAX_IDENTITY_PUBLIC_KEYS`
    /// - `PP_MAX_DATA_CONTRACT_DEPTH`
    /// - `PP_UNIQUE_INDEX_LIMIT`
    /// - system contract variables, see [`SystemContracts::from_env`]
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            protocol_version: number_var("PP_PROTOCOL_VERSION", defaults.protocol_version)?,
            min_protocol_version: number_var(
                "PP_MIN_PROTOCOL_VERSION",
                defaults.min_protocol_version,
            )?,
            max_state_transition_size: number_var(
                "PP_MAX_STATE_TRANSITION_SIZE",
                defaults.max_state_transition_size,
            )?,
            block_time_window_ms: number_var(
                "PP_BLOCK_TIME_WINDOW_MS",
                defaults.block_time_window_ms,
            )?,
            max_identity_public_keys: number_var(
                "PP_MAX_IDENTITY_PUBLIC_KEYS",
                defaults.max_identity_public_keys,
            )?,
            max_data_contract_depth: number_var(
                "PP_MAX_DATA_CONTRACT_DEPTH",
                defaults.max_data_contract_depth,
            )?,
            unique_index_limit: number_var("PP_UNIQUE_INDEX_LIMIT", defaults.unique_index_limit)?,
            system_contracts: SystemContracts::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol_version == 0 || self.protocol_version > LATEST_PROTOCOL_VERSION {
            return Err(ConfigError::InvalidValue {
                field: "protocol_version",
                reason: format!(
                    "{} is outside 1..={LATEST_PROTOCOL_VERSION}",
                    self.protocol_version
                ),
            });
        }
        if self.min_protocol_version == 0 || self.min_protocol_version > self.protocol_version {
            return Err(ConfigError::InvalidValue {
                field: "min_protocol_version",
                reason: format!(
                    "{} must be between 1 and protocol_version {}",
                    self.min_protocol_version, self.protocol_version
                ),
            });
        }

        let positive = [
            ("max_state_transition_size", self.max_state_transition_size),
            ("max_identity_public_keys", self.max_identity_public_keys),
            ("max_data_contract_depth", self.max_data_contract_depth),
            ("unique_index_limit", self.unique_index_limit),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }
}
