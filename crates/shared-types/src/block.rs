//! Platform chain facts observed by validation.

use crate::{EpochIndex, ProtocolVersion, TimestampMillis};
use serde::{Deserialize, Serialize};

/// The latest platform block as seen by the state repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    /// Platform block height.
    pub height: u64,
    /// Platform block time.
    pub time_ms: TimestampMillis,
    /// Core chain height locked by the latest chain lock.
    pub core_chain_locked_height: u32,
    /// Fee epoch of the block.
    pub epoch: EpochIndex,
}

/// Where and when an entity was last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub block_height: u64,
    pub core_chain_locked_height: u32,
    pub time_ms: TimestampMillis,
    pub protocol_version: ProtocolVersion,
}
