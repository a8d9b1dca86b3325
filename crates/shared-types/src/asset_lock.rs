//! # Asset Lock Proofs
//!
//! Evidence that core-chain funds were locked to fund an identity.
//!
//! ## Variants
//!
//! - **Instant**: an instant-lock plus the full funding transaction
//! - **Chain**: a chain-locked core height plus an out-point, the
//!   transaction itself is fetched from the state repository
//!
//! Both variants identify a single transaction output whose OP_RETURN
//! payload is the HASH160 of the one-time public key that signs the
//! identity create/top-up transition.

use crate::hashing::hash_double;
use crate::identifier::Identifier;
use crate::Hash;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

/// Special transaction type of an asset-lock transaction.
pub const ASSET_LOCK_TRANSACTION_TYPE: u16 = 8;

/// OP_RETURN opcode.
pub const OP_RETURN: u8 = 0x6a;

/// Reference to a transaction output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: Hash,
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: Hash, vout: u32) -> Self {
        Self { txid, vout }
    }

    /// `txid ‖ vout` (little-endian), 36 bytes.
    pub fn to_bytes(&self) -> [u8; 36] {
        let mut bytes = [0u8; 36];
        bytes[..32].copy_from_slice(&self.txid);
        bytes[32..].copy_from_slice(&self.vout.to_le_bytes());
        bytes
    }
}

/// A transaction output.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOut {
    /// Value in duffs.
    pub value: u64,
    #[serde_as(as = "Bytes")]
    pub script_pubkey: Vec<u8>,
}

impl TxOut {
    /// Lock output paying to the HASH160 of a one-time key.
    pub fn op_return(value: u64, payload: &[u8]) -> Self {
        let mut script_pubkey = Vec::with_capacity(payload.len() + 2);
        script_pubkey.push(OP_RETURN);
        // Single-byte pushes only, which covers the 20-byte payload.
        script_pubkey.push(payload.len() as u8);
        script_pubkey.extend_from_slice(payload);
        Self {
            value,
            script_pubkey,
        }
    }

    pub fn is_op_return(&self) -> bool {
        self.script_pubkey.first() == Some(&OP_RETURN)
    }

    /// Data pushed after OP_RETURN, if this is an OP_RETURN output.
    pub fn op_return_data(&self) -> Option<&[u8]> {
        if !self.is_op_return() {
            return None;
        }
        Some(self.script_pubkey.get(2..).unwrap_or_default())
    }
}

/// A core-chain transaction, reduced to what asset locks need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreTransaction {
    pub version: u16,
    pub tx_type: u16,
    pub inputs: Vec<OutPoint>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl CoreTransaction {
    /// Transaction id: double SHA-256 of the canonical byte layout.
    pub fn txid(&self) -> Hash {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&self.version.to_le_bytes());
        buffer.extend_from_slice(&self.tx_type.to_le_bytes());
        buffer.extend_from_slice(&(self.inputs.len() as u32).to_le_bytes());
        for input in &self.inputs {
            buffer.extend_from_slice(&input.to_bytes());
        }
        buffer.extend_from_slice(&(self.outputs.len() as u32).to_le_bytes());
        for output in &self.outputs {
            buffer.extend_from_slice(&output.value.to_le_bytes());
            buffer.extend_from_slice(&(output.script_pubkey.len() as u32).to_le_bytes());
            buffer.extend_from_slice(&output.script_pubkey);
        }
        buffer.extend_from_slice(&self.lock_time.to_le_bytes());
        hash_double(&buffer)
    }

    pub fn output(&self, index: u32) -> Option<&TxOut> {
        self.outputs.get(index as usize)
    }

    pub fn is_asset_lock(&self) -> bool {
        self.tx_type == ASSET_LOCK_TRANSACTION_TYPE
    }
}

/// A quorum-signed instant lock over a transaction.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstantLock {
    pub version: u8,
    pub inputs: Vec<OutPoint>,
    pub txid: Hash,
    pub cycle_hash: Hash,
    /// BLS quorum signature, 96 bytes.
    #[serde_as(as = "Bytes")]
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstantAssetLockProof {
    pub instant_lock: InstantLock,
    pub transaction: CoreTransaction,
    pub output_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainAssetLockProof {
    pub core_chain_locked_height: u32,
    pub out_point: OutPoint,
}

/// Proof that core-chain funds were locked for an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetLockProof {
    Instant(InstantAssetLockProof),
    Chain(ChainAssetLockProof),
}

impl AssetLockProof {
    /// The funding out-point.
    pub fn out_point(&self) -> OutPoint {
        match self {
            AssetLockProof::Instant(proof) => {
                OutPoint::new(proof.transaction.txid(), proof.output_index)
            }
            AssetLockProof::Chain(proof) => proof.out_point,
        }
    }

    /// Identifier of the identity this proof funds: `sha256d(out_point)`.
    pub fn create_identifier(&self) -> Identifier {
        Identifier::new(hash_double(&self.out_point().to_bytes()))
    }

    /// The funding output when the proof carries its transaction.
    pub fn output(&self) -> Option<&TxOut> {
        match self {
            AssetLockProof::Instant(proof) => proof.transaction.output(proof.output_index),
            AssetLockProof::Chain(_) => None,
        }
    }
}
