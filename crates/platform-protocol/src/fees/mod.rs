//! # Fees
//!
//! Credit costs of operations, the fee of a state transition and the
//! balance check of the fee stage.

pub mod calculator;
pub mod validator;

pub use calculator::{
    calculate_operation_fees, calculate_state_transition_fee,
    calculate_state_transition_fee_from_operations, DummyFeesResult, FeeResult,
};
pub use validator::validate_state_transition_fee;

use shared_types::{Credits, KeyType};

// =============================================================================
// COST TABLE
// =============================================================================

/// Credit costs of billable work.
pub mod costs {
    use shared_types::Credits;

    /// Storage credits per stored byte.
    pub const STORAGE_CREDIT_PER_BYTE: Credits = 5_000;
    /// Processing credits per processed byte.
    pub const PROCESSING_CREDIT_PER_BYTE: Credits = 12;

    /// Base processing cost of a read.
    pub const READ_BASE_PROCESSING_COST: Credits = 8_400;
    /// Base processing cost of a write.
    pub const WRITE_BASE_PROCESSING_COST: Credits = 6_000;
    /// Base processing cost of a delete.
    pub const DELETE_BASE_PROCESSING_COST: Credits = 2_000;

    // Signature verification
    /// ECDSA_SECP256K1 verification.
    pub const SIGNATURE_ECDSA_SECP256K1: Credits = 3_000;
    /// BLS12_381 verification.
    pub const SIGNATURE_BLS12_381: Credits = 6_000;
    /// ECDSA_HASH160 verification (recovery plus hash).
    pub const SIGNATURE_ECDSA_HASH160: Credits = 4_000;
    /// BIP13_SCRIPT_HASH verification.
    pub const SIGNATURE_BIP13_SCRIPT_HASH: Credits = 6_000;

    /// Tip added on top of every fee.
    pub const DEFAULT_USER_TIP: Credits = 0;

    /// Credits per core-chain duff.
    pub const CREDITS_PER_DUFF: Credits = 1_000;

    pub use super::signature_verification_cost;
}

/// Processing cost of verifying one signature of `key_type`.
pub const fn signature_verification_cost(key_type: KeyType) -> Credits {
    match key_type {
        KeyType::EcdsaSecp256k1 => costs::SIGNATURE_ECDSA_SECP256K1,
        KeyType::Bls12_381 => costs::SIGNATURE_BLS12_381,
        KeyType::EcdsaHash160 => costs::SIGNATURE_ECDSA_HASH160,
        KeyType::Bip13ScriptHash => costs::SIGNATURE_BIP13_SCRIPT_HASH,
    }
}

/// Credits for an asset-lock output of `duffs`.
pub fn duffs_to_credits(duffs: u64) -> Credits {
    duffs.saturating_mul(costs::CREDITS_PER_DUFF)
}
