//! # Asset Lock Proofs
//!
//! Ties identity funding to a locked core-chain output.
//!
//! ## Checks
//!
//! | Proof | Rule | Code |
//! |-------|------|------|
//! | both | output exists | 1034 |
//! | both | output is OP_RETURN | 1039 |
//! | both | OP_RETURN payload is a 20-byte key hash | 1037 |
//! | both | transaction is a special asset-lock transaction | 1038 |
//! | both | out-point not used yet | 1033 |
//! | instant | instant lock is well-formed | 1041 |
//! | instant | instant lock is for this transaction | 1031 |
//! | instant | instant lock signature verifies | 1042 |
//! | chain | proof height not above platform core height | 1035 |
//! | chain | transaction is known | 1032 |
//! | chain | transaction mined at or below proof height | 1036 |

use crate::domain::{ExecutionContext, ValidationResult};
use crate::errors::{BasicError, ProtocolError};
use crate::ports::StateRepository;
use shared_types::{
    AssetLockProof, ChainAssetLockProof, CoreTransaction, InstantAssetLockProof, OutPoint, TxOut,
};
use tracing::debug;

/// Length of the one-time key hash an asset-lock output pays to.
pub const PUBLIC_KEY_HASH_LENGTH: usize = 20;

/// Length of the quorum BLS signature of an instant lock.
pub const INSTANT_LOCK_SIGNATURE_LENGTH: usize = 96;

/// Validate the locked output of `transaction`, returning it on success.
pub async fn validate_asset_lock_transaction(
    repository: &dyn StateRepository,
    transaction: &CoreTransaction,
    output_index: u32,
    context: &ExecutionContext,
) -> Result<ValidationResult<TxOut>, ProtocolError> {
    let Some(output) = transaction.output(output_index) else {
        return Ok(ValidationResult::invalid(
            BasicError::IdentityAssetLockTransactionOutputNotFound { output_index },
        ));
    };

    let Some(payload) = output.op_return_data() else {
        return Ok(ValidationResult::invalid(
            BasicError::InvalidIdentityAssetLockTransactionOutput { output_index },
        ));
    };
    if payload.len() != PUBLIC_KEY_HASH_LENGTH {
        return Ok(ValidationResult::invalid(
            BasicError::InvalidAssetLockTransactionOutputReturnSize { output_index },
        ));
    }

    if !transaction.is_asset_lock() {
        return Ok(ValidationResult::invalid(
            BasicError::InvalidIdentityAssetLockTransaction {
                message: format!(
                    "transaction type {} is not an asset lock",
                    transaction.tx_type
                ),
            },
        ));
    }

    let txid = transaction.txid();
    let out_point = OutPoint::new(txid, output_index);
    if repository
        .is_asset_lock_transaction_out_point_already_used(&out_point, context)
        .await?
    {
        debug!(txid = %hex::encode(txid), output_index, "Asset lock out-point already used");
        return Ok(ValidationResult::invalid(
            BasicError::IdentityAssetLockTransactionOutPointAlreadyExists {
                txid: hex::encode(txid),
                output_index,
            },
        ));
    }

    Ok(ValidationResult::valid_with_data(output.clone()))
}

async fn validate_instant_proof(
    repository: &dyn StateRepository,
    proof: &InstantAssetLockProof,
    context: &ExecutionContext,
) -> Result<ValidationResult<TxOut>, ProtocolError> {
    let lock = &proof.instant_lock;
    if lock.inputs.is_empty() || lock.signature.len() != INSTANT_LOCK_SIGNATURE_LENGTH {
        return Ok(ValidationResult::invalid(
            BasicError::InvalidInstantAssetLockProof {
                message: format!(
                    "instant lock has {} inputs and a {}-byte signature",
                    lock.inputs.len(),
                    lock.signature.len()
                ),
            },
        ));
    }

    let txid = proof.transaction.txid();
    if proof.instant_lock.txid != txid {
        return Ok(ValidationResult::invalid(
            BasicError::IdentityAssetLockProofLockedTransactionMismatch {
                message: format!(
                    "instant lock is for {}, transaction is {}",
                    hex::encode(proof.instant_lock.txid),
                    hex::encode(txid)
                ),
            },
        ));
    }

    if !repository
        .verify_instant_lock(&proof.instant_lock, context)
        .await?
    {
        return Ok(ValidationResult::invalid(
            BasicError::InvalidInstantAssetLockProofSignature,
        ));
    }

    validate_asset_lock_transaction(repository, &proof.transaction, proof.output_index, context)
        .await
}

async fn validate_chain_proof(
    repository: &dyn StateRepository,
    proof: &ChainAssetLockProof,
    context: &ExecutionContext,
) -> Result<ValidationResult<TxOut>, ProtocolError> {
    let current_height = repository
        .fetch_latest_platform_core_chain_locked_height(context)
        .await?;
    if proof.core_chain_locked_height > current_height {
        return Ok(ValidationResult::invalid(
            BasicError::InvalidAssetLockProofCoreChainHeight {
                proof_core_chain_locked_height: proof.core_chain_locked_height,
                current_core_chain_locked_height: current_height,
            },
        ));
    }

    let txid = proof.out_point.txid;
    let Some(data) = repository.fetch_transaction(&txid, context).await? else {
        return Ok(ValidationResult::invalid(
            BasicError::IdentityAssetLockTransactionIsNotFound {
                txid: hex::encode(txid),
            },
        ));
    };

    match data.height {
        Some(height) if height <= proof.core_chain_locked_height => {}
        height => {
            return Ok(ValidationResult::invalid(
                BasicError::InvalidAssetLockProofTransactionHeight {
                    proof_core_chain_locked_height: proof.core_chain_locked_height,
                    transaction_height: height,
                },
            ))
        }
    }

    validate_asset_lock_transaction(repository, &data.transaction, proof.out_point.vout, context)
        .await
}

/// Validate either proof kind. The payload is the locked output.
pub async fn validate_asset_lock_proof(
    repository: &dyn StateRepository,
    proof: &AssetLockProof,
    context: &ExecutionContext,
) -> Result<ValidationResult<TxOut>, ProtocolError> {
    match proof {
        AssetLockProof::Instant(instant) => validate_instant_proof(repository, instant, context).await,
        AssetLockProof::Chain(chain) => validate_chain_proof(repository, chain, context).await,
    }
}

/// The locked output, read from the proof or from the chain.
pub async fn fetch_asset_lock_transaction_output(
    repository: &dyn StateRepository,
    proof: &AssetLockProof,
    context: &ExecutionContext,
) -> Result<Option<TxOut>, ProtocolError> {
    match proof {
        AssetLockProof::Instant(_) => Ok(proof.output().cloned()),
        AssetLockProof::Chain(chain) => {
            let data = repository
                .fetch_transaction(&chain.out_point.txid, context)
                .await?;
            Ok(data.and_then(|data| data.transaction.output(chain.out_point.vout).cloned()))
        }
    }
}

/// HASH160 of the one-time key the locked output pays to.
pub async fn fetch_asset_lock_public_key_hash(
    repository: &dyn StateRepository,
    proof: &AssetLockProof,
    context: &ExecutionContext,
) -> Result<Option<Vec<u8>>, ProtocolError> {
    let output = fetch_asset_lock_transaction_output(repository, proof, context).await?;
    Ok(output
        .as_ref()
        .and_then(TxOut::op_return_data)
        .filter(|payload| payload.len() == PUBLIC_KEY_HASH_LENGTH)
        .map(<[u8]>::to_vec))
}
