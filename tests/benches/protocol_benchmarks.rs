//! # Platform Protocol Benchmarks
//!
//! | Area | Measured |
//! |------|----------|
//! | Fees | `calculate_operation_fees` over growing ledgers |
//! | Signatures | secp256k1 and HASH160 verification through the crypto adapter |
//! | Basic stage | schema and structure checks of a contract create |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use platform_protocol::adapters::{InMemoryStateRepository, JsonSchemaValidator, NativeCryptoAdapter};
use platform_protocol::domain::{DataContractCreateTransition, Operation};
use platform_protocol::{
    calculate_operation_fees, validate_state_transition_basic, CryptoAdapter, ExecutionContext,
    ProtocolConfig, StateTransition,
};
use rand::Rng;
use serde_json::json;
use shared_crypto::Secp256k1KeyPair;
use shared_types::{DataContract, Identifier, KeyType};
use std::collections::BTreeMap;
use std::time::Duration;

// ============================================================================
// FEES
// ============================================================================

fn random_ledger(size: usize) -> Vec<Operation> {
    let mut rng = rand::thread_rng();
    (0..size)
        .map(|i| match i % 3 {
            0 => Operation::write(rng.gen_range(32..4_096)),
            1 => Operation::Read {
                value_size: rng.gen_range(32..4_096),
            },
            _ => Operation::delete(
                rng.gen_range(32..4_096),
                Identifier::new([rng.gen(); 32]),
                rng.gen_range(0..4),
            ),
        })
        .collect()
}

fn bench_fee_calculation(c: &mut Criterion) {
    let mut group = c.benchmark_group("fees");

    for size in [10, 100, 1_000] {
        let ledger = random_ledger(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::new("calculate_operation_fees", size),
            &ledger,
            |b, ledger| b.iter(|| black_box(calculate_operation_fees(ledger))),
        );
    }

    group.finish();
}

// ============================================================================
// SIGNATURES
// ============================================================================

fn bench_signature_verification(c: &mut Criterion) {
    let mut group = c.benchmark_group("signatures");
    group.measurement_time(Duration::from_secs(10));

    let crypto = NativeCryptoAdapter::new();
    let key_pair = Secp256k1KeyPair::generate();
    let private_key = key_pair.to_bytes();
    let message = b"state transition signable bytes";

    let public_key = key_pair.public_key();
    let signature = crypto
        .sign(KeyType::EcdsaSecp256k1, &private_key, message)
        .expect("sign");

    group.bench_function("ecdsa_secp256k1", |b| {
        b.iter(|| {
            black_box(
                crypto
                    .verify_signature(KeyType::EcdsaSecp256k1, public_key.as_bytes(), message, &signature)
                    .is_ok(),
            )
        })
    });

    let key_hash = public_key.hash160();
    group.bench_function("ecdsa_hash160", |b| {
        b.iter(|| {
            black_box(
                crypto
                    .verify_signature(KeyType::EcdsaHash160, &key_hash, message, &signature)
                    .is_ok(),
            )
        })
    });

    group.finish();
}

// ============================================================================
// BASIC STAGE
// ============================================================================

fn contract_create(properties: usize) -> StateTransition {
    let properties: serde_json::Map<String, serde_json::Value> = (0..properties)
        .map(|i| (format!("field{i}"), json!({"type": "string", "maxLength": 63})))
        .collect();
    let data_contract = DataContract::new(
        Identifier::new([1; 32]),
        [2; 32],
        1,
        BTreeMap::from([(
            "note".to_string(),
            json!({
                "type": "object",
                "properties": properties,
                "additionalProperties": false
            }),
        )]),
        BTreeMap::new(),
    );
    StateTransition::DataContractCreate(DataContractCreateTransition {
        protocol_version: 1,
        data_contract,
        entropy: [2; 32],
        signature_public_key_id: 0,
        signature: vec![0; 65],
    })
}

fn bench_basic_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("basic");
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let repository = InMemoryStateRepository::new();
    let crypto = NativeCryptoAdapter::new();
    let schema_validator = JsonSchemaValidator::new();
    let config = ProtocolConfig::default();

    for properties in [1, 16, 64] {
        let transition = contract_create(properties);
        group.bench_with_input(
            BenchmarkId::new("data_contract_create", properties),
            &transition,
            |b, transition| {
                b.iter(|| {
                    runtime.block_on(async {
                        let result = validate_state_transition_basic(
                            &repository,
                            &crypto,
                            &schema_validator,
                            &config,
                            transition,
                            &ExecutionContext::new(),
                        )
                        .await
                        .expect("basic validation");
                        black_box(result.is_valid())
                    })
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_fee_calculation,
    bench_signature_verification,
    bench_basic_validation
);
criterion_main!(benches);
