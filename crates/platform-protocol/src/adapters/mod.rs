//! Adapters layer (Hexagonal Architecture)
//!
//! - `memory`: in-process [`StateRepository`](crate::ports::StateRepository)
//! - `crypto`: [`CryptoAdapter`](crate::ports::CryptoAdapter) over `shared-crypto`
//! - `schema`: [`SchemaValidator`](crate::ports::SchemaValidator) over `jsonschema`

pub mod crypto;
pub mod memory;
pub mod schema;

pub use crypto::NativeCryptoAdapter;
pub use memory::InMemoryStateRepository;
pub use schema::JsonSchemaValidator;
