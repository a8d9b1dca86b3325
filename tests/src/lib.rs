//! # Platform Protocol Test Suite
//!
//! Cross-crate flows that drive the full pipeline through
//! [`StateTransitionFacade`](platform_protocol::StateTransitionFacade)
//! against the in-memory repository.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # criterion benchmarks
//! └── src/
//!     ├── fixtures.rs   # seeded platform, keys, contracts
//!     └── integration/  # end-to-end scenarios
//!         ├── documents.rs
//!         ├── identities.rs
//!         └── pipeline.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p platform-tests
//! cargo test -p platform-tests integration::identities::
//! cargo bench -p platform-tests
//! ```

pub mod fixtures;
pub mod integration;
