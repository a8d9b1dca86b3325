//! # Execution Context
//!
//! Per-transition scratch state: the dry-run flag and the operation ledger.
//!
//! ## Dry Run
//!
//! While dry-run is enabled, repository writes are costed but not persisted,
//! and their operations go to a separate ledger that is cleared when dry-run
//! ends. The caller owns one context per transition and passes it by
//! reference into every stage.

use super::operation::Operation;
use parking_lot::RwLock;

#[derive(Debug, Default)]
struct Ledger {
    dry_run: bool,
    operations: Vec<Operation>,
    dry_operations: Vec<Operation>,
}

/// Dry-run flag plus append-only operation ledger.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    ledger: RwLock<Ledger>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context already in dry-run mode.
    pub fn dry_run() -> Self {
        let context = Self::new();
        context.enable_dry_run();
        context
    }

    pub fn enable_dry_run(&self) {
        self.ledger.write().dry_run = true;
    }

    /// Leave dry-run mode, discarding the dry-run ledger.
    pub fn disable_dry_run(&self) {
        let mut ledger = self.ledger.write();
        ledger.dry_run = false;
        ledger.dry_operations.clear();
    }

    pub fn is_dry_run(&self) -> bool {
        self.ledger.read().dry_run
    }

    /// Record an operation in the ledger matching the current mode.
    pub fn add_operation(&self, operation: Operation) {
        let mut ledger = self.ledger.write();
        if ledger.dry_run {
            ledger.dry_operations.push(operation);
        } else {
            ledger.operations.push(operation);
        }
    }

    pub fn add_operations(&self, operations: impl IntoIterator<Item = Operation>) {
        for operation in operations {
            self.add_operation(operation);
        }
    }

    /// Operations recorded outside dry-run.
    pub fn operations(&self) -> Vec<Operation> {
        self.ledger.read().operations.clone()
    }

    /// Operations recorded during the current dry-run.
    pub fn dry_operations(&self) -> Vec<Operation> {
        self.ledger.read().dry_operations.clone()
    }

    pub fn clear_dry_operations(&self) {
        self.ledger.write().dry_operations.clear();
    }
}
