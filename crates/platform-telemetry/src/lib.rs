//! # Platform Telemetry
//!
//! Logging and metrics for the platform protocol engine.
//!
//! ## Components
//!
//! - **Logging**: `tracing` subscriber with env filter, pretty or JSON output
//! - **Metrics**: Prometheus counters and histograms per validation stage
//!
//! ## Usage
//!
//! ```rust,ignore
//! use platform_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     init_telemetry(&TelemetryConfig::from_env()).expect("Failed to init telemetry");
//!     // Spans from #[instrument] and metrics are now being collected
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PP_SERVICE_NAME` | `platform-protocol` | Service name in logs |
//! | `PP_LOG_LEVEL` | `info` | Log level filter (`RUST_LOG` also honoured) |
//! | `PP_JSON_LOGS` | `false` (`true` in containers) | JSON formatted logs |
//! | `PP_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `PP_NETWORK` | `testnet` | Network name |

#![warn(missing_docs)]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    gather_metrics, init_metrics, record_rejection, StageTimer, CONSENSUS_ERRORS,
    FEE_CREDITS_CHARGED, STATE_TRANSITIONS_APPLIED, STATE_TRANSITIONS_REJECTED,
    STATE_TRANSITIONS_VALIDATED, VALIDATION_DURATION,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// A global subscriber is already installed
    #[error("Logging already initialized")]
    AlreadyInitialized,

    /// Prometheus encoding or registration failed
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// Invalid log filter or other configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and register all metrics.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    init_metrics();
    init_logging(config)
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
