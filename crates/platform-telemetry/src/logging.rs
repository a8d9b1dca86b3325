//! Structured logging setup.
//!
//! JSON logs carry consistent fields for log shippers:
//! - `timestamp`: ISO 8601 timestamp
//! - `level`: Log level (trace, debug, info, warn, error)
//! - `target`: Module path that emitted the event
//! - span fields (`stage`, `transition_type`, ...) from `#[instrument]`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when both are set. A second
/// call fails with [`TelemetryError::AlreadyInitialized`].
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| TelemetryError::Config(e.to_string()))?;

    let console = config.console_output;

    // JSON output for containers/production
    let json_layer = (console && config.json_logs).then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
    });

    // Pretty output for development
    let fmt_layer = (console && !config.json_logs).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_ansi(true)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(fmt_layer)
        .try_init()
        .map_err(|_| TelemetryError::AlreadyInitialized)?;

    tracing::info!(
        service = %config.full_service_name(),
        json_logs = config.json_logs,
        "Logging initialized"
    );

    Ok(())
}

/// Log a state-transition event with standard fields.
#[macro_export]
macro_rules! log_transition_event {
    ($level:ident, $stage:expr, $msg:expr, $transition_type:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            stage = $stage,
            transition_type = %$transition_type,
            $($($field)*,)?
            $msg
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        let config = TelemetryConfig {
            console_output: false,
            ..TelemetryConfig::default()
        };
        // The first call may already have happened in another test.
        let _ = init_logging(&config);
        assert!(matches!(
            init_logging(&config),
            Err(TelemetryError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_invalid_filter_rejected() {
        // Only evaluated when RUST_LOG is unset.
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = TelemetryConfig {
            log_level: "platform=notalevel".to_string(),
            console_output: false,
            ..TelemetryConfig::default()
        };
        assert!(matches!(init_logging(&config), Err(TelemetryError::Config(_))));
    }
}
