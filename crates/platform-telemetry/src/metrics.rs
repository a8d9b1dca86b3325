//! Prometheus metrics for the state-transition pipeline.
//!
//! All metrics follow the naming convention: `pp_<object>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., state_transitions_applied_total)
//! - **Histogram**: Distribution of values (e.g., validation_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, HistogramOpts, HistogramVec, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // VALIDATION METRICS
    // =========================================================================

    /// State transitions that passed every validation stage
    pub static ref STATE_TRANSITIONS_VALIDATED: CounterVec = register(CounterVec::new(
        Opts::new(
            "pp_state_transitions_validated_total",
            "Total number of state transitions that passed validation"
        ),
        &["transition_type"]
    ).expect("metric creation failed"));

    /// Rejections by the stage that produced them
    pub static ref STATE_TRANSITIONS_REJECTED: CounterVec = register(CounterVec::new(
        Opts::new("pp_state_transitions_rejected_total", "State transitions rejected by stage"),
        &["transition_type", "stage"]  // stage: basic/signature/fee/state
    ).expect("metric creation failed"));

    /// Consensus errors by numeric code
    pub static ref CONSENSUS_ERRORS: CounterVec = register(CounterVec::new(
        Opts::new("pp_consensus_errors_total", "Consensus errors by code"),
        &["code"]
    ).expect("metric creation failed"));

    /// Stage duration histogram
    pub static ref VALIDATION_DURATION: HistogramVec = register(HistogramVec::new(
        HistogramOpts::new(
            "pp_validation_duration_seconds",
            "Time spent in each validation stage"
        ).buckets(exponential_buckets(0.00001, 2.0, 18).expect("valid buckets")),
        &["stage"]
    ).expect("metric creation failed"));

    // =========================================================================
    // APPLY METRICS
    // =========================================================================

    /// State transitions applied to the repository
    pub static ref STATE_TRANSITIONS_APPLIED: CounterVec = register(CounterVec::new(
        Opts::new("pp_state_transitions_applied_total", "State transitions applied"),
        &["transition_type"]
    ).expect("metric creation failed"));

    /// Credits charged by the fee stage
    pub static ref FEE_CREDITS_CHARGED: Counter = register(Counter::new(
        "pp_fee_credits_charged_total",
        "Total desired fee amount of validated state transitions, in credits"
    ).expect("metric creation failed"));
}

fn register<M>(metric: M) -> M
where
    M: prometheus::core::Collector + Clone + 'static,
{
    REGISTRY
        .register(Box::new(metric.clone()))
        .expect("metric registration failed");
    metric
}

/// Force registration of every metric so a scrape lists them before first use.
pub fn init_metrics() {
    lazy_static::initialize(&STATE_TRANSITIONS_VALIDATED);
    lazy_static::initialize(&STATE_TRANSITIONS_REJECTED);
    lazy_static::initialize(&CONSENSUS_ERRORS);
    lazy_static::initialize(&VALIDATION_DURATION);
    lazy_static::initialize(&STATE_TRANSITIONS_APPLIED);
    lazy_static::initialize(&FEE_CREDITS_CHARGED);
}

/// Record a rejection and each error code it carried.
pub fn record_rejection(transition_type: &str, stage: &str, codes: &[u32]) {
    STATE_TRANSITIONS_REJECTED
        .with_label_values(&[transition_type, stage])
        .inc();
    for code in codes {
        CONSENSUS_ERRORS
            .with_label_values(&[code.to_string().as_str()])
            .inc();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct StageTimer {
    histogram: prometheus::Histogram,
    start: std::time::Instant,
}

impl StageTimer {
    /// Start a new timer for the given stage label.
    pub fn new(stage: &str) -> Self {
        Self {
            histogram: VALIDATION_DURATION.with_label_values(&[stage]),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing a validation stage. Observation happens on drop.
#[macro_export]
macro_rules! time_stage {
    ($stage:expr) => {
        $crate::metrics::StageTimer::new($stage)
    };
}
