//! Prometheus metrics for store observability.
//!
//! The store records through the [`metrics`] facade, so nothing is collected
//! unless a recorder is installed. [`MetricsServer`] installs the Prometheus
//! exporter and renders the text exposition format.
//!
//! # Example
//!
//! ```rust,no_run
//! use mvi_store_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), mvi_store_runtime::metrics::MetricsError> {
//! let mut server = MetricsServer::new();
//! server.start()?;
//!
//! // ... run stores ...
//!
//! if let Some(text) = server.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics recorder installed process-wide.
#[derive(Default)]
pub struct MetricsServer {
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a metrics server that has not been started yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Describe all store metrics and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., in tests), this logs a
    /// warning and leaves the server without a handle.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.000_01, 0.000_1, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Prometheus metrics recorder installed");
                Ok(())
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the server hasn't been started.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "store_intents_submitted_total",
        "Intents accepted into the intent queue"
    );
    describe_counter!(
        "store_intents_dropped_total",
        "Intents or actions dropped because a lossy queue was full"
    );
    describe_counter!(
        "store_intents_rejected_total",
        "Intents rejected because the store was not running"
    );
    describe_counter!(
        "store_interpret_failures_total",
        "Intents discarded because interpretation failed"
    );
    describe_histogram!(
        "store_interpret_duration_seconds",
        "Time spent interpreting one intent"
    );
    describe_counter!(
        "store_transitions_total",
        "State transitions published by the reduction stage"
    );
    describe_histogram!(
        "store_reduce_duration_seconds",
        "Time spent reducing one action"
    );
    describe_counter!(
        "store_stage_crashes_total",
        "Pipeline stages terminated by a panic"
    );
}

/// Store metrics recorder.
pub struct StoreMetrics;

impl StoreMetrics {
    /// Record an accepted intent.
    pub fn record_submitted() {
        counter!("store_intents_submitted_total").increment(1);
    }

    /// Record an item shed by a full lossy queue.
    pub fn record_dropped(stage: &'static str) {
        counter!("store_intents_dropped_total", "stage" => stage).increment(1);
    }

    /// Record an intent refused by a store that is not running.
    pub fn record_rejected() {
        counter!("store_intents_rejected_total").increment(1);
    }

    /// Record a finished interpretation.
    pub fn record_interpretation(duration: Duration, succeeded: bool) {
        histogram!("store_interpret_duration_seconds").record(duration.as_secs_f64());
        if !succeeded {
            counter!("store_interpret_failures_total").increment(1);
        }
    }

    /// Record a published state transition.
    pub fn record_transition(duration: Duration) {
        counter!("store_transitions_total").increment(1);
        histogram!("store_reduce_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a stage that died from a panic.
    pub fn record_crash(stage: &'static str) {
        counter!("store_stage_crashes_total", "stage" => stage).increment(1);
    }
}
