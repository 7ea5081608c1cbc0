//! Prometheus metrics for the store runtime.
//!
//! The store records:
//! - Dispatched actions, labelled by tag and tag class
//! - Reducer duration
//! - State changes published to observers
//! - Effects executed, cancelled, and dropped at shutdown
//! - Backend retries
//!
//! Metrics go through the `metrics` facade, so they are no-ops until a
//! recorder is installed. [`MetricsRecorder`] installs the Prometheus one.
//!
//! # Example
//!
//! ```rust,no_run
//! use storefront_state_runtime::metrics::MetricsRecorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut recorder = MetricsRecorder::new();
//! recorder.install()?;
//!
//! // ... run the store ...
//!
//! if let Some(text) = recorder.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use storefront_state_core::action::ActionKind;
use thiserror::Error;

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

/// Prometheus recorder for the store metrics.
///
/// Rendering produces the Prometheus text format, ready to be served from a
/// scrape endpoint.
#[derive(Default)]
pub struct MetricsRecorder {
    handle: Option<PrometheusHandle>,
}

impl MetricsRecorder {
    /// Create a recorder that is not installed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns an error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// Only one global recorder can exist. If one is already installed
    /// (e.g., by another test), this logs a warning and returns `Ok`
    /// without a handle.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05, 0.1],
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

    /// Register metric descriptions and serve `/metrics` on `addr`.
    ///
    /// Must be called from within a Tokio runtime. The exporter owns the
    /// recorder, so [`MetricsRecorder::render`] returns `None` afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be started or a recorder is
    /// already installed.
    pub fn serve(&mut self, addr: SocketAddr) -> Result<(), MetricsError> {
        register_metrics();

        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|e| MetricsError::Install(e.to_string()))?;

        self.handle = None;
        tracing::info!(%addr, "Prometheus metrics available at http://{addr}/metrics");
        Ok(())
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this recorder was not the one installed.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!("store_actions_total", "Total number of actions dispatched to the store");
    describe_counter!(
        "store_actions_rejected_total",
        "Actions rejected because the store is shutting down"
    );
    describe_histogram!(
        "store_reducer_duration_seconds",
        "Time taken by the reducer for one action"
    );
    describe_counter!(
        "store_state_changes_total",
        "Dispatches that produced a new state value"
    );
    describe_counter!("store_effects_total", "Effects executed, by effect type");
    describe_counter!(
        "store_effects_cancelled_total",
        "Cancellable effects aborted by a newer effect or an explicit cancel"
    );
    describe_gauge!("store_effects_pending", "Effects currently running");
    describe_counter!(
        "store_shutdown_total",
        "Store shutdowns, by outcome (completed, timeout)"
    );
    describe_counter!("store_retry_success_total", "Backend calls that succeeded after a retry");
    describe_counter!(
        "store_retry_exhausted_total",
        "Backend calls that failed after exhausting retries"
    );
}

/// Store metrics recorder.
pub struct StoreMetrics;

impl StoreMetrics {
    /// Record one dispatched action.
    pub fn record_action(kind: &'static str, class: ActionKind, duration: Duration) {
        counter!("store_actions_total", "kind" => kind, "class" => class.label()).increment(1);
        histogram!("store_reducer_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record an action rejected during shutdown.
    pub fn record_rejected() {
        counter!("store_actions_rejected_total").increment(1);
    }

    /// Record a dispatch that published a new state.
    pub fn record_state_change() {
        counter!("store_state_changes_total").increment(1);
    }

    /// Record one executed effect.
    pub fn record_effect(effect_type: &'static str) {
        counter!("store_effects_total", "type" => effect_type).increment(1);
    }

    /// Record an aborted cancellable effect.
    pub fn record_cancelled(id: &'static str) {
        counter!("store_effects_cancelled_total", "id" => id).increment(1);
    }

    /// Record the number of running effects.
    #[allow(clippy::cast_precision_loss)] // effect counts stay far below 2^52
    pub fn record_pending(pending: usize) {
        gauge!("store_effects_pending").set(pending as f64);
    }

    /// Record a shutdown outcome.
    pub fn record_shutdown(outcome: &'static str) {
        counter!("store_shutdown_total", "outcome" => outcome).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_starts_uninstalled() {
        let recorder = MetricsRecorder::new();
        assert!(recorder.render().is_none());
    }

    #[test]
    fn test_install_and_render() {
        let mut recorder = MetricsRecorder::new();
        assert!(recorder.install().is_ok());

        StoreMetrics::record_action("SEARCH_PRODUCTS", ActionKind::Start, Duration::from_micros(20));
        StoreMetrics::record_effect("future");
        StoreMetrics::record_cancelled("product-search");

        // Only the recorder that won the global install can render
        if let Some(rendered) = recorder.render() {
            assert!(rendered.contains("store_actions_total"));
            assert!(rendered.contains("store_effects_cancelled_total"));
        }
    }
}
