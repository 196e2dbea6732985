//! Observability infrastructure for the prediction service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, outcomes, loaded model, billing rate)
//! - Structured JSON logging with tracing

use crate::error::PipelineError;
use crate::models::PredictionResult;
use prometheus::{
    register_gauge, register_gauge_vec, register_histogram, register_int_counter,
    register_int_counter_vec, register_int_gauge, Gauge, GaugeVec, Histogram, IntCounter,
    IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_served: IntCounter,
    prediction_errors: IntCounterVec,
    model_info: GaugeVec,
    model_loaded: IntGauge,
    rate_per_kwh: Gauge,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "energy_prediction_latency_seconds",
                "Time spent encoding, predicting and billing one observation",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_served: register_int_counter!(
                "energy_predictions_total",
                "Total number of successful predictions"
            )
            .expect("Failed to register predictions_total"),

            prediction_errors: register_int_counter_vec!(
                "energy_prediction_errors_total",
                "Total number of failed prediction requests by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_errors_total"),

            model_info: register_gauge_vec!(
                "energy_model_info",
                "Information about the currently loaded model artifact",
                &["kind", "fingerprint"]
            )
            .expect("Failed to register model_info"),

            model_loaded: register_int_gauge!(
                "energy_model_loaded",
                "1 if the model artifact loaded at startup, 0 in degraded mode"
            )
            .expect("Failed to register model_loaded"),

            rate_per_kwh: register_gauge!(
                "energy_rate_per_kwh",
                "Configured billing rate per kWh"
            )
            .expect("Failed to register rate_per_kwh"),
        }
    }
}

/// Lightweight handle to the global metrics; clones share the same metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self) {
        self.inner().predictions_served.inc();
    }

    pub fn inc_prediction_errors(&self, kind: &str) {
        self.inner().prediction_errors.with_label_values(&[kind]).inc();
    }

    pub fn set_model(&self, kind: &str, fingerprint: &str) {
        self.inner().model_info.reset();
        self.inner()
            .model_info
            .with_label_values(&[kind, fingerprint])
            .set(1.0);
        self.inner().model_loaded.set(1);
    }

    pub fn set_model_unavailable(&self) {
        self.inner().model_info.reset();
        self.inner().model_loaded.set(0);
    }

    pub fn set_rate(&self, rate: f64) {
        self.inner().rate_per_kwh.set(rate);
    }
}

/// Structured logger for service events
///
/// Every event carries an `event` field so log pipelines can filter on it.
#[derive(Clone)]
pub struct StructuredLogger {
    service_name: String,
}

impl StructuredLogger {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    pub fn log_startup(&self, version: &str, rate: f64, model_kind: Option<&str>) {
        info!(
            event = "service_started",
            service = %self.service_name,
            version = %version,
            rate_per_kwh = rate,
            model_kind = model_kind.unwrap_or("none"),
            "Energy predictor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service_name,
            reason = %reason,
            "Energy predictor shutting down"
        );
    }

    pub fn log_artifact_unavailable(&self, reason: &str) {
        warn!(
            event = "artifact_unavailable",
            service = %self.service_name,
            reason = %reason,
            "Running in degraded mode, predictions will fail"
        );
    }

    pub fn log_prediction(&self, result: &PredictionResult, elapsed_us: u128) {
        info!(
            event = "prediction_served",
            service = %self.service_name,
            predicted_kwh = result.predicted_kwh,
            estimated_bill = result.estimated_bill,
            rate_used = result.rate_used,
            elapsed_us = elapsed_us,
            "Served energy prediction"
        );
    }

    /// Inference errors point at a broken contract and are logged as errors
    pub fn log_prediction_failure(&self, err: &PipelineError) {
        match err {
            PipelineError::Inference(_) => error!(
                event = "prediction_failed",
                service = %self.service_name,
                kind = err.kind(),
                error = %err,
                "Inference failed on an encoded vector"
            ),
            _ => warn!(
                event = "prediction_failed",
                service = %self.service_name,
                kind = err.kind(),
                error = %err,
                "Prediction request rejected"
            ),
        }
    }
}
