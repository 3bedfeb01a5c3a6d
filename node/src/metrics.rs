//! # Prometheus Metrics
//!
//! Operational metrics for the registry node, scraped at `/metrics` on the
//! metrics port. Everything lives in a dedicated [`prometheus::Registry`]
//! under the `veripay` prefix.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// All metric handles for the node. Handles are cheap to clone.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Successful first-time registrations.
    pub registrations_total: IntCounter,
    /// Registrations rejected because the hash was already issued.
    pub registration_conflicts_total: IntCounter,
    /// Leaves appended to the accumulator.
    pub accumulator_appends_total: IntCounter,
    /// Leaves rejected as duplicates.
    pub accumulator_duplicates_total: IntCounter,
    /// Current accumulator size.
    pub accumulator_leaves: IntGauge,
    /// Combined verifications by verdict (`pass` / `fail`).
    pub verifications_total: IntCounterVec,
    /// Time spent in combined verification, in seconds.
    pub verification_latency_seconds: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("veripay".into()), None)
            .expect("failed to create prometheus registry");

        let registrations_total = IntCounter::new(
            "registrations_total",
            "Unique key hashes registered for the first time",
        )
        .expect("metric creation");
        registry
            .register(Box::new(registrations_total.clone()))
            .expect("metric registration");

        let registration_conflicts_total = IntCounter::new(
            "registration_conflicts_total",
            "Registrations rejected because the hash was already issued",
        )
        .expect("metric creation");
        registry
            .register(Box::new(registration_conflicts_total.clone()))
            .expect("metric registration");

        let accumulator_appends_total = IntCounter::new(
            "accumulator_appends_total",
            "Leaves appended to the uniqueness accumulator",
        )
        .expect("metric creation");
        registry
            .register(Box::new(accumulator_appends_total.clone()))
            .expect("metric registration");

        let accumulator_duplicates_total = IntCounter::new(
            "accumulator_duplicates_total",
            "Leaves rejected as duplicates",
        )
        .expect("metric creation");
        registry
            .register(Box::new(accumulator_duplicates_total.clone()))
            .expect("metric registration");

        let accumulator_leaves =
            IntGauge::new("accumulator_leaves", "Current number of accumulator leaves")
                .expect("metric creation");
        registry
            .register(Box::new(accumulator_leaves.clone()))
            .expect("metric registration");

        let verifications_total = IntCounterVec::new(
            Opts::new("verifications_total", "Combined verifications by verdict"),
            &["verdict"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(verifications_total.clone()))
            .expect("metric registration");

        let verification_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "verification_latency_seconds",
                "Combined verification latency in seconds",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(verification_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            registrations_total,
            registration_conflicts_total,
            accumulator_appends_total,
            accumulator_duplicates_total,
            accumulator_leaves,
            verifications_total,
            verification_latency_seconds,
        }
    }

    /// Encodes all registered metrics in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics handle passed to handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// `GET /metrics`.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
