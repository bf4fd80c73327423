//! Prometheus metrics implementation.
//!
//! This module provides a concrete implementation of the `Metrics` trait using
//! the Prometheus metrics format. It delegates to utility functions in sibling
//! modules (`counters.rs`, `recorder.rs`) which handle the actual metrics
//! collection via the global `metrics` crate registry.
//!
//! The implementation follows a global registry pattern where metrics are
//! automatically registered when first used, and a single global handle
//! manages rendering all collected metrics in Prometheus text format.

use crate::domain::{Metrics, ReadinessFlag};

/// Prometheus-based metrics implementation.
///
/// This struct is intentionally empty because we use the global metrics
/// registry pattern via the `metrics` crate. All metrics are registered
/// globally using macros like `counter!()`, and the global PrometheusHandle
/// stored in `recorder.rs` manages collection and rendering.
pub struct PrometheusMetrics {
    // Empty - uses global metrics registry pattern
}

impl PrometheusMetrics {
    pub fn new() -> Self {
        tracing::info!("Creating Prometheus metrics");
        PrometheusMetrics {}
    }
}

impl Metrics for PrometheusMetrics {
    fn render(&self) -> String {
        // Use the recorder utility to get actual metrics
        super::render_metrics()
    }

    fn record_credential_issued(&self) {
        tracing::debug!("Recording credential issued event");
        super::increment_credential_issued();
    }

    fn record_credential_verified(&self, success: bool) {
        tracing::debug!("Recording credential verification event");
        super::increment_credential_verified(success);
    }

    fn record_check_completed(&self, flag: ReadinessFlag) {
        tracing::debug!("Recording check completed event");
        super::increment_check_completed(flag);
    }
}
