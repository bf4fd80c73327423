use crate::domain::ReadinessFlag;
use std::sync::Arc;

/// Abstraction for application metrics (counters, histograms).
pub trait Metrics: Send + Sync + 'static {
    // ---
    /// Render current metrics in Prometheus text format.
    fn render(&self) -> String;

    /// Record a one-time credential being issued.
    fn record_credential_issued(&self);

    /// Record a verification attempt outcome.
    fn record_credential_verified(&self, success: bool);

    /// Record a completed readiness check, labeled by flag.
    fn record_check_completed(&self, flag: ReadinessFlag);
}

/// Type alias for any backend that implements Metrics.
pub type MetricsPtr = Arc<dyn Metrics>;
