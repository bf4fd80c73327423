use crate::domain::{Metrics, ReadinessFlag};

/// No-op metrics implementation for testing.
pub struct NoopMetrics;

impl NoopMetrics {
    pub fn new() -> Self {
        NoopMetrics
    }
}

impl Metrics for NoopMetrics {
    // ---
    fn render(&self) -> String {
        String::new()
    }
    fn record_credential_issued(&self) {}
    fn record_credential_verified(&self, _: bool) {}
    fn record_check_completed(&self, _: ReadinessFlag) {}
}
