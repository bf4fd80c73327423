use crate::domain::ReadinessFlag;
use metrics::counter;

/// Increment the counter for issued one-time credentials.
pub fn increment_credential_issued() {
    counter!("credentials_issued_total").increment(1);
}

/// Increment the verification counter, labeled by outcome.
pub fn increment_credential_verified(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("credentials_verified_total", "outcome" => outcome).increment(1);
}

/// Increment the completed-check counter, labeled by readiness flag.
pub fn increment_check_completed(flag: ReadinessFlag) {
    counter!("checks_completed_total", "readiness" => flag.as_str()).increment(1);
}
