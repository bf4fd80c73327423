use thiserror::Error;

/// Terminal authentication verdicts.
///
/// These are not retryable: recovery requires requesting a fresh code, not
/// resubmitting the same one. Session validation collapses every rejection
/// path (malformed token, bad tag, elapsed expiry) into `Unauthenticated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No pending credential matches the presented secret.
    #[error("invalid credential")]
    InvalidCredential,

    /// The credential was already consumed, here or by a concurrent attempt.
    #[error("credential already used")]
    AlreadyUsed,

    /// The credential's expiry window has elapsed.
    #[error("credential expired")]
    Expired,

    /// No valid session accompanies the request.
    #[error("unauthenticated")]
    Unauthenticated,
}

/// Caller-correctable input rejection, returned before any storage side
/// effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    // ---
    pub fn new(msg: impl Into<String>) -> Self {
        // ---
        ValidationError(msg.into())
    }
}
