use anyhow::Result;
use std::sync::Arc;

/// Abstraction for outbound one-time-code delivery.
///
/// Delivery failures must surface to the caller as dependency errors; the
/// issuance flow never swallows them.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    // ---
    /// Send a login code to `to`. `ttl_minutes` is quoted in the message body.
    async fn send_login_code(&self, to: &str, code: &str, ttl_minutes: u64) -> Result<()>;
}

/// Type alias for any backend that implements Mailer.
pub type MailerPtr = Arc<dyn Mailer>;
