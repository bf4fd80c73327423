use crate::domain::Mailer;
use anyhow::Result;

/// No-op mailer for development and testing.
///
/// Logs the recipient and succeeds. The code itself is never logged; pull
/// it from the database digest-side in tests instead.
pub struct NoopMailer;

impl NoopMailer {
    pub fn new() -> Self {
        NoopMailer
    }
}

#[async_trait::async_trait]
impl Mailer for NoopMailer {
    // ---
    async fn send_login_code(&self, to: &str, _code: &str, ttl_minutes: u64) -> Result<()> {
        // ---
        tracing::info!("noop mailer: would send a {ttl_minutes}-minute login code to {to}");
        Ok(())
    }
}
