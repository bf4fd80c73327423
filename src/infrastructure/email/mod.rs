mod noop_mailer;
mod resend_mailer;

pub use noop_mailer::NoopMailer;
pub use resend_mailer::ResendMailer;

use crate::config::EmailConfig;
use crate::domain::MailerPtr;
use anyhow::Result;
use std::sync::Arc;

/// Creates the mailer selected by configuration.
///
/// "noop" logs the recipient and succeeds (development, tests); "resend"
/// posts to the Resend HTTP API. Anything else is a deployment error.
pub fn create_mailer(config: &EmailConfig) -> Result<MailerPtr> {
    // ---
    match config.mailer_type.as_str() {
        "noop" => Ok(Arc::new(NoopMailer::new())),
        "resend" => {
            // ---
            tracing::info!("Initializing Resend mailer");
            Ok(Arc::new(ResendMailer::new(config)?))
        }
        other => Err(anyhow::anyhow!("unknown mailer type: {other}")),
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use std::time::Duration;

    fn noop_config() -> EmailConfig {
        // ---
        EmailConfig {
            mailer_type: "noop".to_string(),
            resend_api_key: None,
            from_address: None,
            app_name: "Test App".to_string(),
            send_timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn test_create_noop_mailer() {
        // ---
        assert!(create_mailer(&noop_config()).is_ok());
    }

    #[test]
    fn test_unknown_mailer_type_rejected() {
        // ---
        let mut config = noop_config();
        config.mailer_type = "carrier-pigeon".to_string();
        assert!(create_mailer(&config).is_err());
    }

    #[test]
    fn test_resend_requires_credentials() {
        // ---
        let mut config = noop_config();
        config.mailer_type = "resend".to_string();
        assert!(create_mailer(&config).is_err());
    }
}
