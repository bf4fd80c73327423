//! Login-code delivery via the Resend HTTP API.

use crate::config::EmailConfig;
use crate::domain::Mailer;
use anyhow::{Context, Result};
use serde::Serialize;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Serialize)]
struct SendRequest<'a> {
    //
    from: &'a str,
    to: [&'a str; 1],
    subject: String,
    html: String,
}

pub struct ResendMailer {
    // ---
    client: reqwest::Client,
    api_key: String,
    from_address: String,
    app_name: String,
}

impl ResendMailer {
    // ---
    pub fn new(config: &EmailConfig) -> Result<Self> {
        // ---
        let api_key = config
            .resend_api_key
            .clone()
            .context("resend mailer selected without RESEND_API_KEY")?;
        let from_address = config
            .from_address
            .clone()
            .context("resend mailer selected without READY_EMAIL_FROM")?;

        // Bounded timeout: a stalled provider surfaces as a dependency
        // error instead of hanging the request.
        let client = reqwest::Client::builder()
            .timeout(config.send_timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key,
            from_address,
            app_name: config.app_name.clone(),
        })
    }

    fn render_body(&self, code: &str, ttl_minutes: u64) -> String {
        // ---
        format!(
            "<div style=\"font-family:ui-sans-serif,system-ui\">\
               <h2>{}</h2>\
               <p>Your login code is:</p>\
               <p style=\"font-size:28px;letter-spacing:3px;font-weight:700\">{code}</p>\
               <p>This code expires in {ttl_minutes} minutes.</p>\
               <p style=\"color:#666;font-size:12px\">If you didn't request this, you can ignore this email.</p>\
             </div>",
            self.app_name
        )
    }
}

#[async_trait::async_trait]
impl Mailer for ResendMailer {
    // ---
    async fn send_login_code(&self, to: &str, code: &str, ttl_minutes: u64) -> Result<()> {
        // ---
        let request = SendRequest {
            from: &self.from_address,
            to: [to],
            subject: format!("{}: your login code", self.app_name),
            html: self.render_body(code, ttl_minutes),
        };

        let response = self
            .client
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("email delivery request failed")?;

        if !response.status().is_success() {
            // ---
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("email delivery failed: {status} {body}");
        }

        tracing::info!("Login code delivered to {to}");
        Ok(())
    }
}
