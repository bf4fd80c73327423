// src/config.rs

//! Application configuration loaded from environment variables.
//!
//! This module defines all startup-time configuration for the service.
//! Configuration is validated eagerly and failures are treated as
//! deployment errors rather than recoverable runtime conditions. Components
//! receive their configuration explicitly at construction; nothing reads
//! ambient state after startup.

use anyhow::Result;
use std::collections::HashSet;
use std::time::Duration;

// ============================================================
// Local macros (config-only, intentionally explicit)
// ============================================================

/// Reads a required environment variable.
///
/// # Behavior
/// - Fails fast if the variable is missing
/// - Produces a clear, human-readable error message
/// - Intended for startup-time configuration validation
///
/// Missing configuration is treated as a deployment error,
/// not a recoverable runtime condition.
macro_rules! required_env {
    // ---
    ($key:literal) => {
        std::env::var($key)
            .map_err(|_| anyhow::anyhow!(concat!("Missing required configuration: ", $key)))?
    };
}

/// Reads an optional environment variable and attempts to parse it.
///
/// If the variable is missing or cannot be parsed, the provided
/// default value is used. This macro is appropriate for non-critical
/// tuning parameters where fallback behavior is acceptable.
macro_rules! optional_env_parse {
    // ---
    ($key:literal, $ty:ty, $default:expr) => {
        std::env::var($key)
            .ok()
            .and_then(|v| v.parse::<$ty>().ok())
            .unwrap_or($default)
    };
}

#[cfg(test)]
/// Asserts that a configuration constructor fails due to a missing
/// required environment variable.
///
/// This macro is intended for config unit tests only and enforces
/// consistent error messages across failure cases.
macro_rules! assert_missing_config {
    // ---
    ($expr:expr, $key:literal) => {{
        let err = $expr.expect_err("expected configuration error");
        assert!(
            err.to_string()
                .contains(concat!("Missing required configuration: ", $key)),
            "unexpected error: {err}"
        );
    }};
}

// ============================================================
// Public configuration facade
// ============================================================

/// Aggregated application configuration.
///
/// This is the single source of truth for startup configuration.
/// All required configuration is validated eagerly during initialization.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: database::DatabaseConfig,
    pub auth: auth::AuthConfig,
    pub email: email::EmailConfig,
    pub scoring: scoring::ScoringConfig,
}

impl AppConfig {
    /// Loads and validates all application configuration from the environment.
    ///
    /// # Errors
    /// Returns an error if any required configuration is missing or invalid.
    /// This function is intended to be called exactly once at startup.
    pub fn from_env() -> Result<Self> {
        // ---
        Ok(Self {
            database: database::DatabaseConfig::from_env()?,
            auth: auth::AuthConfig::from_env()?,
            email: email::EmailConfig::from_env()?,
            scoring: scoring::ScoringConfig::from_env()?,
        })
    }
}

// ============================================================
// Database configuration
// ============================================================

mod database {
    // ---
    use super::*;

    /// Database-related configuration derived from environment variables.
    ///
    /// This configuration is required for the service to function and
    /// is validated eagerly during startup.
    #[derive(Debug, Clone)]
    pub struct DatabaseConfig {
        /// PostgreSQL connection string.
        pub database_url: String,

        /// Number of retry attempts when initializing the database connection. Defaults to 50.
        pub retry_count: u32,

        /// Maximum time to wait when acquiring a connection from the pool. Defaults to 30 seconds.
        pub acquire_timeout: Duration,

        /// Minimum number of connections to keep in the pool, even when idle. Defaults to 2.
        pub min_connections: u32,

        /// Maximum number of connections to be open concurrently. Defaults to 15.
        pub max_connections: u32,
    }

    impl DatabaseConfig {
        /// Builds a [`DatabaseConfig`] from environment variables.
        ///
        /// # Errors
        /// Returns an error if required configuration is missing.
        /// Startup will fail fast rather than continuing with incomplete
        /// or invalid configuration.
        pub fn from_env() -> Result<Self> {
            // ---
            let database_url = required_env!("DATABASE_URL");
            let retry_count = optional_env_parse!("READY_DB_RETRY_COUNT", u32, 50);
            let acquire_timeout_secs = optional_env_parse!("READY_DB_ACQUIRE_TIMEOUT_SEC", u64, 30);
            let min_connections = optional_env_parse!("READY_DB_MIN_CONNECTIONS", u32, 2);
            let max_connections = optional_env_parse!("READY_DB_MAX_CONNECTIONS", u32, 15);

            Ok(Self {
                database_url,
                retry_count,
                acquire_timeout: Duration::from_secs(acquire_timeout_secs),
                min_connections,
                max_connections,
            })
        }
    }
}
pub use database::DatabaseConfig;

// ============================================================
// Auth configuration
// ============================================================

mod auth {
    // ---
    use super::*;

    /// One-time-code and session configuration.
    ///
    /// The session secret keys the HMAC over session claims and is
    /// security-critical: it must be explicitly provided and long enough
    /// that the tag is not brute-forceable.
    #[derive(Debug, Clone)]
    pub struct AuthConfig {
        /// Server-held secret keying the session integrity tag.
        pub session_secret: String,

        /// Validity window for issued sessions.
        pub session_ttl: Duration,

        /// Validity window for one-time login codes.
        pub code_ttl: Duration,

        /// Name of the session cookie.
        pub cookie_name: String,

        /// Whether the cookie carries the Secure attribute. Disable only
        /// for plain-HTTP local development.
        pub cookie_secure: bool,

        /// Whether issuing a new code expires the email's outstanding ones.
        pub invalidate_prior_codes: bool,
    }

    impl AuthConfig {
        /// Builds an [`AuthConfig`] from environment variables.
        ///
        /// # Errors
        /// Returns an error if the session secret is missing or too short.
        pub fn from_env() -> Result<Self> {
            // ---
            let session_secret = required_env!("READY_SESSION_SECRET");
            anyhow::ensure!(
                session_secret.len() >= 16,
                "READY_SESSION_SECRET must be at least 16 bytes"
            );

            let session_ttl_days = optional_env_parse!("READY_SESSION_TTL_DAYS", u64, 14);
            let code_ttl_min = optional_env_parse!("READY_CODE_TTL_MIN", u64, 10);
            let cookie_name = std::env::var("READY_COOKIE_NAME")
                .unwrap_or_else(|_| "ready_session".to_string());
            let cookie_secure = optional_env_parse!("READY_COOKIE_SECURE", bool, true);
            let invalidate_prior_codes =
                optional_env_parse!("READY_CODE_INVALIDATE_PRIOR", bool, false);

            Ok(Self {
                session_secret,
                session_ttl: Duration::from_secs(session_ttl_days * 24 * 60 * 60),
                code_ttl: Duration::from_secs(code_ttl_min * 60),
                cookie_name,
                cookie_secure,
                invalidate_prior_codes,
            })
        }

        /// Code TTL in whole minutes, as quoted in outbound emails.
        pub fn code_ttl_minutes(&self) -> u64 {
            // ---
            self.code_ttl.as_secs() / 60
        }
    }
}
pub use auth::AuthConfig;

// ============================================================
// Email configuration
// ============================================================

mod email {
    // ---
    use super::*;

    /// Outbound email configuration.
    ///
    /// The backend is selected here rather than by ambient lookups in the
    /// delivery code: `noop` logs and succeeds (development, tests),
    /// `resend` posts to the Resend HTTP API.
    #[derive(Debug, Clone)]
    pub struct EmailConfig {
        /// Delivery backend: "noop" (default) or "resend".
        pub mailer_type: String,

        /// Resend API key; required when `mailer_type` is "resend".
        pub resend_api_key: Option<String>,

        /// From address; required when `mailer_type` is "resend".
        pub from_address: Option<String>,

        /// Application name used in email subjects and bodies.
        pub app_name: String,

        /// Upper bound on a single delivery attempt.
        pub send_timeout: Duration,
    }

    impl EmailConfig {
        /// Builds an [`EmailConfig`] from environment variables.
        ///
        /// # Errors
        /// Returns an error if the resend backend is selected without its
        /// required credentials.
        pub fn from_env() -> Result<Self> {
            // ---
            let mailer_type =
                std::env::var("READY_MAILER_TYPE").unwrap_or_else(|_| "noop".to_string());

            let (resend_api_key, from_address) = if mailer_type == "resend" {
                // ---
                (
                    Some(required_env!("RESEND_API_KEY")),
                    Some(required_env!("READY_EMAIL_FROM")),
                )
            } else {
                (None, None)
            };

            let app_name = std::env::var("READY_APP_NAME")
                .unwrap_or_else(|_| "Readiness Check".to_string());
            let timeout_secs = optional_env_parse!("READY_EMAIL_TIMEOUT_SEC", u64, 10);

            Ok(Self {
                mailer_type,
                resend_api_key,
                from_address,
                app_name,
                send_timeout: Duration::from_secs(timeout_secs),
            })
        }
    }
}
pub use email::EmailConfig;

// ============================================================
// Scoring configuration
// ============================================================

mod scoring {
    // ---
    use super::*;

    /// Thresholds and cutpoints for readiness scoring.
    ///
    /// The worse-if-high set names the metrics whose positive deviations
    /// accumulate risk; it is configuration, not a hardcoded constant, so
    /// new task metrics can be wired in without a code change.
    #[derive(Debug, Clone)]
    pub struct ScoringConfig {
        /// Minimum observations before a baseline is considered established.
        pub min_samples: i32,

        /// Floor applied to std on every baseline write.
        pub std_epsilon: f64,

        /// Metrics where a higher observation means worse performance.
        pub worse_if_high: HashSet<String>,

        /// Confidence above which the overconfidence penalty can apply.
        pub high_confidence: f64,

        /// Risk that must already be exceeded for the penalty to apply.
        pub penalty_risk_floor: f64,

        /// Fixed increment added when both penalty conditions hold.
        pub overconfidence_penalty: f64,

        /// Risk at or above which the flag is RED.
        pub red_cutoff: f64,

        /// Risk at or above which the flag is YELLOW.
        pub yellow_cutoff: f64,
    }

    const DEFAULT_WORSE_IF_HIGH: &[&str] = &[
        "srt_mean_ms",
        "srt_lapse_rate",
        "crt_mean_ms",
        "crt_error_rate",
        "gonogo_false_positive_rate",
        "wm_error_rate",
    ];

    impl Default for ScoringConfig {
        // ---
        fn default() -> Self {
            // ---
            Self {
                min_samples: 5,
                std_epsilon: 1e-6,
                worse_if_high: DEFAULT_WORSE_IF_HIGH
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                high_confidence: 80.0,
                penalty_risk_floor: 3.0,
                overconfidence_penalty: 0.5,
                red_cutoff: 4.0,
                yellow_cutoff: 2.0,
            }
        }
    }

    impl ScoringConfig {
        /// Builds a [`ScoringConfig`] from environment variables, falling
        /// back to the defaults above for anything unset.
        pub fn from_env() -> Result<Self> {
            // ---
            let defaults = Self::default();

            let worse_if_high = match std::env::var("READY_WORSE_IF_HIGH") {
                Ok(csv) => csv
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                Err(_) => defaults.worse_if_high,
            };

            Ok(Self {
                min_samples: optional_env_parse!("READY_BASELINE_MIN_SAMPLES", i32, 5),
                std_epsilon: optional_env_parse!("READY_STD_EPSILON", f64, 1e-6),
                worse_if_high,
                high_confidence: optional_env_parse!("READY_HIGH_CONFIDENCE", f64, 80.0),
                penalty_risk_floor: optional_env_parse!("READY_PENALTY_RISK_FLOOR", f64, 3.0),
                overconfidence_penalty: optional_env_parse!("READY_OVERCONF_PENALTY", f64, 0.5),
                red_cutoff: optional_env_parse!("READY_RED_CUTOFF", f64, 4.0),
                yellow_cutoff: optional_env_parse!("READY_YELLOW_CUTOFF", f64, 2.0),
            })
        }
    }
}
pub use scoring::ScoringConfig;

// ============================================================
// Tests
// ============================================================
