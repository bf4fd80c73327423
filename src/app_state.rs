//! Application state management.
//!
//! This module defines the shared state structure that gets passed to all
//! Axum handlers via the `State` extractor. The `AppState` contains shared
//! resources like the repository, the outbound mailer, metrics, and the
//! auth/scoring configuration.
//!
//! The state is designed to be cheaply cloneable (using `Arc` internally
//! where needed) so it can be passed efficiently to each request handler
//! without expensive copying of resources.

use crate::config::{AuthConfig, ScoringConfig};
use crate::domain::{MailerPtr, MetricsPtr, RepositoryPtr};
use std::sync::Arc;

/// Shared application state passed to all Axum handlers.
///
/// This struct serves as the Dependency Injection container for the
/// application. Handlers depend on the abstractions it holds (`Repository`,
/// `Mailer`, `Metrics`), not on the Postgres/Resend/Prometheus concretions
/// behind them. It is built once at startup, never mutated afterwards, and
/// cloned cheaply by Axum for each request.
#[derive(Clone)]
pub(crate) struct AppState {
    /// Persistent storage for users, credentials, checks, and baselines.
    repository: RepositoryPtr,

    /// Outbound login-code delivery (Resend or no-op).
    mailer: MailerPtr,

    /// Metrics implementation for recording application events.
    ///
    /// Either Prometheus-backed (production) or no-op (testing/development).
    metrics: MetricsPtr,

    /// Code/session parameters: secret, TTLs, cookie attributes,
    /// prior-code invalidation switch.
    auth: Arc<AuthConfig>,

    /// Readiness scoring thresholds and cutpoints.
    scoring: Arc<ScoringConfig>,
}

impl AppState {
    // ---

    pub fn new(
        repository: RepositoryPtr,
        mailer: MailerPtr,
        metrics: MetricsPtr,
        auth: AuthConfig,
        scoring: ScoringConfig,
    ) -> Self {
        // ---
        AppState {
            repository,
            mailer,
            metrics,
            auth: Arc::new(auth),
            scoring: Arc::new(scoring),
        }
    }

    /// Get a reference to the repository implementation.
    pub(crate) fn repository(&self) -> &RepositoryPtr {
        // ---
        &self.repository
    }

    /// Get a reference to the mailer implementation.
    pub(crate) fn mailer(&self) -> &MailerPtr {
        // ---
        &self.mailer
    }

    /// Get a reference to the metrics implementation.
    pub(crate) fn metrics(&self) -> &MetricsPtr {
        // ---
        &self.metrics
    }

    /// Get the auth configuration.
    pub(crate) fn auth(&self) -> &AuthConfig {
        // ---
        &self.auth
    }

    /// Get the scoring configuration.
    pub(crate) fn scoring(&self) -> &ScoringConfig {
        // ---
        &self.scoring
    }
}
