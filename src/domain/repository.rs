use super::models::{CheckRecord, MetricBaseline, PendingCredential, User};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Abstraction for auth and scoring data persistence.
#[async_trait::async_trait]
pub trait Repository: Send + Sync {
    // ---
    /// Connectivity probe for the full health check.
    async fn ping(&self) -> Result<()>;

    /// Store a freshly issued one-time credential.
    async fn insert_pending_credential(&self, credential: &PendingCredential) -> Result<()>;

    /// Find the newest credential matching (normalized email, digest).
    async fn find_pending_credential(
        &self,
        email: &str,
        secret_hash: &str,
    ) -> Result<Option<PendingCredential>>;

    /// Atomically mark a credential consumed. Returns false when another
    /// verification attempt already consumed it.
    async fn consume_credential(&self, id: Uuid, when: DateTime<Utc>) -> Result<bool>;

    /// Expire all outstanding (unconsumed, unexpired) credentials for an
    /// email. Returns how many were invalidated.
    async fn expire_outstanding_credentials(
        &self,
        email: &str,
        when: DateTime<Utc>,
    ) -> Result<u64>;

    /// Insert-or-ignore on the email uniqueness constraint, then read back
    /// the canonical row. Safe under concurrent first-time signups.
    async fn upsert_user(&self, email: &str) -> Result<User>;

    /// Get user by ID.
    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>>;

    /// Open a new check record for a user.
    async fn create_check(&self, check: &CheckRecord) -> Result<()>;

    /// Complete a check exactly once. Returns false when the check does not
    /// exist, belongs to another user, or was already completed.
    #[allow(clippy::too_many_arguments)]
    async fn complete_check(
        &self,
        check_id: Uuid,
        user_id: Uuid,
        ended_at: DateTime<Utc>,
        metrics_json: &Value,
        score_json: &Value,
        readiness: &str,
        integrity: f64,
    ) -> Result<bool>;

    /// Fetch one of the user's check records.
    async fn get_check(&self, check_id: Uuid, user_id: Uuid) -> Result<Option<CheckRecord>>;

    /// Fetch the user's baselines for the named metrics.
    async fn get_baselines(
        &self,
        user_id: Uuid,
        metrics: &[String],
    ) -> Result<Vec<MetricBaseline>>;

    /// Insert a first-observation baseline. Returns false if a concurrent
    /// writer created the row first.
    async fn insert_baseline(&self, baseline: &MetricBaseline) -> Result<bool>;

    /// Optimistic update: applies only while the stored sample_count still
    /// equals `expected_samples`. Returns false on a lost race so the caller
    /// can re-read and retry.
    async fn update_baseline(
        &self,
        baseline: &MetricBaseline,
        expected_samples: i32,
    ) -> Result<bool>;
}

/// Type alias for any backend that implements Repository.
pub type RepositoryPtr = Arc<dyn Repository>;
