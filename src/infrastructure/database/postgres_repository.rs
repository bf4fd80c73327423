use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    CheckRecord, MetricBaseline, PendingCredential, ReadinessFlag, Repository, User,
};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct PendingCredentialRow {
    id: Uuid,
    email: String,
    secret_hash: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    consumed_at: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct CheckRow {
    id: Uuid,
    user_id: Uuid,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    metrics_json: Option<Value>,
    score_json: Option<Value>,
    readiness: Option<String>,
    integrity: Option<f64>,
}

#[derive(sqlx::FromRow)]
struct BaselineRow {
    user_id: Uuid,
    metric: String,
    mean: f64,
    std: f64,
    sample_count: i32,
    updated_at: DateTime<Utc>,
}

impl From<BaselineRow> for MetricBaseline {
    // ---
    fn from(r: BaselineRow) -> Self {
        // ---
        MetricBaseline {
            user_id: r.user_id,
            metric: r.metric,
            mean: r.mean,
            std: r.std,
            sample_count: r.sample_count,
            updated_at: r.updated_at,
        }
    }
}

pub struct PostgresRepository {
    // ---
    pool: PgPool,
}

impl PostgresRepository {
    // ---
    pub fn new(pool: PgPool) -> Self {
        // ---
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Repository for PostgresRepository {
    // ---
    async fn ping(&self) -> Result<()> {
        // ---
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_pending_credential(&self, credential: &PendingCredential) -> Result<()> {
        // ---
        sqlx::query(
            "INSERT INTO pending_credentials (id, email, secret_hash, created_at, expires_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(credential.id)
        .bind(&credential.email)
        .bind(&credential.secret_hash)
        .bind(credential.created_at)
        .bind(credential.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_pending_credential(
        &self,
        email: &str,
        secret_hash: &str,
    ) -> Result<Option<PendingCredential>> {
        // ---
        let row = sqlx::query_as::<_, PendingCredentialRow>(
            "SELECT id, email, secret_hash, created_at, expires_at, consumed_at
             FROM pending_credentials
             WHERE email = $1 AND secret_hash = $2
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(email)
        .bind(secret_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| PendingCredential {
            id: r.id,
            email: r.email,
            secret_hash: r.secret_hash,
            created_at: r.created_at,
            expires_at: r.expires_at,
            consumed_at: r.consumed_at,
        }))
    }

    async fn consume_credential(&self, id: Uuid, when: DateTime<Utc>) -> Result<bool> {
        // ---
        // Single-use guarantee: the NULL guard makes this a compare-and-set,
        // so of two concurrent verifications exactly one sees a row update.
        let result = sqlx::query(
            "UPDATE pending_credentials SET consumed_at = $2
             WHERE id = $1 AND consumed_at IS NULL",
        )
        .bind(id)
        .bind(when)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn expire_outstanding_credentials(
        &self,
        email: &str,
        when: DateTime<Utc>,
    ) -> Result<u64> {
        // ---
        let result = sqlx::query(
            "UPDATE pending_credentials SET expires_at = $2
             WHERE email = $1 AND consumed_at IS NULL AND expires_at > $2",
        )
        .bind(email)
        .bind(when)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn upsert_user(&self, email: &str) -> Result<User> {
        // ---
        // Insert-or-ignore, then read back: two simultaneous first-time
        // signups for the same email both resolve to the canonical row.
        let candidate = User::new(email.to_string());

        sqlx::query(
            "INSERT INTO users (id, email, created_at) VALUES ($1, $2, $3)
             ON CONFLICT (email) DO NOTHING",
        )
        .bind(candidate.id)
        .bind(&candidate.email)
        .bind(candidate.created_at)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(User {
            id: row.id,
            email: row.email,
            created_at: row.created_at,
        })
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        // ---
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| User {
            id: r.id,
            email: r.email,
            created_at: r.created_at,
        }))
    }

    async fn create_check(&self, check: &CheckRecord) -> Result<()> {
        // ---
        sqlx::query("INSERT INTO check_records (id, user_id, started_at) VALUES ($1, $2, $3)")
            .bind(check.id)
            .bind(check.user_id)
            .bind(check.started_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn complete_check(
        &self,
        check_id: Uuid,
        user_id: Uuid,
        ended_at: DateTime<Utc>,
        metrics_json: &Value,
        score_json: &Value,
        readiness: &str,
        integrity: f64,
    ) -> Result<bool> {
        // ---
        // ended_at IS NULL keeps completion a one-shot mutation: a repeat
        // submission (or another user's check id) affects zero rows.
        let result = sqlx::query(
            "UPDATE check_records
             SET ended_at = $3, metrics_json = $4, score_json = $5, readiness = $6, integrity = $7
             WHERE id = $1 AND user_id = $2 AND ended_at IS NULL",
        )
        .bind(check_id)
        .bind(user_id)
        .bind(ended_at)
        .bind(metrics_json)
        .bind(score_json)
        .bind(readiness)
        .bind(integrity)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_check(&self, check_id: Uuid, user_id: Uuid) -> Result<Option<CheckRecord>> {
        // ---
        let row = sqlx::query_as::<_, CheckRow>(
            "SELECT id, user_id, started_at, ended_at, metrics_json, score_json, readiness, integrity
             FROM check_records WHERE id = $1 AND user_id = $2",
        )
        .bind(check_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| CheckRecord {
            id: r.id,
            user_id: r.user_id,
            started_at: r.started_at,
            ended_at: r.ended_at,
            metrics_json: r.metrics_json,
            score_json: r.score_json,
            readiness: r.readiness.as_deref().and_then(ReadinessFlag::parse),
            integrity: r.integrity,
        }))
    }

    async fn get_baselines(
        &self,
        user_id: Uuid,
        metrics: &[String],
    ) -> Result<Vec<MetricBaseline>> {
        // ---
        let rows = sqlx::query_as::<_, BaselineRow>(
            "SELECT user_id, metric, mean, std, sample_count, updated_at
             FROM metric_baselines
             WHERE user_id = $1 AND metric = ANY($2)",
        )
        .bind(user_id)
        .bind(metrics)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MetricBaseline::from).collect())
    }

    async fn insert_baseline(&self, baseline: &MetricBaseline) -> Result<bool> {
        // ---
        let result = sqlx::query(
            "INSERT INTO metric_baselines (user_id, metric, mean, std, sample_count, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (user_id, metric) DO NOTHING",
        )
        .bind(baseline.user_id)
        .bind(&baseline.metric)
        .bind(baseline.mean)
        .bind(baseline.std)
        .bind(baseline.sample_count)
        .bind(baseline.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_baseline(
        &self,
        baseline: &MetricBaseline,
        expected_samples: i32,
    ) -> Result<bool> {
        // ---
        // Optimistic concurrency: the sample_count guard rejects a write
        // computed from a stale read so no concurrent update is lost.
        let result = sqlx::query(
            "UPDATE metric_baselines
             SET mean = $3, std = $4, sample_count = $5, updated_at = $6
             WHERE user_id = $1 AND metric = $2 AND sample_count = $7",
        )
        .bind(baseline.user_id)
        .bind(&baseline.metric)
        .bind(baseline.mean)
        .bind(baseline.std)
        .bind(baseline.sample_count)
        .bind(baseline.updated_at)
        .bind(expected_samples)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
