use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A registered user, created on first successful code verification.
///
/// Emails are case-normalized before storage, and uniqueness is enforced
/// by the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    // ---
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    // ---
    pub fn new(email: String) -> Self {
        // ---
        Self {
            id: Uuid::new_v4(),
            email,
            created_at: Utc::now(),
        }
    }
}

/// A one-time login credential awaiting verification.
///
/// Only the SHA-256 digest of the code is stored; the raw code exists
/// solely in the outbound email. `consumed_at` is set at most once.
#[derive(Debug, Clone)]
pub struct PendingCredential {
    // ---
    pub id: Uuid,

    /// Normalized (lowercased, trimmed) email the code was issued for.
    pub email: String,

    /// Hex-encoded SHA-256 digest over `"{email}|{code}"`.
    pub secret_hash: String,

    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
}

/// Identity resolved from a validated session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    // ---
    pub user_id: Uuid,
    pub email: String,
}

/// Per-user, per-metric running estimate of normal performance.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricBaseline {
    // ---
    pub user_id: Uuid,
    pub metric: String,
    pub mean: f64,

    /// Standard deviation, floored at a small epsilon so z-scores never
    /// divide by zero.
    pub std: f64,

    pub sample_count: i32,
    pub updated_at: DateTime<Utc>,
}

/// Three-level readiness classification of a completed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReadinessFlag {
    Green,
    Yellow,
    Red,
}

impl ReadinessFlag {
    // ---
    pub fn as_str(&self) -> &'static str {
        // ---
        match self {
            ReadinessFlag::Green => "GREEN",
            ReadinessFlag::Yellow => "YELLOW",
            ReadinessFlag::Red => "RED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        // ---
        match s {
            "GREEN" => Some(ReadinessFlag::Green),
            "YELLOW" => Some(ReadinessFlag::Yellow),
            "RED" => Some(ReadinessFlag::Red),
            _ => None,
        }
    }
}

/// Full scoring breakdown persisted with the check and returned to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    // ---
    /// Per-metric standardized deviation (0.0 where no baseline is established).
    pub z: BTreeMap<String, f64>,

    /// Sum of adverse deviations over worse-if-high metrics, plus any
    /// overconfidence penalty.
    pub risk: f64,

    pub readiness: ReadinessFlag,

    /// Number of submitted metrics with an established baseline.
    pub baseline_coverage: usize,

    /// True while too few metrics have an established baseline for the
    /// flag to be meaningful.
    pub baseline_pending: bool,
}

/// A readiness check: opened on start, completed exactly once on submission.
#[derive(Debug, Clone, Serialize)]
pub struct CheckRecord {
    // ---
    pub id: Uuid,
    pub user_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub metrics_json: Option<serde_json::Value>,
    pub score_json: Option<serde_json::Value>,
    pub readiness: Option<ReadinessFlag>,
    pub integrity: Option<f64>,
}

impl CheckRecord {
    // ---
    pub fn new(user_id: Uuid) -> Self {
        // ---
        Self {
            id: Uuid::new_v4(),
            user_id,
            started_at: Utc::now(),
            ended_at: None,
            metrics_json: None,
            score_json: None,
            readiness: None,
            integrity: None,
        }
    }
}
