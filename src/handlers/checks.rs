//! Readiness check handlers.
//!
//! A check is opened with `start_check`, then completed exactly once with
//! `complete_check`, which scores the submitted metric summary against the
//! user's baselines and conditionally folds the observations back in.

use crate::app_state::AppState;
use crate::domain::scoring;
use crate::domain::{CheckRecord, ReadinessFlag, ScoreBreakdown};
use crate::handlers::auth::require_identity;
use crate::handlers::shared_types::*;
use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Attempts per metric when an optimistic baseline write loses its race.
const BASELINE_WRITE_RETRIES: usize = 3;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StartCheckResponse {
    // ---
    pub ok: bool,
    pub check_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CompleteCheckRequest {
    // ---
    pub check_id: Uuid,

    /// Per-task metric summaries, e.g. `srt_mean_ms` or `wm_error_rate`.
    pub metrics: BTreeMap<String, f64>,

    /// Self-reported confidence, 0-100. Absent means "no opinion" (50).
    pub confidence: Option<f64>,

    /// Client-side integrity score for the run, defaulting to 1.0.
    pub integrity: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CompleteCheckResponse {
    // ---
    pub ok: bool,
    pub readiness: ReadinessFlag,
    pub score: ScoreBreakdown,
}

#[derive(Debug, Serialize)]
pub struct GetCheckResponse {
    // ---
    pub ok: bool,
    pub check: CheckRecord,
}

// ============================================================================
// Check Start Handler
// ============================================================================

/// POST /checks/start
///
/// Opens a check record for the signed-in user and hands the id back; the
/// client submits its metric summary against it when the tasks finish.
#[tracing::instrument(skip(state, headers))]
pub async fn start_check(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<StartCheckResponse>, Rejection> {
    // ---
    let identity = require_identity(&state, &headers)?;

    let check = CheckRecord::new(identity.user_id);
    state.repository().create_check(&check).await.map_err(|e| {
        tracing::error!("Failed to create check: {e:?}");
        internal_rejection()
    })?;

    tracing::info!("Check {} started for {}", check.id, identity.email);

    Ok(Json(StartCheckResponse {
        ok: true,
        check_id: check.id,
    }))
}

// ============================================================================
// Check Completion Handler
// ============================================================================

/// POST /checks/complete
///
/// Scores the submitted metrics against the user's baselines, records the
/// outcome on the check exactly once, and — only when the flag is GREEN —
/// folds the observations into the baselines. The GREEN gate keeps degraded
/// sessions from redefining the user's "normal".
#[tracing::instrument(skip(state, headers, req))]
pub async fn complete_check(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CompleteCheckRequest>,
) -> Result<Json<CompleteCheckResponse>, Rejection> {
    // ---
    let identity = require_identity(&state, &headers)?;

    if req.metrics.is_empty() {
        return Err(validation_rejection("metrics must not be empty"));
    }
    if req.metrics.values().any(|v| !v.is_finite()) {
        return Err(validation_rejection("metric values must be finite numbers"));
    }

    let confidence = req.confidence.unwrap_or(50.0).clamp(0.0, 100.0);
    let integrity = req.integrity.unwrap_or(1.0);
    let metric_names: Vec<String> = req.metrics.keys().cloned().collect();

    let baselines: HashMap<String, _> = state
        .repository()
        .get_baselines(identity.user_id, &metric_names)
        .await
        .map_err(|e| {
            tracing::error!("Baseline read failed: {e:?}");
            internal_rejection()
        })?
        .into_iter()
        .map(|b| (b.metric.clone(), b))
        .collect();

    let score = scoring::score_check(state.scoring(), &req.metrics, confidence, &baselines);

    let metrics_json = serde_json::json!({
        "metrics": req.metrics,
        "confidence": confidence,
    });
    let score_json = serde_json::to_value(&score).map_err(|e| {
        tracing::error!("Score serialization failed: {e:?}");
        internal_rejection()
    })?;

    let completed = state
        .repository()
        .complete_check(
            req.check_id,
            identity.user_id,
            Utc::now(),
            &metrics_json,
            &score_json,
            score.readiness.as_str(),
            integrity,
        )
        .await
        .map_err(|e| {
            tracing::error!("Check completion failed: {e:?}");
            internal_rejection()
        })?;

    if !completed {
        // Unknown id, someone else's check, or a repeat submission: all
        // indistinguishable to the caller.
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "check not found".to_string(),
            }),
        ));
    }

    if score.readiness == ReadinessFlag::Green {
        // ---
        record_green_baselines(&state, identity.user_id, &req.metrics)
            .await
            .map_err(|e| {
                tracing::error!("Baseline update failed: {e:?}");
                internal_rejection()
            })?;
    }

    state.metrics().record_check_completed(score.readiness);
    tracing::info!(
        "Check {} completed for {}: {} (risk {:.2})",
        req.check_id,
        identity.email,
        score.readiness.as_str(),
        score.risk
    );

    Ok(Json(CompleteCheckResponse {
        ok: true,
        readiness: score.readiness,
        score,
    }))
}

/// Folds a GREEN check's observations into the user's baselines.
///
/// Writes are serialized per (user, metric) by optimistic concurrency: the
/// update only applies while the stored sample count matches the one the
/// new values were computed from. A lost race re-reads and retries a
/// bounded number of times; concurrent completions never silently lose an
/// observation inside the retry budget.
async fn record_green_baselines(
    state: &AppState,
    user_id: Uuid,
    metrics: &BTreeMap<String, f64>,
) -> anyhow::Result<()> {
    // ---
    let epsilon = state.scoring().std_epsilon;

    for (metric, observation) in metrics {
        // ---
        let mut attempts = 0;
        loop {
            attempts += 1;

            let current = state
                .repository()
                .get_baselines(user_id, std::slice::from_ref(metric))
                .await?
                .pop();

            let applied = match current {
                None => {
                    let fresh =
                        scoring::initial_baseline(user_id, metric, *observation, Utc::now());
                    state.repository().insert_baseline(&fresh).await?
                }
                Some(prior) => {
                    let advanced =
                        scoring::advance_baseline(&prior, *observation, epsilon, Utc::now());
                    state
                        .repository()
                        .update_baseline(&advanced, prior.sample_count)
                        .await?
                }
            };

            if applied {
                break;
            }
            if attempts >= BASELINE_WRITE_RETRIES {
                anyhow::bail!("baseline write for {metric} kept losing its race");
            }
        }
    }

    Ok(())
}

// ============================================================================
// Check Retrieval Handler
// ============================================================================

/// GET /checks/{id}
///
/// Returns one of the caller's check records, completed or not.
#[tracing::instrument(skip(state, headers))]
pub async fn get_check(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(check_id): Path<Uuid>,
) -> Result<Json<GetCheckResponse>, Rejection> {
    // ---
    let identity = require_identity(&state, &headers)?;

    let check = state
        .repository()
        .get_check(check_id, identity.user_id)
        .await
        .map_err(|e| {
            tracing::error!("Check lookup failed: {e:?}");
            internal_rejection()
        })?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "check not found".to_string(),
                }),
            )
        })?;

    Ok(Json(GetCheckResponse { ok: true, check }))
}
