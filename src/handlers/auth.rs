//! Passwordless authentication handlers.
//!
//! Implements the one-time-code flow:
//! 1. `request_code` - issue a 6-digit code, store its digest, email it
//! 2. `verify_code` - check the digest, consume the code once, start a session
//!
//! Plus session introspection (`me`) and client-side logout.

use crate::app_state::AppState;
use crate::cookies;
use crate::credential;
use crate::domain::{AuthError, Identity, PendingCredential};
use crate::handlers::shared_types::*;
use crate::session;
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::AppendHeaders;
use axum::{extract::State, Json};
use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

type SetCookie = AppendHeaders<[(HeaderName, String); 1]>;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RequestCodeRequest {
    // ---
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct RequestCodeResponse {
    // ---
    pub ok: bool,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    // ---
    pub email: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct UserBody {
    // ---
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyCodeResponse {
    // ---
    pub ok: bool,
    pub user: UserBody,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    // ---
    pub ok: bool,
    pub user: UserBody,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    // ---
    pub ok: bool,
}

// ============================================================================
// Session resolution
// ============================================================================

/// Resolves the requesting identity from the session cookie.
///
/// Validation is read-only; every failure (no cookie, malformed token, bad
/// tag, expired claims) maps to a single 401 so nothing leaks about which
/// step rejected.
pub(crate) fn require_identity(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Identity, Rejection> {
    // ---
    let cookie_header = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let cookies = cookies::parse_cookie_header(cookie_header);
    let token = cookies
        .get(&state.auth().cookie_name)
        .ok_or_else(|| auth_rejection(AuthError::Unauthenticated))?;

    session::validate_session(&state.auth().session_secret, token, Utc::now())
        .map_err(auth_rejection)
}

// ============================================================================
// Code Request Handler
// ============================================================================

/// POST /auth/request
///
/// Issues a one-time login code for an email address. Only the digest is
/// stored; the code travels exclusively in the outbound email. A delivery
/// failure is reported as a dependency error, never swallowed.
#[tracing::instrument(skip(state, req))]
pub async fn request_code(
    State(state): State<AppState>,
    Json(req): Json<RequestCodeRequest>,
) -> Result<Json<RequestCodeResponse>, Rejection> {
    // ---
    let email = credential::validate_email(&req.email)
        .map_err(|e| validation_rejection(e.to_string()))?;

    let now = Utc::now();
    let ttl_minutes = state.auth().code_ttl_minutes();

    if state.auth().invalidate_prior_codes {
        // ---
        let expired = state
            .repository()
            .expire_outstanding_credentials(&email, now)
            .await
            .map_err(|e| {
                tracing::error!("Failed to expire outstanding codes: {e:?}");
                internal_rejection()
            })?;
        if expired > 0 {
            tracing::info!("Expired {expired} outstanding code(s) for {email}");
        }
    }

    let code = credential::generate_code();
    let pending = PendingCredential {
        id: Uuid::new_v4(),
        email: email.clone(),
        secret_hash: credential::code_digest(&email, &code),
        created_at: now,
        expires_at: now + ChronoDuration::seconds(state.auth().code_ttl.as_secs() as i64),
        consumed_at: None,
    };

    state
        .repository()
        .insert_pending_credential(&pending)
        .await
        .map_err(|e| {
            tracing::error!("Failed to store pending credential: {e:?}");
            internal_rejection()
        })?;

    state
        .mailer()
        .send_login_code(&email, &code, ttl_minutes)
        .await
        .map_err(|e| {
            // The digest stays out of the log; the provider detail goes in.
            tracing::error!("Login code delivery failed for {email}: {e:?}");
            dependency_rejection("email delivery failed")
        })?;

    state.metrics().record_credential_issued();
    tracing::info!("Issued login code for {email}");

    Ok(Json(RequestCodeResponse { ok: true }))
}

// ============================================================================
// Code Verification Handler
// ============================================================================

/// POST /auth/verify
///
/// Verifies a presented code, consumes it exactly once, upserts the user,
/// and starts a session delivered as an HttpOnly cookie.
///
/// # Verdict order (first match wins)
/// no matching digest → invalid; already consumed → used; past expiry →
/// expired. The consume itself is a compare-and-set, so of two concurrent
/// submissions of the same code the loser observes `AlreadyUsed`.
#[tracing::instrument(skip(state, req))]
pub async fn verify_code(
    State(state): State<AppState>,
    Json(req): Json<VerifyCodeRequest>,
) -> Result<(SetCookie, Json<VerifyCodeResponse>), Rejection> {
    // ---
    let email = credential::validate_email(&req.email)
        .map_err(|e| validation_rejection(e.to_string()))?;
    credential::validate_code_shape(&req.code)
        .map_err(|e| validation_rejection(e.to_string()))?;

    let digest = credential::code_digest(&email, &req.code);
    let now = Utc::now();

    let verdict = async {
        // ---
        let pending = state
            .repository()
            .find_pending_credential(&email, &digest)
            .await
            .map_err(|e| {
                tracing::error!("Credential lookup failed: {e:?}");
                internal_rejection()
            })?
            .ok_or_else(|| auth_rejection(AuthError::InvalidCredential))?;

        if pending.consumed_at.is_some() {
            return Err(auth_rejection(AuthError::AlreadyUsed));
        }
        if now > pending.expires_at {
            return Err(auth_rejection(AuthError::Expired));
        }

        let consumed = state
            .repository()
            .consume_credential(pending.id, now)
            .await
            .map_err(|e| {
                tracing::error!("Credential consume failed: {e:?}");
                internal_rejection()
            })?;
        if !consumed {
            // A concurrent verification won the compare-and-set.
            return Err(auth_rejection(AuthError::AlreadyUsed));
        }

        Ok(())
    }
    .await;

    if let Err(rejection) = verdict {
        // ---
        // A store error is not a verification outcome; only auth verdicts
        // count toward the failure counter.
        if rejection.0 == StatusCode::UNAUTHORIZED {
            state.metrics().record_credential_verified(false);
        }
        return Err(rejection);
    }

    let user = state.repository().upsert_user(&email).await.map_err(|e| {
        tracing::error!("User upsert failed: {e:?}");
        internal_rejection()
    })?;

    let token = session::issue_session(
        &state.auth().session_secret,
        user.id,
        &user.email,
        state.auth().session_ttl,
        now,
    )
    .map_err(|e| {
        tracing::error!("Session issue failed: {e:?}");
        internal_rejection()
    })?;

    let cookie = cookies::session_cookie(
        &state.auth().cookie_name,
        &token,
        state.auth().session_ttl.as_secs(),
        state.auth().cookie_secure,
    );

    state.metrics().record_credential_verified(true);
    tracing::info!("User {} signed in", user.email);

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(VerifyCodeResponse {
            ok: true,
            user: UserBody {
                id: user.id,
                email: user.email,
            },
        }),
    ))
}

// ============================================================================
// Session Introspection Handler
// ============================================================================

/// GET /auth/me
///
/// Returns the identity carried by the session cookie, or 401.
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, Rejection> {
    // ---
    let identity = require_identity(&state, &headers)?;

    Ok(Json(MeResponse {
        ok: true,
        user: UserBody {
            id: identity.user_id,
            email: identity.email,
        },
    }))
}

// ============================================================================
// Logout Handler
// ============================================================================

/// POST /auth/logout
///
/// Discards the session cookie client-side. There is no server-side
/// revocation: a captured token stays valid until its natural expiry.
pub async fn logout(
    State(state): State<AppState>,
) -> (StatusCode, SetCookie, Json<LogoutResponse>) {
    // ---
    let cookie =
        cookies::clear_session_cookie(&state.auth().cookie_name, state.auth().cookie_secure);

    (
        StatusCode::OK,
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(LogoutResponse { ok: true }),
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::config::{AuthConfig, ScoringConfig};
    use crate::domain::{
        CheckRecord, Mailer, MetricBaseline, Metrics, ReadinessFlag, Repository, User,
    };
    use anyhow::Result;
    use chrono::DateTime;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// In-memory repository stub: records inserted credentials, serves a
    /// canned lookup result, and can simulate a store outage.
    #[derive(Default)]
    struct StubRepository {
        inserted: Mutex<Vec<PendingCredential>>,
        find_result: Mutex<Option<PendingCredential>>,
        fail_find: bool,
    }

    #[async_trait::async_trait]
    impl Repository for StubRepository {
        // ---
        async fn ping(&self) -> Result<()> {
            Ok(())
        }
        async fn insert_pending_credential(&self, credential: &PendingCredential) -> Result<()> {
            self.inserted.lock().unwrap().push(credential.clone());
            Ok(())
        }
        async fn find_pending_credential(
            &self,
            _email: &str,
            _hash: &str,
        ) -> Result<Option<PendingCredential>> {
            if self.fail_find {
                anyhow::bail!("connection reset by peer");
            }
            Ok(self.find_result.lock().unwrap().clone())
        }
        async fn consume_credential(&self, _id: Uuid, _when: DateTime<Utc>) -> Result<bool> {
            Ok(true)
        }
        async fn expire_outstanding_credentials(
            &self,
            _email: &str,
            _when: DateTime<Utc>,
        ) -> Result<u64> {
            Ok(0)
        }
        async fn upsert_user(&self, email: &str) -> Result<User> {
            Ok(User::new(email.to_string()))
        }
        async fn get_user_by_id(&self, _user_id: Uuid) -> Result<Option<User>> {
            Ok(None)
        }
        async fn create_check(&self, _check: &CheckRecord) -> Result<()> {
            Ok(())
        }
        async fn complete_check(
            &self,
            _check_id: Uuid,
            _user_id: Uuid,
            _ended_at: DateTime<Utc>,
            _metrics_json: &Value,
            _score_json: &Value,
            _readiness: &str,
            _integrity: f64,
        ) -> Result<bool> {
            Ok(true)
        }
        async fn get_check(&self, _check_id: Uuid, _user_id: Uuid) -> Result<Option<CheckRecord>> {
            Ok(None)
        }
        async fn get_baselines(
            &self,
            _user_id: Uuid,
            _metrics: &[String],
        ) -> Result<Vec<MetricBaseline>> {
            Ok(Vec::new())
        }
        async fn insert_baseline(&self, _baseline: &MetricBaseline) -> Result<bool> {
            Ok(true)
        }
        async fn update_baseline(
            &self,
            _baseline: &MetricBaseline,
            _expected_samples: i32,
        ) -> Result<bool> {
            Ok(true)
        }
    }

    struct FailingMailer;

    #[async_trait::async_trait]
    impl Mailer for FailingMailer {
        // ---
        async fn send_login_code(&self, _to: &str, _code: &str, _ttl: u64) -> Result<()> {
            anyhow::bail!("provider returned 500")
        }
    }

    struct OkMailer;

    #[async_trait::async_trait]
    impl Mailer for OkMailer {
        // ---
        async fn send_login_code(&self, _to: &str, _code: &str, _ttl: u64) -> Result<()> {
            Ok(())
        }
    }

    /// Counts failed-verification recordings so tests can assert when the
    /// counter does and does not move.
    #[derive(Default)]
    struct CountingMetrics {
        verify_failures: AtomicUsize,
    }

    impl Metrics for CountingMetrics {
        // ---
        fn render(&self) -> String {
            String::new()
        }
        fn record_credential_issued(&self) {}
        fn record_credential_verified(&self, success: bool) {
            if !success {
                self.verify_failures.fetch_add(1, Ordering::SeqCst);
            }
        }
        fn record_check_completed(&self, _: ReadinessFlag) {}
    }

    fn auth_config() -> AuthConfig {
        // ---
        AuthConfig {
            session_secret: "0123456789abcdef0123456789abcdef".to_string(),
            session_ttl: Duration::from_secs(14 * 24 * 60 * 60),
            code_ttl: Duration::from_secs(600),
            cookie_name: "ready_session".to_string(),
            cookie_secure: false,
            invalidate_prior_codes: false,
        }
    }

    fn state_with(
        repository: Arc<StubRepository>,
        mailer: Arc<dyn Mailer>,
        metrics: Arc<CountingMetrics>,
    ) -> AppState {
        // ---
        AppState::new(
            repository,
            mailer,
            metrics,
            auth_config(),
            ScoringConfig::default(),
        )
    }

    #[tokio::test]
    async fn delivery_failure_surfaces_as_bad_gateway() {
        // ---
        // A failed send must reach the caller as a dependency error, with
        // the credential row already stored from before the send attempt.
        let repository = Arc::new(StubRepository::default());
        let state = state_with(
            repository.clone(),
            Arc::new(FailingMailer),
            Arc::new(CountingMetrics::default()),
        );

        let result = request_code(
            State(state),
            Json(RequestCodeRequest {
                email: "traveler@example.com".to_string(),
            }),
        )
        .await;

        let (status, body) = result.expect_err("delivery failure must reject");
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.error, "email delivery failed");

        let inserted = repository.inserted.lock().unwrap();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].email, "traveler@example.com");
    }

    #[tokio::test]
    async fn successful_request_returns_ok() {
        // ---
        let repository = Arc::new(StubRepository::default());
        let state = state_with(
            repository.clone(),
            Arc::new(OkMailer),
            Arc::new(CountingMetrics::default()),
        );

        let response = request_code(
            State(state),
            Json(RequestCodeRequest {
                email: "  Traveler@Example.COM ".to_string(),
            }),
        )
        .await
        .expect("request should succeed");

        assert!(response.ok);
        // Stored against the normalized email.
        assert_eq!(
            repository.inserted.lock().unwrap()[0].email,
            "traveler@example.com"
        );
    }

    #[tokio::test]
    async fn bad_code_moves_the_failure_counter() {
        // ---
        let repository = Arc::new(StubRepository::default());
        let metrics = Arc::new(CountingMetrics::default());
        let state = state_with(repository, Arc::new(OkMailer), metrics.clone());

        let result = verify_code(
            State(state),
            Json(VerifyCodeRequest {
                email: "traveler@example.com".to_string(),
                code: "123456".to_string(),
            }),
        )
        .await;

        let (status, _) = result.expect_err("unknown code must reject");
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(metrics.verify_failures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn store_error_is_not_a_verification_outcome() {
        // ---
        let repository = Arc::new(StubRepository {
            fail_find: true,
            ..StubRepository::default()
        });
        let metrics = Arc::new(CountingMetrics::default());
        let state = state_with(repository, Arc::new(OkMailer), metrics.clone());

        let result = verify_code(
            State(state),
            Json(VerifyCodeRequest {
                email: "traveler@example.com".to_string(),
                code: "123456".to_string(),
            }),
        )
        .await;

        let (status, _) = result.expect_err("store outage must reject");
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(metrics.verify_failures.load(Ordering::SeqCst), 0);
    }
}
