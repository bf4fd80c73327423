use axum::response::IntoResponse;

pub async fn root_handler() -> impl IntoResponse {
    let version = env!("CARGO_PKG_VERSION");
    format!(
        r#"Welcome to the Readiness Check API 👋
Version: {version}

Available endpoints:
  - POST /auth/request       - Request a one-time login code by email
  - POST /auth/verify        - Verify a code and start a session
  - POST /auth/logout        - Discard the session cookie
  - GET  /auth/me            - Resolve the current identity
  - POST /checks/start       - Open a readiness check
  - POST /checks/complete    - Submit metrics and get a readiness flag
  - GET  /checks/{{id}}        - Fetch one of your check records
  - GET  /health             - Light health check
  - GET  /health?mode=full   - Full health check (includes Postgres)
  - GET  /metrics            - Prometheus metrics

Non-diagnostic readiness check: results compare you against your own
baseline, nothing else.
"#
    )
}
