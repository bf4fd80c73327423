use crate::domain::AuthError;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

/// Error body returned by every failing handler.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    // ---
    pub error: String,
}

/// Rejection tuple shared by all handlers.
pub type Rejection = (StatusCode, Json<ErrorResponse>);

/// 400 for caller-correctable input problems.
pub fn validation_rejection(message: impl Into<String>) -> Rejection {
    // ---
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// 401 carrying the terminal auth verdict.
pub fn auth_rejection(err: AuthError) -> Rejection {
    // ---
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

/// 500 with a generic body; the diagnosable detail goes to the log, never
/// to the client.
pub fn internal_rejection() -> Rejection {
    // ---
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "internal server error".to_string(),
        }),
    )
}

/// 502 for failing external collaborators (email delivery).
pub fn dependency_rejection(message: impl Into<String>) -> Rejection {
    // ---
    (
        StatusCode::BAD_GATEWAY,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}
