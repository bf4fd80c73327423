//! Session management for authenticated users.
//!
//! Sessions are self-contained signed claims: a compact
//! `base64url(header).base64url(claims).base64url(tag)` token whose tag is an
//! HMAC-SHA256 over the first two segments, keyed by the server-held session
//! secret. Nothing is stored server-side, so validation is read-only and
//! side-effect-free.
//!
//! There is no revocation list. Logout only discards the client cookie; a
//! captured token remains valid until its natural expiry.

use crate::domain::{AuthError, Identity};
use anyhow::Result;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    //
    alg: String,
    typ: String,
}

/// Claim set carried inside a session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    //
    pub uid: Uuid,
    pub email: String,

    /// Issued-at, seconds since epoch.
    pub iat: i64,

    /// Expiry, seconds since epoch.
    pub exp: i64,
}

/// Signs a new session token for a verified identity.
///
/// # Errors
/// Fails only on serialization problems; key material of any length is
/// accepted by HMAC.
pub fn issue_session(
    secret: &str,
    user_id: Uuid,
    email: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String> {
    // ---
    let header = Header {
        alg: "HS256".to_string(),
        typ: "JWT".to_string(),
    };
    let claims = SessionClaims {
        uid: user_id,
        email: email.to_string(),
        iat: now.timestamp(),
        exp: now.timestamp() + ttl.as_secs() as i64,
    };

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?),
    );

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("invalid HMAC key: {e}"))?;
    mac.update(signing_input.as_bytes());
    let tag = mac.finalize().into_bytes();

    Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(tag)))
}

/// Validates a session token and resolves the identity it carries.
///
/// Every rejection path — malformed structure, unknown algorithm, tag
/// mismatch, elapsed expiry — degrades to [`AuthError::Unauthenticated`].
/// The tag comparison is constant-time via `Mac::verify_slice`.
pub fn validate_session(
    secret: &str,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Identity, AuthError> {
    // ---
    let mut parts = token.split('.');
    let (Some(header_b64), Some(claims_b64), Some(tag_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::Unauthenticated);
    };

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|_| AuthError::Unauthenticated)?;
    let header: Header =
        serde_json::from_slice(&header_bytes).map_err(|_| AuthError::Unauthenticated)?;
    if header.alg != "HS256" {
        return Err(AuthError::Unauthenticated);
    }

    let tag = URL_SAFE_NO_PAD
        .decode(tag_b64)
        .map_err(|_| AuthError::Unauthenticated)?;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::Unauthenticated)?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(claims_b64.as_bytes());
    mac.verify_slice(&tag)
        .map_err(|_| AuthError::Unauthenticated)?;

    let claims_bytes = URL_SAFE_NO_PAD
        .decode(claims_b64)
        .map_err(|_| AuthError::Unauthenticated)?;
    let claims: SessionClaims =
        serde_json::from_slice(&claims_bytes).map_err(|_| AuthError::Unauthenticated)?;

    if now.timestamp() > claims.exp {
        return Err(AuthError::Unauthenticated);
    }

    Ok(Identity {
        user_id: claims.uid,
        email: claims.email,
    })
}
