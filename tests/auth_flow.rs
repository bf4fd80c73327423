//! End-to-end passwordless login flow.
//!
//! The mailer under test is the noop backend, so the raw code never reaches
//! these tests through the API. Where a known code is required, the tests
//! seed a pending credential directly through the repository, the same way
//! `request_code` would have stored it.

mod common;

use chrono::{Duration, Utc};
use common::{session_cookie_from, unique_email, TestServer};
use readycheck::domain::PendingCredential;
use readycheck::{code_digest, normalize_email};
use serde_json::json;
use uuid::Uuid;

const COOKIE_NAME: &str = "ready_session";

/// Stores a pending credential for (email, code) as if it had just been
/// requested. Returns nothing; the digest is what the API will look up.
async fn seed_code(email: &str, code: &str, ttl: Duration) {
    // ---
    let repository = common::test_repository().await;
    let email = normalize_email(email);
    let now = Utc::now();

    let pending = PendingCredential {
        id: Uuid::new_v4(),
        secret_hash: code_digest(&email, code),
        email,
        created_at: now,
        expires_at: now + ttl,
        consumed_at: None,
    };
    repository
        .insert_pending_credential(&pending)
        .await
        .expect("failed to seed credential");
}

#[tokio::test]
#[serial_test::serial]
async fn request_code_accepts_a_valid_email() {
    // ---
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/auth/request"))
        .json(&json!({ "email": unique_email("request") }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["ok"], true);
}

#[tokio::test]
#[serial_test::serial]
async fn request_code_rejects_invalid_email() {
    // ---
    let server = TestServer::new().await;

    for bad in ["", "   ", "no-at-sign"] {
        let response = server
            .client
            .post(server.url("/auth/request"))
            .json(&json!({ "email": bad }))
            .send()
            .await
            .expect("Failed to send request");

        assert_eq!(response.status(), 400, "accepted bad email: {bad:?}");
    }
}

#[tokio::test]
#[serial_test::serial]
async fn verify_rejects_malformed_code_before_lookup() {
    // ---
    let server = TestServer::new().await;

    for bad in ["12345", "1234567", "12a456", ""] {
        let response = server
            .client
            .post(server.url("/auth/verify"))
            .json(&json!({ "email": unique_email("shape"), "code": bad }))
            .send()
            .await
            .expect("Failed to send request");

        assert_eq!(response.status(), 400, "accepted bad code: {bad:?}");
    }
}

#[tokio::test]
#[serial_test::serial]
async fn verify_rejects_unknown_code() {
    // ---
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/auth/verify"))
        .json(&json!({ "email": unique_email("unknown"), "code": "123456" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["error"], "invalid credential");
}

#[tokio::test]
#[serial_test::serial]
async fn verify_with_seeded_code_starts_a_session() {
    // ---
    let server = TestServer::new().await;
    let email = unique_email("login");
    seed_code(&email, "314159", Duration::minutes(10)).await;

    let response = server
        .client
        .post(server.url("/auth/verify"))
        .json(&json!({ "email": email, "code": "314159" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);

    let token =
        session_cookie_from(&response, COOKIE_NAME).expect("no session cookie in response");

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["ok"], true);
    assert_eq!(body["user"]["email"], email.to_lowercase());

    // The session resolves back to the same identity.
    let me = server
        .client
        .get(server.url("/auth/me"))
        .header("cookie", format!("{COOKIE_NAME}={token}"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(me.status(), 200);
    let me_body: serde_json::Value = me.json().await.expect("Failed to parse JSON");
    assert_eq!(me_body["user"]["email"], email.to_lowercase());
    assert_eq!(me_body["user"]["id"], body["user"]["id"]);
}

#[tokio::test]
#[serial_test::serial]
async fn verify_consumes_the_code_exactly_once() {
    // ---
    let server = TestServer::new().await;
    let email = unique_email("single-use");
    seed_code(&email, "271828", Duration::minutes(10)).await;

    let first = server
        .client
        .post(server.url("/auth/verify"))
        .json(&json!({ "email": email, "code": "271828" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(first.status(), 200);

    // The same code again is a terminal failure, not a second login.
    let second = server
        .client
        .post(server.url("/auth/verify"))
        .json(&json!({ "email": email, "code": "271828" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(second.status(), 401);

    let body: serde_json::Value = second.json().await.expect("Failed to parse JSON");
    assert_eq!(body["error"], "credential already used");
}

#[tokio::test]
#[serial_test::serial]
async fn verify_rejects_expired_code() {
    // ---
    let server = TestServer::new().await;
    let email = unique_email("expired");
    seed_code(&email, "161803", Duration::minutes(-1)).await;

    let response = server
        .client
        .post(server.url("/auth/verify"))
        .json(&json!({ "email": email, "code": "161803" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["error"], "credential expired");
}

#[tokio::test]
#[serial_test::serial]
async fn verify_binds_code_to_email() {
    // ---
    let server = TestServer::new().await;
    let email = unique_email("bound");
    seed_code(&email, "577215", Duration::minutes(10)).await;

    // Right code, wrong email: the digest never matches.
    let response = server
        .client
        .post(server.url("/auth/verify"))
        .json(&json!({ "email": unique_email("intruder"), "code": "577215" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[serial_test::serial]
async fn repeat_login_reuses_the_same_user() {
    // ---
    let server = TestServer::new().await;
    let email = unique_email("repeat");

    seed_code(&email, "111111", Duration::minutes(10)).await;
    let first = server
        .client
        .post(server.url("/auth/verify"))
        .json(&json!({ "email": email, "code": "111111" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(first.status(), 200);
    let first_body: serde_json::Value = first.json().await.expect("Failed to parse JSON");

    seed_code(&email, "222222", Duration::minutes(10)).await;
    let second = server
        .client
        .post(server.url("/auth/verify"))
        .json(&json!({ "email": email, "code": "222222" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(second.status(), 200);
    let second_body: serde_json::Value = second.json().await.expect("Failed to parse JSON");

    assert_eq!(first_body["user"]["id"], second_body["user"]["id"]);
}

#[tokio::test]
#[serial_test::serial]
async fn logout_clears_the_cookie() {
    // ---
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/auth/logout"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);

    let set_cookie = response
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .expect("no Set-Cookie on logout")
        .to_str()
        .unwrap();

    assert!(set_cookie.starts_with(&format!("{COOKIE_NAME}=")));
    assert!(set_cookie.contains("Max-Age=0"));
}
