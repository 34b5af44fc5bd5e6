use axum::http::{Method, StatusCode};
use chrono::Duration;
use serde_json::json;
use user_accounts::AccountStatus;

use crate::helpers::Sent;

mod common {
    pub use crate::helpers::*;
}

const PASSWORD: &str = "SecurePassword123!";

fn sent_hash(sent: Option<Sent>) -> String {
    match sent {
        Some(Sent::Confirmation { hash, .. })
        | Some(Sent::Reopen { hash, .. })
        | Some(Sent::Resetting { hash, .. }) => hash,
        other => panic!("expected a token email, got {:?}", other),
    }
}

#[tokio::test]
async fn test_health() {
    let ctx = common::setup_test_app_state();
    let response =
        common::make_request(common::setup_test_app(&ctx), Method::GET, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::body_json(response).await["status"], "UP");
}

#[tokio::test]
async fn test_register_confirm_and_login() {
    let ctx = common::setup_test_app_state();
    let email = common::get_test_email();
    let body = json!({ "email": email, "password": PASSWORD }).to_string();

    let response = common::make_request(
        common::setup_test_app(&ctx),
        Method::POST,
        "/auth/register",
        Some(body.clone()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = common::body_json(response).await;
    assert_eq!(json["outcome"], "CREATED");
    assert_eq!(json["account"]["status"], "PENDING");
    assert_eq!(json["account"]["roles"], json!(["ROLE_USER"]));
    assert!(json["account"].get("passwordHash").is_none());

    // Not confirmed yet.
    let response = common::make_request(
        common::setup_test_app(&ctx),
        Method::POST,
        "/auth/login",
        Some(body.clone()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        common::body_json(response).await["code"],
        "error.account_status_pending"
    );

    let hash = sent_hash(ctx.notifier.last().await);
    let response = common::make_request(
        common::setup_test_app(&ctx),
        Method::GET,
        &format!("/auth/confirm-account?token={}", hash),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::body_json(response).await["status"], "VERIFIED");

    let response = common::make_request(
        common::setup_test_app(&ctx),
        Method::POST,
        "/auth/login",
        Some(body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = common::body_json(response).await;
    assert_eq!(json["email"], email);
    assert!(json["lastLoggedAt"].is_string());
}

#[tokio::test]
async fn test_register_twice_is_too_many_requests() {
    let ctx = common::setup_test_app_state();
    let body = json!({ "email": common::get_test_email(), "password": PASSWORD }).to_string();
    for expected in [StatusCode::CREATED, StatusCode::TOO_MANY_REQUESTS] {
        let response = common::make_request(
            common::setup_test_app(&ctx),
            Method::POST,
            "/auth/register",
            Some(body.clone()),
        )
        .await;
        assert_eq!(response.status(), expected);
    }
}

#[tokio::test]
async fn test_register_validates_body() {
    let ctx = common::setup_test_app_state();
    let body = json!({ "email": "not-an-email", "password": "short" }).to_string();
    let response = common::make_request(
        common::setup_test_app(&ctx),
        Method::POST,
        "/auth/register",
        Some(body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = common::body_json(response).await;
    let fields: Vec<&str> = json["subErrors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
}

#[tokio::test]
async fn test_login_lockout_statuses() {
    let ctx = common::setup_test_app_state();
    let email = common::get_test_email();
    common::verified_account(&ctx, &email, PASSWORD).await;
    let wrong = json!({ "email": email, "password": "wrong password" }).to_string();

    for _ in 0..2 {
        let response = common::make_request(
            common::setup_test_app(&ctx),
            Method::POST,
            "/auth/login",
            Some(wrong.clone()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(common::body_json(response).await["code"], "error.bad_credential");
    }

    let response = common::make_request(
        common::setup_test_app(&ctx),
        Method::POST,
        "/auth/login",
        Some(wrong.clone()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = common::body_json(response).await;
    assert_eq!(json["code"], "error.bad_credential_account_locked");
    assert_eq!(json["penaltySeconds"], 60);

    let right = json!({ "email": email, "password": PASSWORD }).to_string();
    let response = common::make_request(
        common::setup_test_app(&ctx),
        Method::POST,
        "/auth/login",
        Some(right.clone()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::LOCKED);
    assert!(common::body_json(response).await["lockedUntil"].is_string());

    ctx.clock.advance(Duration::seconds(61));
    let response = common::make_request(
        common::setup_test_app(&ctx),
        Method::POST,
        "/auth/login",
        Some(right),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_account_is_not_found() {
    let ctx = common::setup_test_app_state();
    let body = json!({ "email": "ghost@example.com", "password": PASSWORD }).to_string();
    let response = common::make_request(
        common::setup_test_app(&ctx),
        Method::POST,
        "/auth/login",
        Some(body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        common::body_json(response).await["code"],
        "error.account_not_found"
    );
}

#[tokio::test]
async fn test_forgot_and_reset_password() {
    let ctx = common::setup_test_app_state();
    let email = common::get_test_email();
    common::verified_account(&ctx, &email, PASSWORD).await;

    let response = common::make_request(
        common::setup_test_app(&ctx),
        Method::POST,
        "/auth/forgot-password",
        Some(json!({ "email": email }).to_string()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let hash = sent_hash(ctx.notifier.last().await);

    let response = common::make_request(
        common::setup_test_app(&ctx),
        Method::GET,
        &format!("/auth/reset-password?token={}", hash),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::body_json(response).await["email"], email);

    let response = common::make_request(
        common::setup_test_app(&ctx),
        Method::POST,
        &format!("/auth/reset-password?token={}", hash),
        Some(json!({ "password": "AnotherPassword456!" }).to_string()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // The token is gone once used.
    let response = common::make_request(
        common::setup_test_app(&ctx),
        Method::POST,
        &format!("/auth/reset-password?token={}", hash),
        Some(json!({ "password": "YetAnotherPassword789!" }).to_string()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        common::body_json(response).await["code"],
        "error.token_invalid"
    );
}

#[tokio::test]
async fn test_reopen_closed_account() {
    let ctx = common::setup_test_app_state();
    let email = common::get_test_email();
    common::account_with_status(&ctx, &email, PASSWORD, AccountStatus::Closed).await;

    let response = common::make_request(
        common::setup_test_app(&ctx),
        Method::POST,
        "/auth/register",
        Some(json!({ "email": email, "password": PASSWORD }).to_string()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::body_json(response).await["outcome"], "REOPEN_REQUESTED");

    let hash = sent_hash(ctx.notifier.last().await);
    let response = common::make_request(
        common::setup_test_app(&ctx),
        Method::GET,
        &format!("/auth/reopen-account?token={}", hash),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::reload(&ctx, &email).await.status, AccountStatus::Verified);
}

#[tokio::test]
async fn test_unknown_token_is_forbidden() {
    let ctx = common::setup_test_app_state();
    let response = common::make_request(
        common::setup_test_app(&ctx),
        Method::GET,
        "/auth/confirm-account?token=doesnotexist",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
