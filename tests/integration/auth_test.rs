use chrono::Duration;
use user_accounts::service::auth_service::authenticate;
use user_accounts::{AccountError, AccountStatus, StatusReason};

mod common {
    pub use crate::helpers::*;
}

const PASSWORD: &str = "correct horse battery";

#[tokio::test]
async fn test_login_success_clears_streak_and_records_time() {
    let ctx = common::setup_test_app_state();
    let email = common::get_test_email();
    let mut account = common::verified_account(&ctx, &email, PASSWORD).await;
    account.failed_login_streak = 2;
    ctx.state.repository.save(&mut account).await.unwrap();

    let logged = authenticate(&ctx.state, &email, PASSWORD).await.unwrap();
    assert_eq!(logged.failed_login_streak, 0);
    assert_eq!(logged.locked_until, None);
    assert_eq!(logged.last_logged_at, Some(common::start_time()));

    let stored = common::reload(&ctx, &email).await;
    assert_eq!(stored.failed_login_streak, 0);
    assert_eq!(stored.last_logged_at, Some(common::start_time()));
}

#[tokio::test]
async fn test_unknown_email_is_not_found() {
    let ctx = common::setup_test_app_state();
    let err = authenticate(&ctx.state, "nobody@example.com", PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::AccountNotFound));
}

#[tokio::test]
async fn test_third_failure_locks_for_one_minute() {
    let ctx = common::setup_test_app_state();
    let email = common::get_test_email();
    let mut account = common::verified_account(&ctx, &email, PASSWORD).await;
    account.failed_login_streak = 2;
    ctx.state.repository.save(&mut account).await.unwrap();

    let err = authenticate(&ctx.state, &email, "wrong password")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AccountError::InvalidCredentials {
            penalty_seconds: Some(60)
        }
    ));

    let stored = common::reload(&ctx, &email).await;
    assert_eq!(stored.failed_login_streak, 3);
    assert_eq!(
        stored.locked_until,
        Some(common::start_time() + Duration::seconds(60))
    );
}

#[tokio::test]
async fn test_first_failures_carry_no_penalty() {
    let ctx = common::setup_test_app_state();
    let email = common::get_test_email();
    common::verified_account(&ctx, &email, PASSWORD).await;

    for expected_streak in 1..=2 {
        let err = authenticate(&ctx.state, &email, "nope").await.unwrap_err();
        assert!(matches!(
            err,
            AccountError::InvalidCredentials {
                penalty_seconds: None
            }
        ));
        let stored = common::reload(&ctx, &email).await;
        assert_eq!(stored.failed_login_streak, expected_streak);
        assert_eq!(stored.locked_until, None);
    }
}

#[tokio::test]
async fn test_locked_account_rejects_even_correct_password() {
    let ctx = common::setup_test_app_state();
    let email = common::get_test_email();
    let mut account = common::verified_account(&ctx, &email, PASSWORD).await;
    account.failed_login_streak = 3;
    account.locked_until = Some(common::start_time() + Duration::seconds(60));
    ctx.state.repository.save(&mut account).await.unwrap();

    let err = authenticate(&ctx.state, &email, PASSWORD).await.unwrap_err();
    assert!(matches!(err, AccountError::AccountLocked { .. }));

    // A wrong password during the lockout does not lengthen the streak.
    let err = authenticate(&ctx.state, &email, "wrong").await.unwrap_err();
    assert!(matches!(err, AccountError::AccountLocked { .. }));
    assert_eq!(common::reload(&ctx, &email).await.failed_login_streak, 3);

    // Still locked at the exact expiry instant.
    ctx.clock.advance(Duration::seconds(60));
    let err = authenticate(&ctx.state, &email, PASSWORD).await.unwrap_err();
    assert!(matches!(err, AccountError::AccountLocked { .. }));

    ctx.clock.advance(Duration::seconds(1));
    let logged = authenticate(&ctx.state, &email, PASSWORD).await.unwrap();
    assert_eq!(logged.failed_login_streak, 0);
}

#[tokio::test]
async fn test_pending_account_fails_before_password_check() {
    let ctx = common::setup_test_app_state();
    let email = common::get_test_email();
    common::account_with_status(&ctx, &email, PASSWORD, AccountStatus::Pending).await;

    // Wrong password on purpose: the status check answers first.
    let err = authenticate(&ctx.state, &email, "wrong").await.unwrap_err();
    assert!(matches!(
        err,
        AccountError::AccountStatus {
            reason: StatusReason::Pending
        }
    ));
    assert_eq!(common::reload(&ctx, &email).await.failed_login_streak, 0);
}

#[tokio::test]
async fn test_banned_and_closed_accounts_cannot_log_in() {
    let ctx = common::setup_test_app_state();
    for (status, reason) in [
        (AccountStatus::Banned, StatusReason::Banned),
        (AccountStatus::Closed, StatusReason::Closed),
    ] {
        let email = common::get_test_email();
        common::account_with_status(&ctx, &email, PASSWORD, status).await;
        let err = authenticate(&ctx.state, &email, PASSWORD).await.unwrap_err();
        assert!(matches!(err, AccountError::AccountStatus { reason: r } if r == reason));
    }
}

#[tokio::test]
async fn test_penalty_escalates_to_one_day() {
    let ctx = common::setup_test_app_state();
    let email = common::get_test_email();
    let mut account = common::verified_account(&ctx, &email, PASSWORD).await;
    account.failed_login_streak = 20;
    ctx.state.repository.save(&mut account).await.unwrap();

    let err = authenticate(&ctx.state, &email, "wrong").await.unwrap_err();
    assert!(matches!(
        err,
        AccountError::InvalidCredentials {
            penalty_seconds: Some(86_400)
        }
    ));
}
