use argon2::Params;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::BodyExt;
use nanoid::nanoid;
use secrecy::SecretString;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;

use user_accounts::api::handler::app_router;
use user_accounts::db::repo::memory_repository::InMemoryAccountRepository;
use user_accounts::service::email::Notifier;
use user_accounts::service::user_service;
use user_accounts::util::clock::ManualClock;
use user_accounts::util::crypto_helper::Argon2Encoder;
use user_accounts::{Account, AccountConfig, AccountStatus, AppState};

/// A message handed to the notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Confirmation {
        email: String,
        hash: String,
        password: Option<String>,
    },
    Reopen {
        email: String,
        hash: String,
    },
    Resetting {
        email: String,
        hash: String,
    },
    PasswordChanged {
        email: String,
        password: Option<String>,
    },
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Sent>>,
}

impl RecordingNotifier {
    pub async fn last(&self) -> Option<Sent> {
        self.sent.lock().await.last().cloned()
    }

    pub async fn count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_confirmation_email(
        &self,
        account: &Account,
        hash: &str,
        password: Option<&str>,
    ) -> Result<(), String> {
        self.sent.lock().await.push(Sent::Confirmation {
            email: account.email.clone(),
            hash: hash.to_string(),
            password: password.map(str::to_string),
        });
        Ok(())
    }

    async fn send_reopen_account_email(
        &self,
        account: &Account,
        hash: &str,
    ) -> Result<(), String> {
        self.sent.lock().await.push(Sent::Reopen {
            email: account.email.clone(),
            hash: hash.to_string(),
        });
        Ok(())
    }

    async fn send_resetting_email(&self, account: &Account, hash: &str) -> Result<(), String> {
        self.sent.lock().await.push(Sent::Resetting {
            email: account.email.clone(),
            hash: hash.to_string(),
        });
        Ok(())
    }

    async fn send_password_changed_email(
        &self,
        account: &Account,
        password: Option<&str>,
    ) -> Result<(), String> {
        self.sent.lock().await.push(Sent::PasswordChanged {
            email: account.email.clone(),
            password: password.map(str::to_string),
        });
        Ok(())
    }
}

pub struct TestContext {
    pub state: Arc<AppState>,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
}

/// State over the in-memory repository, a manual clock and a cheap Argon2 cost.
pub fn setup_test_app_state() -> TestContext {
    let clock = Arc::new(ManualClock::new(start_time()));
    let notifier = Arc::new(RecordingNotifier::default());
    let params = Params::new(1024, 1, 1, None).expect("valid argon2 params");
    let encoder =
        Argon2Encoder::with_params(SecretString::from("test-pepper".to_string()), params)
            .expect("encoder");

    let state = Arc::new(AppState {
        repository: Arc::new(InMemoryAccountRepository::new()),
        encoder: Arc::new(encoder),
        notifier: notifier.clone(),
        clock: clock.clone(),
        config: AccountConfig::default(),
    });
    TestContext {
        state,
        clock,
        notifier,
    }
}

pub fn setup_test_app(ctx: &TestContext) -> Router {
    app_router(ctx.state.clone())
}

pub fn get_test_email() -> String {
    format!("test_{}@example.com", nanoid!(10).to_lowercase())
}

/// Stores a `VERIFIED` account and returns it.
pub async fn verified_account(ctx: &TestContext, email: &str, password: &str) -> Account {
    account_with_status(ctx, email, password, AccountStatus::Verified).await
}

pub async fn account_with_status(
    ctx: &TestContext,
    email: &str,
    password: &str,
    status: AccountStatus,
) -> Account {
    let mut account =
        user_service::create_account::<&str>(&ctx.state, email, password, &[]).expect("account");
    account.status = status;
    ctx.state.repository.save(&mut account).await.expect("save");
    account
}

pub async fn reload(ctx: &TestContext, email: &str) -> Account {
    ctx.state
        .repository
        .find_account_by_email(email)
        .await
        .expect("lookup")
        .expect("account exists")
}

pub async fn make_request(
    app: Router,
    method: Method,
    uri: &str,
    body: Option<String>,
) -> Response {
    let request_builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    let request = if let Some(body_content) = body {
        request_builder.body(Body::from(body_content)).unwrap()
    } else {
        request_builder.body(Body::empty()).unwrap()
    };

    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}
