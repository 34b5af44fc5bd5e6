use crate::api::handler::validate_request;
use crate::api::model::auth::{
    ForgotPasswordRequest, LoginRequest, MessageResponse, RegisterRequest, RegisterResponse,
    ResetPasswordRequest, TokenQuery,
};
use crate::api::model::user::StoredAccount;
use crate::config::app_config::AppState;
use crate::error::error_model::{ApiError, AppError};
use crate::service::user_service::RegistrationOutcome;
use crate::service::{auth_service, user_service};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;

/// Account routes, nested under `/auth`.
pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login_handler))
        .route("/register", post(register_handler))
        .route("/confirm-account", get(confirm_account_handler))
        .route("/reopen-account", get(reopen_account_handler))
        .route("/forgot-password", post(forgot_password_handler))
        .route(
            "/reset-password",
            get(check_reset_token_handler).post(reset_password_handler),
        )
}

/// Authenticate account
///
/// Check email and password. Repeated failures lock the account for a growing period.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Account authenticated", body = StoredAccount),
        (status = 401, description = "Invalid credentials", body = ApiError),
        (status = 403, description = "Account status does not allow login", body = ApiError),
        (status = 404, description = "Account not found", body = ApiError),
        (status = 422, description = "Unprocessable request", body = ApiError),
        (status = 423, description = "Account temporarily locked", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, AppError> {
    validate_request(&request, "LoginRequest")?;
    let account = auth_service::authenticate(&state, &request.email, &request.password).await?;
    Ok((StatusCode::OK, Json(StoredAccount::from(&account))).into_response())
}

/// Register account
///
/// Create a pending account, or send a new confirmation or reopen link for an existing one.
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 200, description = "New confirmation or reopen link sent", body = RegisterResponse),
        (status = 403, description = "Account already verified or banned", body = ApiError),
        (status = 422, description = "Unprocessable request", body = ApiError),
        (status = 429, description = "A link was sent recently", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Response, AppError> {
    validate_request(&request, "RegisterRequest")?;
    let registration = user_service::register(&state, &request.email, &request.password).await?;
    let status = match registration.outcome {
        RegistrationOutcome::Created => StatusCode::CREATED,
        _ => StatusCode::OK,
    };
    Ok((
        status,
        Json(RegisterResponse {
            outcome: registration.outcome.as_str().to_string(),
            account: StoredAccount::from(&registration.account),
        }),
    )
        .into_response())
}

/// Confirm account
///
/// Consume an account confirmation token.
#[utoipa::path(
    get,
    path = "/auth/confirm-account",
    tag = "Authentication",
    params(TokenQuery),
    responses(
        (status = 200, description = "Account confirmed", body = StoredAccount),
        (status = 403, description = "Invalid token or account not pending", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError),
    )
)]
pub async fn confirm_account_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
) -> Result<Response, AppError> {
    validate_request(&query, "TokenQuery")?;
    let account = user_service::confirm_account(&state, &query.token).await?;
    Ok(Json(StoredAccount::from(&account)).into_response())
}

/// Reopen account
///
/// Consume a reopen token and make a closed account usable again.
#[utoipa::path(
    get,
    path = "/auth/reopen-account",
    tag = "Authentication",
    params(TokenQuery),
    responses(
        (status = 200, description = "Account reopened", body = StoredAccount),
        (status = 403, description = "Invalid token or account not closed", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError),
    )
)]
pub async fn reopen_account_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
) -> Result<Response, AppError> {
    validate_request(&query, "TokenQuery")?;
    let account = user_service::reopen_account(&state, &query.token).await?;
    Ok(Json(StoredAccount::from(&account)).into_response())
}

/// Forgot password
///
/// Send a password reset link to a verified account.
#[utoipa::path(
    post,
    path = "/auth/forgot-password",
    tag = "Authentication",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 202, description = "Reset link sent", body = MessageResponse),
        (status = 403, description = "Account status does not allow a reset", body = ApiError),
        (status = 404, description = "Account not found", body = ApiError),
        (status = 422, description = "Unprocessable request", body = ApiError),
        (status = 429, description = "A link was sent recently", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError),
    )
)]
pub async fn forgot_password_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Response, AppError> {
    validate_request(&request, "ForgotPasswordRequest")?;
    user_service::request_password_reset(&state, &request.email).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "Password reset link sent".to_string(),
        }),
    )
        .into_response())
}

/// Check reset token
///
/// Tell whether a password reset token is still usable, and for which account.
#[utoipa::path(
    get,
    path = "/auth/reset-password",
    tag = "Authentication",
    params(TokenQuery),
    responses(
        (status = 200, description = "Token usable", body = StoredAccount),
        (status = 403, description = "Invalid token", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError),
    )
)]
pub async fn check_reset_token_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
) -> Result<Response, AppError> {
    validate_request(&query, "TokenQuery")?;
    let account = user_service::check_reset_token(&state, &query.token).await?;
    Ok(Json(StoredAccount::from(&account)).into_response())
}

/// Reset password
///
/// Set a new password with a password reset token.
#[utoipa::path(
    post,
    path = "/auth/reset-password",
    tag = "Authentication",
    params(TokenQuery),
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 403, description = "Invalid token", body = ApiError),
        (status = 422, description = "Unprocessable request", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError),
    )
)]
pub async fn reset_password_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Response, AppError> {
    validate_request(&query, "TokenQuery")?;
    validate_request(&request, "ResetPasswordRequest")?;
    user_service::reset_password(&state, &query.token, &request.password).await?;
    Ok(Json(MessageResponse {
        message: "Password changed".to_string(),
    })
    .into_response())
}
