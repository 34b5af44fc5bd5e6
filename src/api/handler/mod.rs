pub mod auth_handler;
pub mod health_handler;

use crate::api::model::auth::{
    ForgotPasswordRequest, LoginRequest, MessageResponse, RegisterRequest, RegisterResponse,
    ResetPasswordRequest,
};
use crate::api::model::user::{HealthResponse, StoredAccount};
use crate::config::app_config::AppState;
use crate::db::entity::user::AccountStatus;
use crate::error::error_model::{ApiError, AppError, ErrorType, ValidationError};
use axum::http::Method;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};
use validator::Validate;

#[derive(OpenApi)]
#[openapi(
    info(title = "User accounts", description = "Registration, login and account lifecycle"),
    paths(
        auth_handler::login_handler,
        auth_handler::register_handler,
        auth_handler::confirm_account_handler,
        auth_handler::reopen_account_handler,
        auth_handler::forgot_password_handler,
        auth_handler::check_reset_token_handler,
        auth_handler::reset_password_handler,
        health_handler::health_handler,
    ),
    components(schemas(
        LoginRequest,
        RegisterRequest,
        RegisterResponse,
        ForgotPasswordRequest,
        ResetPasswordRequest,
        MessageResponse,
        StoredAccount,
        AccountStatus,
        HealthResponse,
        ApiError,
        ValidationError,
    )),
    tags(
        (name = "Authentication", description = "Login and account lifecycle"),
        (name = "Health", description = "Service health"),
    )
)]
pub struct ApiDoc;

/// Complete HTTP application: account routes, health probe and API docs at `/scalar`.
pub fn app_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any);

    Router::new()
        .nest("/auth", auth_handler::auth_routes())
        .merge(health_handler::health_routes())
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Runs `validator` rules on a request, turning failures into a 422.
pub(crate) fn validate_request<T: Validate>(request: &T, object: &str) -> Result<(), AppError> {
    request.validate().map_err(|e| {
        AppError::new(
            ErrorType::RequestValidationError {
                validation_error: e,
                object: object.to_string(),
            },
            "Validation error. Check the request body.",
        )
    })
}
