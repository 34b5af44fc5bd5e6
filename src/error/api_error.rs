use crate::error::error_model::{
    AccountError, ApiError, AppError, ErrorType, PersistenceError, ValidationError,
};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tracing::{error, info};

impl From<AccountError> for AppError {
    fn from(e: AccountError) -> Self {
        let code = e.message_key();
        match e {
            AccountError::AccountNotFound => {
                AppError::new(ErrorType::NotFound, e.to_string()).with_code(code)
            }
            AccountError::AccountStatus { .. } | AccountError::TokenInvalid => {
                AppError::new(ErrorType::Forbidden, e.to_string()).with_code(code)
            }
            AccountError::AccountLocked { until } => {
                let mut app_error =
                    AppError::new(ErrorType::Locked, e.to_string()).with_code(code);
                app_error.locked_until = Some(until);
                app_error
            }
            AccountError::InvalidCredentials { penalty_seconds } => {
                let mut app_error = AppError::new(
                    ErrorType::UnauthorizedError,
                    "Invalid credentials. Check email and password.",
                )
                .with_code(code);
                app_error.penalty_seconds = penalty_seconds;
                app_error
            }
            AccountError::DuplicateTokenRequest { .. } => {
                AppError::new(ErrorType::TooManyRequests, e.to_string()).with_code(code)
            }
            AccountError::Persistence(PersistenceError::StaleAccount { .. }) => {
                AppError::new(ErrorType::Conflict, e.to_string()).with_code(code)
            }
            AccountError::Persistence(_) | AccountError::PasswordHash { .. } => {
                error!("Fatal account error: {}", e);
                AppError::new(
                    ErrorType::InternalServerError,
                    "Something went wrong. Please try again later.",
                )
                .with_code(code)
            }
        }
    }
}

// New type of error handling.
impl IntoResponse for AppError {
    // implementation for the trait.
    fn into_response(self) -> Response {
        let status = match &self.error_type {
            ErrorType::NotFound => StatusCode::NOT_FOUND,
            ErrorType::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorType::UnauthorizedError => StatusCode::UNAUTHORIZED,
            ErrorType::Forbidden => StatusCode::FORBIDDEN,
            ErrorType::Locked => StatusCode::LOCKED,
            ErrorType::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ErrorType::Conflict => StatusCode::CONFLICT,
            ErrorType::RequestValidationError { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        };

        let mut sub_errors = Vec::new();
        if let ErrorType::RequestValidationError {
            validation_error,
            object,
        } = &self.error_type
        {
            for (field, field_errors) in validation_error.field_errors() {
                for field_error in field_errors {
                    info!("Validation error on field: {:?}", field_error);
                    sub_errors.push(ValidationError {
                        object: object.to_string(),
                        field: field.to_string(),
                        rejected_value: field_error
                            .params
                            .get("value")
                            .map(|v| v.to_string())
                            .unwrap_or_default(),
                        message: field_error
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_default(),
                        code: field_error.code.to_string(),
                    })
                }
            }
        }

        let api_error = ApiError {
            status: status.into(),
            time: Utc::now().to_rfc3339(),
            message: self.error_type.to_string(),
            debug_message: Some(self.error_message),
            code: self.code,
            penalty_seconds: self.penalty_seconds,
            locked_until: self.locked_until.map(|t| t.to_rfc3339()),
            sub_errors,
        };

        Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(
                serde_json::to_string(&api_error).unwrap_or_default(),
            ))
            .unwrap_or_else(|_| Response::new(axum::body::Body::empty()))
    }
}
