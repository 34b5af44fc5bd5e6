use crate::api::model::user::StoredAccount;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    #[schema(example = "me@example.com")]
    pub email: String,
    #[validate(length(min = 1, max = 4096, message = "Password cannot be empty"))]
    #[schema(example = "SecretPassword123!")]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    #[schema(example = "me@example.com")]
    pub email: String,
    #[validate(length(
        min = 8,
        max = 4096,
        message = "Password must be between 8 and 4096 characters"
    ))]
    #[schema(example = "SecretPassword123!")]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    /// One of `CREATED`, `CONFIRMATION_RESENT`, `REOPEN_REQUESTED`.
    #[schema(example = "CREATED")]
    pub outcome: String,
    pub account: StoredAccount,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email address"))]
    #[schema(example = "me@example.com")]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(length(
        min = 8,
        max = 4096,
        message = "Password must be between 8 and 4096 characters"
    ))]
    #[schema(example = "NewSecretPassword123!")]
    pub password: String,
}

/// Token carried by the links sent in account emails.
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TokenQuery {
    /// token hash from the email link
    #[validate(length(min = 1, max = 32, message = "token must be 1 to 32 characters"))]
    #[param(example = "Eyixd6RrJ2E8LF98Xv29j5AyYBYvTrof")]
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Account confirmed")]
    pub message: String,
}
