use crate::db::entity::token::TokenPurpose;
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::Serialize;
use utoipa::ToSchema;
use validator::ValidationErrors;

/// Why an account status rejected an operation.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum StatusReason {
    #[display("account already verified")]
    AlreadyVerified,
    #[display("account pending confirmation")]
    Pending,
    #[display("account banned")]
    Banned,
    #[display("account closed")]
    Closed,
}

/// Failures of the storage layer. Fatal for the operation, except a stale
/// write which the caller may retry from a fresh load.
#[derive(Debug, Display, derive_more::Error)]
pub enum PersistenceError {
    #[display("Database error: {_0}")]
    Database(sqlx::Error),
    #[display("Duplicated token detected: {hash}")]
    DuplicateToken { hash: String },
    #[display("Email already taken: {email}")]
    DuplicateEmail { email: String },
    #[display("Invalid value '{value}' in column {column}")]
    InvalidColumn { column: &'static str, value: String },
    #[display("Account {id} was modified since it was loaded")]
    StaleAccount { id: uuid::Uuid },
}

impl From<sqlx::Error> for PersistenceError {
    fn from(e: sqlx::Error) -> Self {
        PersistenceError::Database(e)
    }
}

/// Outcome kinds of the account core. Everything but `Persistence` and
/// `PasswordHash` is an expected condition the caller reports to the user,
/// and so is a stale write reported through `Persistence`.
#[derive(Debug, Display, derive_more::Error)]
pub enum AccountError {
    #[display("Account not found")]
    AccountNotFound,
    #[display("Account status not eligible: {reason}")]
    AccountStatus { reason: StatusReason },
    #[display("Account locked until {until}")]
    AccountLocked { until: DateTime<Utc> },
    #[display("Invalid credentials")]
    InvalidCredentials { penalty_seconds: Option<u64> },
    // Wrong purpose, expired or unknown: deliberately one kind.
    #[display("Invalid token")]
    TokenInvalid,
    #[display("A {purpose} token was generated recently")]
    DuplicateTokenRequest { purpose: TokenPurpose },
    #[display("Persistence failure: {_0}")]
    Persistence(PersistenceError),
    #[display("Password hashing failure: {message}")]
    PasswordHash { message: String },
}

impl From<PersistenceError> for AccountError {
    fn from(e: PersistenceError) -> Self {
        AccountError::Persistence(e)
    }
}

impl AccountError {
    /// Translation key for the message shown to the end user.
    pub fn message_key(&self) -> &'static str {
        match self {
            AccountError::AccountNotFound => "error.account_not_found",
            AccountError::AccountStatus { reason } => match reason {
                StatusReason::AlreadyVerified => "error.account_status_verified",
                StatusReason::Pending => "error.account_status_pending",
                StatusReason::Banned => "error.account_status_banned",
                StatusReason::Closed => "error.account_status_closed",
            },
            AccountError::AccountLocked { .. } => "error.account_locked",
            AccountError::InvalidCredentials {
                penalty_seconds: Some(_),
            } => "error.bad_credential_account_locked",
            AccountError::InvalidCredentials { .. } => "error.bad_credential",
            AccountError::TokenInvalid => "error.token_invalid",
            AccountError::DuplicateTokenRequest { purpose } => match purpose {
                TokenPurpose::AccountConfirmation => "error.token_already_generated.register",
                TokenPurpose::ReopenAccount => "error.token_already_generated.reopen",
                TokenPurpose::RenewPassword => "error.token_already_generated.generic",
            },
            AccountError::Persistence(PersistenceError::StaleAccount { .. }) => {
                "error.concurrent_modification"
            }
            AccountError::Persistence(_) | AccountError::PasswordHash { .. } => {
                "error.internal"
            }
        }
    }

    pub fn is_fatal(&self) -> bool {
        match self {
            AccountError::Persistence(PersistenceError::StaleAccount { .. }) => false,
            AccountError::Persistence(_) | AccountError::PasswordHash { .. } => true,
            _ => false,
        }
    }
}

// HTTP facing error.
pub struct AppError {
    pub error_type: ErrorType,
    pub error_message: String,
    pub code: Option<String>,
    pub penalty_seconds: Option<u64>,
    pub locked_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Display, derive_more::Error, Clone)]
pub enum ErrorType {
    #[display("Not found")]
    NotFound,
    #[display("Internal server error")]
    InternalServerError,
    #[display("Authentication error")]
    UnauthorizedError,
    #[display("Forbidden")]
    Forbidden,
    #[display("Account locked")]
    Locked,
    #[display("Too many requests")]
    TooManyRequests,
    #[display("Conflict")]
    Conflict,
    #[display("Request validation error")]
    RequestValidationError {
        validation_error: ValidationErrors,
        object: String,
    },
}

impl AppError {
    // constructor.
    pub fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            error_message: message.into(),
            code: None,
            penalty_seconds: None,
            locked_until: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    #[schema(example = "403")]
    pub status: u16,
    #[schema(example = "2024-01-01T12:00:00.000Z")]
    pub time: String,
    #[schema(example = "Forbidden")]
    pub message: String,
    #[serde(rename = "debugMessage")]
    #[schema(example = "Account status not eligible: account pending confirmation")]
    pub debug_message: Option<String>,
    #[schema(example = "error.account_status_pending")]
    pub code: Option<String>,
    #[serde(rename = "penaltySeconds", skip_serializing_if = "Option::is_none")]
    #[schema(example = "60")]
    pub penalty_seconds: Option<u64>,
    #[serde(rename = "lockedUntil", skip_serializing_if = "Option::is_none")]
    pub locked_until: Option<String>,
    #[serde(rename = "subErrors")]
    pub sub_errors: Vec<ValidationError>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidationError {
    #[schema(example = "RegisterRequest")]
    pub object: String,
    #[schema(example = "email")]
    pub field: String,
    #[schema(example = "notAValidEmail")]
    pub rejected_value: String,
    #[schema(example = "Invalid email address")]
    pub message: String,
    #[schema(example = "email.invalid")]
    pub code: String,
}
