use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Single-use token tied to one account and one purpose. The hash is the
/// identifier, unique across the whole store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub hash: String,
    pub purpose: TokenPurpose,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub owner_id: Option<Uuid>,
}

impl Token {
    pub fn new(
        hash: String,
        purpose: TokenPurpose,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            hash,
            purpose,
            expires_at,
            created_at,
            owner_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenPurpose {
    AccountConfirmation,
    RenewPassword,
    ReopenAccount,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::AccountConfirmation => "ACCOUNT_CONFIRMATION",
            TokenPurpose::RenewPassword => "RENEW_PASSWORD",
            TokenPurpose::ReopenAccount => "REOPEN_ACCOUNT",
        }
    }
}

impl fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Stored upper-cased; lookups normalise before matching.
impl FromStr for TokenPurpose {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "ACCOUNT_CONFIRMATION" => Ok(TokenPurpose::AccountConfirmation),
            "RENEW_PASSWORD" => Ok(TokenPurpose::RenewPassword),
            "REOPEN_ACCOUNT" => Ok(TokenPurpose::ReopenAccount),
            _ => Err(value.to_string()),
        }
    }
}
