use crate::db::entity::user::{Account, AccountStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Public view of an account. Never carries the password digest or tokens.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredAccount {
    pub id: Uuid,
    #[schema(example = "me@example.com")]
    pub email: String,
    pub status: AccountStatus,
    #[schema(example = json!(["ROLE_USER"]))]
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_logged_at: Option<DateTime<Utc>>,
}

impl From<&Account> for StoredAccount {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            status: account.status,
            roles: account.effective_roles(),
            created_at: account.created_at,
            last_logged_at: account.last_logged_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "UP")]
    pub status: String,
}
