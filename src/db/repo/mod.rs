pub mod memory_repository;
pub mod users_repository;

use crate::db::entity::token::{Token, TokenPurpose};
use crate::db::entity::user::Account;
use crate::error::error_model::PersistenceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Storage of accounts and the tokens they own.
///
/// Accounts come back with their tokens loaded. Each call is expected to be
/// atomic against the store; callers needing more wrap it in a transaction.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_account_by_email(&self, email: &str)
        -> Result<Option<Account>, PersistenceError>;

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, PersistenceError>;

    async fn find_token_by_hash(&self, hash: &str) -> Result<Option<Token>, PersistenceError>;

    /// Inserts or updates the account, then applies the token changes made
    /// since it was loaded: tokens attached through `Account::add_token` are
    /// inserted, tokens detached through `Account::remove_tokens` are deleted.
    /// Other stored tokens are left alone. On success the version is bumped
    /// and the pending changes cleared.
    ///
    /// # Errors
    ///
    /// * `StaleAccount` when the stored row moved past `account.version`.
    /// * `DuplicateToken` when a token hash is already owned by another account.
    /// * `DuplicateEmail` when another account holds the same email.
    async fn save(&self, account: &mut Account) -> Result<(), PersistenceError>;

    /// Deletes every token whose expiry is at or before `now`.
    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64, PersistenceError>;

    async fn delete_tokens_by_owner_and_purpose(
        &self,
        owner_id: Uuid,
        purpose: TokenPurpose,
    ) -> Result<u64, PersistenceError>;

    /// Accounts ordered by email.
    async fn list_accounts(&self, limit: i64, offset: i64)
        -> Result<Vec<Account>, PersistenceError>;

    async fn delete_account(&self, id: Uuid) -> Result<bool, PersistenceError>;
}
