use crate::db::entity::token::{Token, TokenPurpose};
use crate::db::entity::user::Account;
use crate::db::repo::AccountRepository;
use crate::error::error_model::PersistenceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Store {
    // Accounts are kept without their tokens; `tokens` is the single source.
    accounts: HashMap<Uuid, Account>,
    tokens: HashMap<String, Token>,
}

impl Store {
    fn with_tokens(&self, account: &Account) -> Account {
        let mut account = account.clone();
        let mut tokens: Vec<Token> = self
            .tokens
            .values()
            .filter(|t| t.owner_id == Some(account.id))
            .cloned()
            .collect();
        tokens.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        account.tokens = tokens;
        account
    }
}

/// Process local storage with the same semantics as the PostgreSQL one.
/// Backs the test suite and `--in-memory` runs.
#[derive(Debug, Default)]
pub struct InMemoryAccountRepository {
    store: RwLock<Store>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_account_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Account>, PersistenceError> {
        let store = self.store.read().await;
        Ok(store
            .accounts
            .values()
            .find(|a| a.email == email)
            .map(|a| store.with_tokens(a)))
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, PersistenceError> {
        let store = self.store.read().await;
        Ok(store.accounts.get(&id).map(|a| store.with_tokens(a)))
    }

    async fn find_token_by_hash(&self, hash: &str) -> Result<Option<Token>, PersistenceError> {
        Ok(self.store.read().await.tokens.get(hash).cloned())
    }

    async fn save(&self, account: &mut Account) -> Result<(), PersistenceError> {
        let mut store = self.store.write().await;

        // Validate everything before touching the store, so a failed save
        // leaves it unchanged.
        let stored_version = store.accounts.get(&account.id).map(|a| a.version);
        let fresh = account.version == 0 && stored_version.is_none();
        if !fresh && stored_version != Some(account.version) {
            return Err(PersistenceError::StaleAccount { id: account.id });
        }
        if store
            .accounts
            .values()
            .any(|a| a.email == account.email && a.id != account.id)
        {
            return Err(PersistenceError::DuplicateEmail {
                email: account.email.clone(),
            });
        }
        let attached: Vec<&Token> = account
            .tokens
            .iter()
            .filter(|t| account.changes.is_attached(&t.hash))
            .collect();
        for token in &attached {
            if let Some(existing) = store.tokens.get(&token.hash) {
                if existing.owner_id != Some(account.id) {
                    return Err(PersistenceError::DuplicateToken {
                        hash: token.hash.clone(),
                    });
                }
            }
        }

        for hash in &account.changes.detached {
            if store.tokens.get(hash).is_some_and(|t| t.owner_id == Some(account.id)) {
                store.tokens.remove(hash);
            }
        }
        for token in attached {
            store.tokens.entry(token.hash.clone()).or_insert_with(|| {
                let mut stored = token.clone();
                stored.owner_id = Some(account.id);
                stored
            });
        }

        let version = account.version + 1;
        let mut stored = account.clone();
        stored.tokens.clear();
        stored.mark_saved(version);
        store.accounts.insert(account.id, stored);
        account.mark_saved(version);
        Ok(())
    }

    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64, PersistenceError> {
        let mut store = self.store.write().await;
        let before = store.tokens.len();
        store.tokens.retain(|_, t| t.expires_at > now);
        Ok((before - store.tokens.len()) as u64)
    }

    async fn delete_tokens_by_owner_and_purpose(
        &self,
        owner_id: Uuid,
        purpose: TokenPurpose,
    ) -> Result<u64, PersistenceError> {
        let mut store = self.store.write().await;
        let before = store.tokens.len();
        store
            .tokens
            .retain(|_, t| !(t.owner_id == Some(owner_id) && t.purpose == purpose));
        Ok((before - store.tokens.len()) as u64)
    }

    async fn list_accounts(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Account>, PersistenceError> {
        let store = self.store.read().await;
        let mut accounts: Vec<&Account> = store.accounts.values().collect();
        accounts.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(accounts
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|a| store.with_tokens(a))
            .collect())
    }

    async fn delete_account(&self, id: Uuid) -> Result<bool, PersistenceError> {
        let mut store = self.store.write().await;
        let removed = store.accounts.remove(&id).is_some();
        if removed {
            store.tokens.retain(|_, t| t.owner_id != Some(id));
        }
        Ok(removed)
    }
}
