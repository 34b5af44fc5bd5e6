use crate::db::entity::token::{Token, TokenPurpose};
use crate::db::entity::user::{Account, AccountStatus, TokenChanges};
use crate::db::repo::AccountRepository;
use crate::error::error_model::PersistenceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, status, roles, created_at, updated_at, \
     last_logged_at, locked_until, failed_login_streak, version";

#[derive(Debug, FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    password_hash: String,
    status: String,
    roles: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_logged_at: Option<DateTime<Utc>>,
    locked_until: Option<DateTime<Utc>>,
    failed_login_streak: i32,
    version: i64,
}

#[derive(Debug, FromRow)]
struct TokenRow {
    hash: String,
    purpose: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    account_id: Uuid,
}

impl TryFrom<TokenRow> for Token {
    type Error = PersistenceError;

    fn try_from(row: TokenRow) -> Result<Self, Self::Error> {
        let purpose = row
            .purpose
            .parse::<TokenPurpose>()
            .map_err(|value| PersistenceError::InvalidColumn {
                column: "account_tokens.purpose",
                value,
            })?;
        Ok(Token {
            hash: row.hash,
            purpose,
            expires_at: row.expires_at,
            created_at: row.created_at,
            owner_id: Some(row.account_id),
        })
    }
}

impl AccountRow {
    fn into_account(self, tokens: Vec<Token>) -> Result<Account, PersistenceError> {
        let status = self
            .status
            .parse::<AccountStatus>()
            .map_err(|value| PersistenceError::InvalidColumn {
                column: "accounts.status",
                value,
            })?;
        Ok(Account {
            id: self.id,
            email: self.email,
            password_hash: self.password_hash,
            status,
            roles: self.roles,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_logged_at: self.last_logged_at,
            locked_until: self.locked_until,
            failed_login_streak: self.failed_login_streak,
            tokens,
            version: self.version,
            changes: TokenChanges::default(),
        })
    }
}

/// PostgreSQL backed account storage. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies pending schema migrations.
    pub async fn migrate(&self) -> Result<(), PersistenceError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(sqlx::Error::from)?;
        Ok(())
    }

    async fn load_tokens(
        &self,
        account_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Token>>, PersistenceError> {
        let rows = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT hash, purpose, expires_at, created_at, account_id
            FROM account_tokens WHERE account_id = ANY($1)
            ORDER BY created_at
            "#,
        )
        .bind(account_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut tokens: HashMap<Uuid, Vec<Token>> = HashMap::new();
        for row in rows {
            let account_id = row.account_id;
            tokens
                .entry(account_id)
                .or_default()
                .push(Token::try_from(row)?);
        }
        Ok(tokens)
    }

    async fn hydrate(&self, row: Option<AccountRow>) -> Result<Option<Account>, PersistenceError> {
        let Some(row) = row else {
            return Ok(None);
        };
        let mut tokens = self.load_tokens(&[row.id]).await?;
        let owned = tokens.remove(&row.id).unwrap_or_default();
        row.into_account(owned).map(Some)
    }

    /// Inserts a new account or updates a loaded one whose version still
    /// matches the stored row. Returns the version now stored.
    async fn write_account(
        tx: &mut Transaction<'_, Postgres>,
        account: &Account,
    ) -> Result<i64, PersistenceError> {
        let result = if account.version == 0 {
            sqlx::query(
                r#"
                INSERT INTO accounts (id, email, password_hash, status, roles, created_at,
                                      updated_at, last_logged_at, locked_until,
                                      failed_login_streak, version)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 1)
                "#,
            )
            .bind(account.id)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(account.status.as_str())
            .bind(&account.roles)
            .bind(account.created_at)
            .bind(account.updated_at)
            .bind(account.last_logged_at)
            .bind(account.locked_until)
            .bind(account.failed_login_streak)
            .execute(&mut **tx)
            .await
        } else {
            sqlx::query(
                r#"
                UPDATE accounts SET
                    email = $2,
                    password_hash = $3,
                    status = $4,
                    roles = $5,
                    updated_at = $6,
                    last_logged_at = $7,
                    locked_until = $8,
                    failed_login_streak = $9,
                    version = version + 1
                WHERE id = $1 AND version = $10
                "#,
            )
            .bind(account.id)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(account.status.as_str())
            .bind(&account.roles)
            .bind(account.updated_at)
            .bind(account.last_logged_at)
            .bind(account.locked_until)
            .bind(account.failed_login_streak)
            .bind(account.version)
            .execute(&mut **tx)
            .await
        };

        match result {
            Ok(done) if done.rows_affected() == 1 => Ok(account.version + 1),
            Ok(_) => Err(PersistenceError::StaleAccount { id: account.id }),
            Err(sqlx::Error::Database(db_error)) if db_error.is_unique_violation() => {
                if db_error.constraint() == Some("accounts_pkey") {
                    return Err(PersistenceError::StaleAccount { id: account.id });
                }
                Err(PersistenceError::DuplicateEmail {
                    email: account.email.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn apply_token_changes(
        tx: &mut Transaction<'_, Postgres>,
        account: &Account,
    ) -> Result<(), PersistenceError> {
        if !account.changes.detached.is_empty() {
            sqlx::query("DELETE FROM account_tokens WHERE account_id = $1 AND hash = ANY($2)")
                .bind(account.id)
                .bind(&account.changes.detached)
                .execute(&mut **tx)
                .await?;
        }

        let attached = account
            .tokens
            .iter()
            .filter(|t| account.changes.is_attached(&t.hash));
        for token in attached {
            let inserted = sqlx::query(
                r#"
                INSERT INTO account_tokens (hash, purpose, expires_at, created_at, account_id)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (hash) DO NOTHING
                "#,
            )
            .bind(&token.hash)
            .bind(token.purpose.as_str())
            .bind(token.expires_at)
            .bind(token.created_at)
            .bind(account.id)
            .execute(&mut **tx)
            .await?
            .rows_affected();

            if inserted == 0 {
                let owner: Option<(Uuid,)> =
                    sqlx::query_as("SELECT account_id FROM account_tokens WHERE hash = $1")
                        .bind(&token.hash)
                        .fetch_optional(&mut **tx)
                        .await?;
                if let Some((owner_id,)) = owner {
                    if owner_id != account.id {
                        return Err(PersistenceError::DuplicateToken {
                            hash: token.hash.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    #[tracing::instrument(
        skip(self),
        fields(db.system = "postgresql", db.operation = "SELECT", db.table = "accounts")
    )]
    async fn find_account_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Account>, PersistenceError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE email = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        self.hydrate(row).await
    }

    #[tracing::instrument(
        skip(self),
        fields(db.system = "postgresql", db.operation = "SELECT", db.table = "accounts")
    )]
    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, PersistenceError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        self.hydrate(row).await
    }

    #[tracing::instrument(
        skip(self, hash),
        fields(db.system = "postgresql", db.operation = "SELECT", db.table = "account_tokens")
    )]
    async fn find_token_by_hash(&self, hash: &str) -> Result<Option<Token>, PersistenceError> {
        let row = sqlx::query_as::<_, TokenRow>(
            "SELECT hash, purpose, expires_at, created_at, account_id FROM account_tokens WHERE hash = $1",
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Token::try_from).transpose()
    }

    #[tracing::instrument(
        skip(self, account),
        fields(
            db.system = "postgresql",
            db.operation = "UPSERT",
            db.table = "accounts",
            account.id = %account.id
        )
    )]
    async fn save(&self, account: &mut Account) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await?;
        let version = Self::write_account(&mut tx, account).await?;
        Self::apply_token_changes(&mut tx, account).await?;
        tx.commit().await?;
        account.mark_saved(version);
        Ok(())
    }

    #[tracing::instrument(
        skip(self),
        fields(db.system = "postgresql", db.operation = "DELETE", db.table = "account_tokens")
    )]
    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64, PersistenceError> {
        let result = sqlx::query("DELETE FROM account_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    #[tracing::instrument(
        skip(self),
        fields(db.system = "postgresql", db.operation = "DELETE", db.table = "account_tokens")
    )]
    async fn delete_tokens_by_owner_and_purpose(
        &self,
        owner_id: Uuid,
        purpose: TokenPurpose,
    ) -> Result<u64, PersistenceError> {
        let result =
            sqlx::query("DELETE FROM account_tokens WHERE account_id = $1 AND purpose = $2")
                .bind(owner_id)
                .bind(purpose.as_str())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    #[tracing::instrument(
        skip(self),
        fields(db.system = "postgresql", db.operation = "SELECT", db.table = "accounts")
    )]
    async fn list_accounts(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Account>, PersistenceError> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts ORDER BY email LIMIT $1 OFFSET $2",
            ACCOUNT_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut tokens = self.load_tokens(&ids).await?;
        rows.into_iter()
            .map(|row| {
                let owned = tokens.remove(&row.id).unwrap_or_default();
                row.into_account(owned)
            })
            .collect()
    }

    #[tracing::instrument(
        skip(self),
        fields(db.system = "postgresql", db.operation = "DELETE", db.table = "accounts")
    )]
    async fn delete_account(&self, id: Uuid) -> Result<bool, PersistenceError> {
        // Tokens go with the account through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
