use crate::db::entity::token::{Token, TokenPurpose};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Role reported for an account that holds no explicit role.
pub const DEFAULT_ROLE: &str = "ROLE_USER";

#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub status: AccountStatus,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_logged_at: Option<DateTime<Utc>>,
    pub locked_until: Option<DateTime<Utc>>,
    pub failed_login_streak: i32,
    /// Tokens attached to this account. Storage keeps them by hash, the
    /// owner is referenced through `Token::owner_id`.
    pub tokens: Vec<Token>,
    /// Row version, 0 until the account is first saved. Saving a copy older
    /// than the stored row fails.
    pub version: i64,
    pub(crate) changes: TokenChanges,
}

/// Token hashes attached or detached since the account was loaded. Saving
/// applies exactly these and clears them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TokenChanges {
    pub(crate) attached: Vec<String>,
    pub(crate) detached: Vec<String>,
}

impl TokenChanges {
    pub(crate) fn is_attached(&self, hash: &str) -> bool {
        self.attached.iter().any(|h| h == hash)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    // PENDING - registered, email not confirmed yet. Every new account starts here.
    Pending,
    // VERIFIED - confirmed (or reopened) and allowed to log in.
    Verified,
    // CLOSED - closed by its owner, can be reopened with a REOPEN_ACCOUNT token.
    Closed,
    // BANNED - terminal for token flows, only an administrator changes it.
    Banned,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Pending => "PENDING",
            AccountStatus::Verified => "VERIFIED",
            AccountStatus::Closed => "CLOSED",
            AccountStatus::Banned => "BANNED",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(AccountStatus::Pending),
            "VERIFIED" => Ok(AccountStatus::Verified),
            "CLOSED" => Ok(AccountStatus::Closed),
            "BANNED" => Ok(AccountStatus::Banned),
            _ => Err(value.to_string()),
        }
    }
}

impl Account {
    /// Builds a fresh, unsaved account. New accounts are always `PENDING`.
    pub fn new(email: impl Into<String>, password_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            password_hash,
            status: AccountStatus::Pending,
            roles: Vec::new(),
            created_at: now,
            updated_at: now,
            last_logged_at: None,
            locked_until: None,
            failed_login_streak: 0,
            tokens: Vec::new(),
            version: 0,
            changes: TokenChanges::default(),
        }
    }

    /// Roles granted to the account, never empty.
    pub fn effective_roles(&self) -> Vec<String> {
        if self.roles.is_empty() {
            return vec![DEFAULT_ROLE.to_string()];
        }
        let mut roles: Vec<String> = Vec::with_capacity(self.roles.len());
        for role in &self.roles {
            if !roles.contains(role) {
                roles.push(role.clone());
            }
        }
        roles
    }

    pub fn set_roles<I, S>(&mut self, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.roles.clear();
        for role in roles {
            self.add_role(role.as_ref());
        }
    }

    pub fn add_role(&mut self, role: &str) {
        let role = role.to_uppercase();
        if !self.roles.contains(&role) {
            self.roles.push(role);
        }
    }

    /// Attaches a token, making this account its owner.
    pub fn add_token(&mut self, mut token: Token) {
        token.owner_id = Some(self.id);
        self.changes.detached.retain(|h| *h != token.hash);
        self.changes.attached.push(token.hash.clone());
        self.tokens.push(token);
    }

    /// Detaches every token of `purpose` and hands them back without an owner.
    pub fn remove_tokens(&mut self, purpose: TokenPurpose) -> Vec<Token> {
        let (removed, kept): (Vec<Token>, Vec<Token>) = std::mem::take(&mut self.tokens)
            .into_iter()
            .partition(|t| t.purpose == purpose);
        self.tokens = kept;
        removed
            .into_iter()
            .map(|mut t| {
                // Never stored: dropping the pending insert is enough.
                if self.changes.is_attached(&t.hash) {
                    self.changes.attached.retain(|h| *h != t.hash);
                } else {
                    self.changes.detached.push(t.hash.clone());
                }
                t.owner_id = None;
                t
            })
            .collect()
    }

    /// Records a successful save: the stored row is now at `version` and the
    /// pending token changes are written.
    pub(crate) fn mark_saved(&mut self, version: i64) {
        self.version = version;
        self.changes = TokenChanges::default();
    }

    pub fn tokens_of(&self, purpose: TokenPurpose) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(move |t| t.purpose == purpose)
    }
}
