use crate::config::app_config::AppState;
use crate::db::entity::token::{Token, TokenPurpose};
use crate::db::entity::user::Account;
use crate::error::error_model::AccountError;
use crate::util::crypto_helper::{generate_token, TOKEN_LENGTH};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

/// Creates a token with a fresh hash that expires `ttl_seconds` from now.
///
/// The token is neither attached nor persisted: the caller adds it to an
/// account and saves that account.
pub fn issue(state: &AppState, purpose: TokenPurpose, ttl_seconds: i64) -> Token {
    let now = state.clock.now();
    Token::new(
        generate_token(TOKEN_LENGTH),
        purpose,
        now,
        expiry_after(now, ttl_seconds),
    )
}

/// `now + ttl_seconds`, saturating at the latest representable instant.
/// A negative ttl yields `now`.
pub fn expiry_after(now: DateTime<Utc>, ttl_seconds: i64) -> DateTime<Utc> {
    Duration::try_seconds(ttl_seconds.max(0))
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// A token is valid for `purpose` from its creation up to and including its
/// expiry instant.
pub fn is_valid_at(token: &Token, purpose: TokenPurpose, now: DateTime<Utc>) -> bool {
    token.purpose == purpose && token.created_at <= now && now <= token.expires_at
}

pub fn is_valid(state: &AppState, token: &Token, purpose: TokenPurpose) -> bool {
    is_valid_at(token, purpose, state.clock.now())
}

/// Whether the account holds a token (of `purpose`, or of any purpose when
/// `None`) created inside the recent-token window. Expiry is not considered.
pub fn has_recent_token(state: &AppState, account: &Account, purpose: Option<TokenPurpose>) -> bool {
    let threshold = state.clock.now() - Duration::seconds(state.config.recent_token_window);
    account
        .tokens
        .iter()
        .filter(|t| purpose.map_or(true, |p| t.purpose == p))
        .any(|t| t.created_at > threshold)
}

/// Removes every token of `purpose` from the account and from storage.
/// Running it again is a no-op.
#[tracing::instrument(
    skip(state, account),
    fields(
        service.name = "token_service",
        service.operation = "consume_by_purpose",
        account.id = %account.id
    )
)]
pub async fn consume_by_purpose(
    state: &AppState,
    account: &mut Account,
    purpose: TokenPurpose,
) -> Result<u64, AccountError> {
    account.remove_tokens(purpose);
    let deleted = state
        .repository
        .delete_tokens_by_owner_and_purpose(account.id, purpose)
        .await?;
    debug!("Consumed {} {} token(s)", deleted, purpose);
    Ok(deleted)
}

pub async fn find_by_hash(state: &AppState, hash: &str) -> Result<Option<Token>, AccountError> {
    Ok(state.repository.find_token_by_hash(hash).await?)
}

/// Looks the token up and checks it against `purpose`. Unknown, expired and
/// wrong-purpose tokens all come back as `TokenInvalid`.
pub async fn find_valid(
    state: &AppState,
    hash: &str,
    purpose: TokenPurpose,
) -> Result<Token, AccountError> {
    match find_by_hash(state, hash).await? {
        Some(token) if is_valid(state, &token, purpose) => Ok(token),
        _ => Err(AccountError::TokenInvalid),
    }
}

/// Deletes every token whose expiry is at or before now.
#[tracing::instrument(
    skip(state),
    fields(service.name = "token_service", service.operation = "sweep_expired")
)]
pub async fn sweep_expired(state: &AppState) -> Result<u64, AccountError> {
    let deleted = state
        .repository
        .delete_expired_tokens(state.clock.now())
        .await?;
    info!("Deleted {} expired token(s)", deleted);
    Ok(deleted)
}
