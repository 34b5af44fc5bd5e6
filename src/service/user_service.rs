use crate::config::app_config::AppState;
use crate::db::entity::token::{Token, TokenPurpose};
use crate::db::entity::user::{Account, AccountStatus};
use crate::error::error_model::AccountError;
use crate::service::{account_state, token_service};
use crate::util::crypto_helper::generate_password;
use tracing::{error, info};
use uuid::Uuid;

/// Length of passwords generated for accounts created without one.
pub const GENERATED_PASSWORD_LENGTH: usize = 8;

/// What a registration request turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// New `PENDING` account with a confirmation token.
    Created,
    /// The account was still `PENDING`: a new confirmation token was issued.
    ConfirmationResent,
    /// The account was `CLOSED`: a reopen token was issued.
    ReopenRequested,
}

impl RegistrationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationOutcome::Created => "CREATED",
            RegistrationOutcome::ConfirmationResent => "CONFIRMATION_RESENT",
            RegistrationOutcome::ReopenRequested => "REOPEN_REQUESTED",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub outcome: RegistrationOutcome,
    pub account: Account,
    pub token: Token,
}

/// An account created or updated by an administrator.
#[derive(Debug, Clone)]
pub struct AdminChange {
    pub account: Account,
    /// Set when a password was generated.
    pub generated_password: Option<String>,
    /// Confirmation token, when a confirmation email was requested.
    pub token: Option<Token>,
}

/// Changes an administrator applies to an existing account.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub password: Option<String>,
    /// Generate a password when none is given.
    pub generate_password: bool,
    /// Send a fresh confirmation link to a `PENDING` account.
    pub send_email: bool,
    /// Replaces the roles before `add_roles` are appended.
    pub set_roles: Vec<String>,
    pub add_roles: Vec<String>,
}

async fn persist(state: &AppState, account: &mut Account) -> Result<(), AccountError> {
    account.updated_at = state.clock.now();
    state.repository.save(account).await?;
    Ok(())
}

/// Builds a `PENDING` account with a hashed password. Not persisted.
pub fn create_account<S: AsRef<str>>(
    state: &AppState,
    email: &str,
    password: &str,
    roles: &[S],
) -> Result<Account, AccountError> {
    let password_hash = state.encoder.hash(password)?;
    let mut account = Account::new(email, password_hash, state.clock.now());
    account.set_roles(roles);
    Ok(account)
}

/// Self-service registration.
///
/// A new email gets a `PENDING` account and a confirmation token. A pending
/// account gets a new confirmation token and a closed one a reopen token,
/// unless one was issued inside the recent-token window. In both cases the
/// submitted password replaces the stored one.
#[tracing::instrument(
    skip(state, password),
    fields(
        service.name = "user_service",
        service.operation = "register",
        user.email = %email
    )
)]
pub async fn register(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<Registration, AccountError> {
    let existing = state.repository.find_account_by_email(email).await?;

    let (outcome, mut account, purpose, ttl) = match existing {
        None => (
            RegistrationOutcome::Created,
            create_account::<&str>(state, email, password, &[])?,
            TokenPurpose::AccountConfirmation,
            state.config.token_confirmation_ttl,
        ),
        Some(mut account) => {
            let (outcome, purpose, ttl) = match account.status {
                AccountStatus::Pending => (
                    RegistrationOutcome::ConfirmationResent,
                    TokenPurpose::AccountConfirmation,
                    state.config.token_confirmation_ttl,
                ),
                AccountStatus::Closed => (
                    RegistrationOutcome::ReopenRequested,
                    TokenPurpose::ReopenAccount,
                    state.config.token_reopen_ttl,
                ),
                status => {
                    return Err(AccountError::AccountStatus {
                        reason: account_state::reason_for(status),
                    });
                }
            };
            if token_service::has_recent_token(state, &account, Some(purpose)) {
                return Err(AccountError::DuplicateTokenRequest { purpose });
            }
            account.password_hash = state.encoder.hash(password)?;
            (outcome, account, purpose, ttl)
        }
    };

    let token = token_service::issue(state, purpose, ttl);
    account.add_token(token.clone());
    persist(state, &mut account).await?;

    let sent = match purpose {
        TokenPurpose::ReopenAccount => {
            state
                .notifier
                .send_reopen_account_email(&account, &token.hash)
                .await
        }
        _ => {
            state
                .notifier
                .send_confirmation_email(&account, &token.hash, None)
                .await
        }
    };
    if let Err(e) = sent {
        error!("Error sending registration email: {}", e);
    }

    info!("Registration handled: {:?}", outcome);
    Ok(Registration {
        outcome,
        account,
        token,
    })
}

/// Consumes an `ACCOUNT_CONFIRMATION` token: PENDING -> VERIFIED.
#[tracing::instrument(
    skip(state, hash),
    fields(service.name = "user_service", service.operation = "confirm_account")
)]
pub async fn confirm_account(state: &AppState, hash: &str) -> Result<Account, AccountError> {
    let mut account = token_owner(state, hash, TokenPurpose::AccountConfirmation).await?;
    account_state::confirm(&mut account)?;
    token_service::consume_by_purpose(state, &mut account, TokenPurpose::AccountConfirmation)
        .await?;
    persist(state, &mut account).await?;
    info!("Account {} confirmed", account.id);
    Ok(account)
}

/// Consumes a `REOPEN_ACCOUNT` token: CLOSED -> VERIFIED.
#[tracing::instrument(
    skip(state, hash),
    fields(service.name = "user_service", service.operation = "reopen_account")
)]
pub async fn reopen_account(state: &AppState, hash: &str) -> Result<Account, AccountError> {
    let mut account = token_owner(state, hash, TokenPurpose::ReopenAccount).await?;
    account_state::reopen(&mut account)?;
    token_service::consume_by_purpose(state, &mut account, TokenPurpose::ReopenAccount).await?;
    persist(state, &mut account).await?;
    info!("Account {} reopened", account.id);
    Ok(account)
}

/// Issues a `RENEW_PASSWORD` token for a verified account and mails it.
#[tracing::instrument(
    skip(state),
    fields(
        service.name = "user_service",
        service.operation = "request_password_reset",
        user.email = %email
    )
)]
pub async fn request_password_reset(state: &AppState, email: &str) -> Result<Token, AccountError> {
    let mut account = state
        .repository
        .find_account_by_email(email)
        .await?
        .ok_or(AccountError::AccountNotFound)?;
    account_state::check_eligibility(&account, &[AccountStatus::Verified])?;

    let purpose = TokenPurpose::RenewPassword;
    if token_service::has_recent_token(state, &account, Some(purpose)) {
        return Err(AccountError::DuplicateTokenRequest { purpose });
    }

    let token = token_service::issue(state, purpose, state.config.token_security_ttl);
    account.add_token(token.clone());
    persist(state, &mut account).await?;

    if let Err(e) = state
        .notifier
        .send_resetting_email(&account, &token.hash)
        .await
    {
        error!("Error sending password reset email: {}", e);
    }
    Ok(token)
}

/// Owner of a valid `RENEW_PASSWORD` token, for showing the reset form.
pub async fn check_reset_token(state: &AppState, hash: &str) -> Result<Account, AccountError> {
    let account = token_owner(state, hash, TokenPurpose::RenewPassword).await?;
    account_state::check_eligibility(&account, &[AccountStatus::Verified])?;
    Ok(account)
}

/// Sets a new password through a `RENEW_PASSWORD` token and consumes it.
#[tracing::instrument(
    skip(state, hash, new_password),
    fields(service.name = "user_service", service.operation = "reset_password")
)]
pub async fn reset_password(
    state: &AppState,
    hash: &str,
    new_password: &str,
) -> Result<Account, AccountError> {
    let mut account = check_reset_token(state, hash).await?;
    account.password_hash = state.encoder.hash(new_password)?;
    token_service::consume_by_purpose(state, &mut account, TokenPurpose::RenewPassword).await?;
    persist(state, &mut account).await?;

    if let Err(e) = state
        .notifier
        .send_password_changed_email(&account, None)
        .await
    {
        error!("Error sending password changed email: {}", e);
    }
    info!("Password reset for account {}", account.id);
    Ok(account)
}

/// VERIFIED -> CLOSED. The account can come back through registration.
#[tracing::instrument(
    skip(state),
    fields(service.name = "user_service", service.operation = "close_account")
)]
pub async fn close_account(state: &AppState, id: Uuid) -> Result<Account, AccountError> {
    let mut account = find_account(state, id).await?;
    account_state::close(&mut account)?;
    persist(state, &mut account).await?;
    info!("Account {} closed", account.id);
    Ok(account)
}

/// Creates an account on behalf of an administrator.
///
/// Without a password one is generated and sent along with a confirmation
/// link. With a password the account is confirmed at once, unless
/// `send_email` asks for the confirmation flow anyway.
#[tracing::instrument(
    skip(state, password),
    fields(
        service.name = "user_service",
        service.operation = "admin_create_account",
        user.email = %email
    )
)]
pub async fn admin_create_account(
    state: &AppState,
    email: &str,
    password: Option<&str>,
    roles: &[String],
    send_email: bool,
) -> Result<AdminChange, AccountError> {
    let generated_password = match password {
        Some(_) => None,
        None => Some(generate_password(GENERATED_PASSWORD_LENGTH)),
    };
    let plaintext = password
        .or(generated_password.as_deref())
        .unwrap_or_default();
    let mut account = create_account(state, email, plaintext, roles)?;

    let token = if generated_password.is_some() || send_email {
        let token = token_service::issue(
            state,
            TokenPurpose::AccountConfirmation,
            state.config.token_confirmation_ttl,
        );
        account.add_token(token.clone());
        Some(token)
    } else {
        account.status = AccountStatus::Verified;
        None
    };
    persist(state, &mut account).await?;

    if let Some(token) = &token {
        if let Err(e) = state
            .notifier
            .send_confirmation_email(&account, &token.hash, generated_password.as_deref())
            .await
        {
            error!("Error sending confirmation email: {}", e);
        }
    }

    info!("Account {} created by administrator", account.id);
    Ok(AdminChange {
        account,
        generated_password,
        token,
    })
}

/// Administrative update.
///
/// A new password, given or generated, is mailed to the owner. A `PENDING`
/// account gets a fresh confirmation link instead when its password changed
/// or `send_email` is set.
#[tracing::instrument(
    skip(state, update),
    fields(
        service.name = "user_service",
        service.operation = "update_account",
        user.email = %email
    )
)]
pub async fn update_account(
    state: &AppState,
    email: &str,
    update: &AccountUpdate,
) -> Result<AdminChange, AccountError> {
    let mut account = state
        .repository
        .find_account_by_email(email)
        .await?
        .ok_or(AccountError::AccountNotFound)?;

    let generated_password = (update.password.is_none() && update.generate_password)
        .then(|| generate_password(GENERATED_PASSWORD_LENGTH));
    let new_password = update.password.as_deref().or(generated_password.as_deref());
    if let Some(password) = new_password {
        account.password_hash = state.encoder.hash(password)?;
    }
    if !update.set_roles.is_empty() {
        account.set_roles(&update.set_roles);
    }
    for role in &update.add_roles {
        account.add_role(role);
    }

    let token = if account.status == AccountStatus::Pending
        && (new_password.is_some() || update.send_email)
    {
        let token = token_service::issue(
            state,
            TokenPurpose::AccountConfirmation,
            state.config.token_confirmation_ttl,
        );
        account.add_token(token.clone());
        Some(token)
    } else {
        None
    };
    persist(state, &mut account).await?;

    let sent = match (&token, new_password) {
        (Some(token), _) => {
            state
                .notifier
                .send_confirmation_email(&account, &token.hash, new_password)
                .await
        }
        (None, Some(password)) => {
            state
                .notifier
                .send_password_changed_email(&account, Some(password))
                .await
        }
        (None, None) => Ok(()),
    };
    if let Err(e) = sent {
        error!("Error sending account update email: {}", e);
    }

    info!("Account {} updated by administrator", account.id);
    Ok(AdminChange {
        account,
        generated_password,
        token,
    })
}

/// One page of accounts in email order. Pages start at 1.
pub async fn list_accounts(state: &AppState, page: i64) -> Result<Vec<Account>, AccountError> {
    let limit = state.config.users_per_page;
    let offset = (page.max(1) - 1).saturating_mul(limit);
    Ok(state.repository.list_accounts(limit, offset).await?)
}

pub async fn find_account(state: &AppState, id: Uuid) -> Result<Account, AccountError> {
    state
        .repository
        .find_account_by_id(id)
        .await?
        .ok_or(AccountError::AccountNotFound)
}

#[tracing::instrument(
    skip(state),
    fields(service.name = "user_service", service.operation = "delete_account")
)]
pub async fn delete_account(state: &AppState, id: Uuid) -> Result<(), AccountError> {
    if !state.repository.delete_account(id).await? {
        return Err(AccountError::AccountNotFound);
    }
    info!("Account {} deleted", id);
    Ok(())
}

pub async fn sweep_expired_tokens(state: &AppState) -> Result<u64, AccountError> {
    token_service::sweep_expired(state).await
}

/// Account owning a valid token of `purpose`. A dangling owner counts as an
/// invalid token.
async fn token_owner(
    state: &AppState,
    hash: &str,
    purpose: TokenPurpose,
) -> Result<Account, AccountError> {
    let token = token_service::find_valid(state, hash, purpose).await?;
    let Some(owner_id) = token.owner_id else {
        return Err(AccountError::TokenInvalid);
    };
    state
        .repository
        .find_account_by_id(owner_id)
        .await?
        .ok_or(AccountError::TokenInvalid)
}
