use crate::config::app_config::AppState;
use crate::db::entity::user::{Account, AccountStatus};
use crate::error::error_model::AccountError;
use crate::service::{account_state, throttle};
use tracing::{info, warn};

/// Authenticates an account with its email and password.
///
/// Status and lockout are checked before the password is compared, so an
/// ineligible or locked account never reaches the hasher and a blocked
/// attempt does not lengthen the failure streak.
///
/// # Errors
///
/// * `AccountNotFound` - no account holds this email.
/// * `AccountStatus` - the account is not `VERIFIED`.
/// * `AccountLocked` - a lockout from earlier failures is still running.
/// * `InvalidCredentials` - wrong password, with the lockout it triggered if any.
/// * `Persistence` - the updated counters could not be saved.
#[tracing::instrument(
    skip(state, password),
    fields(
        service.name = "auth_service",
        service.operation = "authenticate",
        user.email = %email
    )
)]
pub async fn authenticate(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<Account, AccountError> {
    let Some(mut account) = state.repository.find_account_by_email(email).await? else {
        // Still trigger a fake check to avoid returning immediately.
        state.encoder.dummy_verify(password);
        return Err(AccountError::AccountNotFound);
    };

    account_state::check_eligibility(&account, &[AccountStatus::Verified])?;

    let now = state.clock.now();
    if let Some(until) = account.locked_until {
        if now <= until {
            info!("Login attempt on locked account");
            return Err(AccountError::AccountLocked { until });
        }
    }

    if !state.encoder.verify(&account.password_hash, password) {
        let penalty = throttle::penalty_for(account.failed_login_streak.saturating_add(1));
        throttle::record_failure(&mut account, penalty, now);
        account.updated_at = now;
        state.repository.save(&mut account).await?;
        warn!(
            "Invalid credentials, failure streak {}",
            account.failed_login_streak
        );
        return Err(AccountError::InvalidCredentials {
            penalty_seconds: (penalty > 0).then_some(penalty),
        });
    }

    throttle::record_success(&mut account);
    account.last_logged_at = Some(now);
    account.updated_at = now;
    state.repository.save(&mut account).await?;
    info!("Account authenticated");
    Ok(account)
}
