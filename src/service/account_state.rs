use crate::db::entity::user::{Account, AccountStatus};
use crate::error::error_model::{AccountError, StatusReason};

/// Reason reported when `status` is not allowed for an operation.
pub fn reason_for(status: AccountStatus) -> StatusReason {
    match status {
        AccountStatus::Verified => StatusReason::AlreadyVerified,
        AccountStatus::Pending => StatusReason::Pending,
        AccountStatus::Banned => StatusReason::Banned,
        AccountStatus::Closed => StatusReason::Closed,
    }
}

/// Guard shared by login, password reset and every transition.
pub fn check_eligibility(account: &Account, allowed: &[AccountStatus]) -> Result<(), AccountError> {
    if allowed.contains(&account.status) {
        return Ok(());
    }
    Err(AccountError::AccountStatus {
        reason: reason_for(account.status),
    })
}

fn transition(
    account: &mut Account,
    from: AccountStatus,
    to: AccountStatus,
) -> Result<(), AccountError> {
    check_eligibility(account, &[from])?;
    account.status = to;
    Ok(())
}

/// PENDING -> VERIFIED, on a consumed confirmation token.
pub fn confirm(account: &mut Account) -> Result<(), AccountError> {
    transition(account, AccountStatus::Pending, AccountStatus::Verified)
}

/// CLOSED -> VERIFIED, on a consumed reopen token.
pub fn reopen(account: &mut Account) -> Result<(), AccountError> {
    transition(account, AccountStatus::Closed, AccountStatus::Verified)
}

/// VERIFIED -> CLOSED, requested by the owner.
pub fn close(account: &mut Account) -> Result<(), AccountError> {
    transition(account, AccountStatus::Verified, AccountStatus::Closed)
}
