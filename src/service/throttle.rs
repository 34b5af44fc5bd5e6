use crate::db::entity::user::Account;
use chrono::{DateTime, Duration, Utc};

// Consecutive failures -> lockout seconds. Past the last entry the last value applies.
const PENALTY_TABLE: [(i32, u64); 9] = [
    (1, 0),
    (2, 0),
    (3, 60),
    (4, 120),
    (5, 300),
    (6, 900),
    (7, 1_800),
    (8, 3_600),
    (9, 86_400),
];

/// Lockout duration in seconds for a failure streak of `streak`.
pub fn penalty_for(streak: i32) -> u64 {
    if streak <= 0 {
        return 0;
    }
    PENALTY_TABLE
        .iter()
        .find(|(count, _)| *count == streak)
        .or(PENALTY_TABLE.last())
        .map(|(_, seconds)| *seconds)
        .unwrap_or(0)
}

pub fn record_failure(account: &mut Account, penalty_seconds: u64, now: DateTime<Utc>) {
    account.failed_login_streak = account.failed_login_streak.saturating_add(1);
    if penalty_seconds > 0 {
        account.locked_until = Some(now + Duration::seconds(penalty_seconds as i64));
    }
}

pub fn record_success(account: &mut Account) {
    account.failed_login_streak = 0;
    account.locked_until = None;
}
