use std::future::Future;

use time::{Date, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Outcome of the daily quota check for one prospective write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaCheck {
    /// Persist `count` as the new counter, then run the write.
    Proceed { count: i32 },
    Reject,
}

/// Pure quota decision. A last-call date other than today means a calendar
/// rollover: the counter restarts at 1 and this call is the first of the day.
pub fn check_quota(last_call: Option<Date>, count: i32, today: Date, quota: i32) -> QuotaCheck {
    match last_call {
        Some(d) if d == today => {
            if count >= quota {
                QuotaCheck::Reject
            } else {
                QuotaCheck::Proceed { count: count + 1 }
            }
        }
        _ => QuotaCheck::Proceed { count: 1 },
    }
}

/// Wraps a mutating store operation in the per-user daily write quota.
///
/// The admin account bypasses the check unconditionally. For everyone else
/// the counter is persisted *before* the wrapped operation runs, so a failed
/// write still consumes quota rather than under-counting. The profile
/// read-then-write is not transactional: two concurrent sessions can both
/// read the same counter and each pass the check. Accepted behavior, see
/// DESIGN.md.
pub async fn guard<T, F, Fut>(state: &AppState, user_id: Uuid, op: F) -> Result<T, AppError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    if user_id == state.config.admin_user_id {
        return op().await;
    }

    let profile = state
        .store
        .profile_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Auth("unknown user".into()))?;

    let today = OffsetDateTime::now_utc().date();
    match check_quota(
        profile.last_api_call_date,
        profile.api_call_count,
        today,
        state.config.daily_write_quota,
    ) {
        QuotaCheck::Reject => {
            warn!(%user_id, count = profile.api_call_count, "daily write quota exceeded");
            Err(AppError::QuotaExceeded)
        }
        QuotaCheck::Proceed { count } => {
            state.store.set_rate_counter(user_id, today, count).await?;
            debug!(%user_id, count, "write accepted");
            op().await
        }
    }
}
