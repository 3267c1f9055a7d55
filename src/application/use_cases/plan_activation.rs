use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Days, Duration, Local, Utc};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};

/// Plan fields of the user aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserPlanState {
    pub id: Uuid,
    pub email: Option<String>,
    pub plan_id: Option<Uuid>,
    /// `None` with a `plan_id` set is a lifetime plan.
    pub plan_expires_at: Option<DateTime<Utc>>,
}

/// Derives the new expiration from the user's current plan state.
pub type NextExpiration<'a> =
    dyn Fn(&UserPlanState) -> AppResult<Option<DateTime<Utc>>> + Send + Sync + 'a;

#[async_trait]
pub trait UserPlanRepo: Send + Sync {
    async fn get_plan_state(&self, user_id: Uuid) -> AppResult<Option<UserPlanState>>;

    /// Reads the user's plan state with the row locked, writes `plan_id` and
    /// the expiration `next` derives from it, and returns that expiration.
    /// Concurrent grants for one user are applied one after the other.
    /// `AppError::NotFound` when the user does not exist.
    async fn grant_plan(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        next: &NextExpiration<'_>,
    ) -> AppResult<Option<DateTime<Utc>>>;
}

#[derive(Clone)]
pub struct PlanActivator {
    users: Arc<dyn UserPlanRepo>,
}

impl PlanActivator {
    pub fn new(users: Arc<dyn UserPlanRepo>) -> Self {
        Self { users }
    }

    /// Grants `plan_id` to the user and returns the new expiration.
    /// `None` means a lifetime grant.
    #[instrument(skip(self))]
    pub async fn activate(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        duration_days: i64,
    ) -> AppResult<Option<DateTime<Utc>>> {
        let now = Utc::now();
        let expires_at = self
            .users
            .grant_plan(user_id, plan_id, &|user: &UserPlanState| {
                compute_expiration(user, plan_id, duration_days, now)
            })
            .await
            .map_err(|e| match e {
                AppError::NotFound => AppError::Internal(format!("user {user_id} not found")),
                other => other,
            })?;

        tracing::info!(
            user_id = %user_id,
            plan_id = %plan_id,
            expires_at = ?expires_at,
            "Plan activated"
        );
        Ok(expires_at)
    }
}

/// Rejects grant lengths whose expiration cannot be represented.
pub fn check_duration(duration_days: i64, now: DateTime<Utc>) -> AppResult<()> {
    if duration_days > 0 && add_calendar_days(now, duration_days).is_none() {
        return Err(AppError::Internal(format!(
            "Plan duration of {duration_days} days is out of range"
        )));
    }
    Ok(())
}

/// New expiration for a grant of `duration_days` of `plan_id` at `now`.
///
/// Only a same-plan grant while the current one is still running stacks on
/// the existing expiration. Plan switches and lapsed plans start from `now`.
pub fn compute_expiration(
    user: &UserPlanState,
    plan_id: Uuid,
    duration_days: i64,
    now: DateTime<Utc>,
) -> AppResult<Option<DateTime<Utc>>> {
    if duration_days <= 0 {
        return Ok(None);
    }

    let base = match (user.plan_id, user.plan_expires_at) {
        (Some(current), Some(expires_at)) if current == plan_id && expires_at > now => expires_at,
        _ => now,
    };

    add_calendar_days(base, duration_days)
        .map(Some)
        .ok_or_else(|| {
            AppError::Internal(format!(
                "Expiration {base} + {duration_days} days is out of range"
            ))
        })
}

/// Adds whole calendar days in the server's time zone so the wall-clock time
/// survives DST changes. Falls back to 24h multiples when the local time does
/// not exist on the target day. `None` past chrono's date range.
pub fn add_calendar_days(base: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    let calendar = u64::try_from(days)
        .ok()
        .and_then(|d| base.with_timezone(&Local).checked_add_days(Days::new(d)))
        .map(|local| local.with_timezone(&Utc));

    calendar.or_else(|| base.checked_add_signed(Duration::try_days(days)?))
}
