use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::plan_activation::{NextExpiration, UserPlanRepo, UserPlanState},
};

fn row_to_plan_state(row: &sqlx::postgres::PgRow) -> UserPlanState {
    UserPlanState {
        id: row.get("id"),
        email: row.get("email"),
        plan_id: row.get("plan_id"),
        plan_expires_at: row.get("plan_expires_at"),
    }
}

#[async_trait]
impl UserPlanRepo for PostgresPersistence {
    async fn get_plan_state(&self, user_id: Uuid) -> AppResult<Option<UserPlanState>> {
        let row = sqlx::query("SELECT id, email, plan_id, plan_expires_at FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;

        Ok(row.as_ref().map(row_to_plan_state))
    }

    async fn grant_plan(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        next: &NextExpiration<'_>,
    ) -> AppResult<Option<DateTime<Utc>>> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        // Row lock: a second grant for this user waits and stacks on this one.
        let row = sqlx::query(
            "SELECT id, email, plan_id, plan_expires_at FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound)?;

        let expires_at = next(&row_to_plan_state(&row))?;

        sqlx::query(
            "UPDATE users SET plan_id = $2, plan_expires_at = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .bind(plan_id)
        .bind(expires_at)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

        tx.commit().await.map_err(AppError::from)?;
        Ok(expires_at)
    }
}
