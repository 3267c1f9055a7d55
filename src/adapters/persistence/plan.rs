use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::payment_settlement::PlanRepo,
    domain::entities::plan::PlanProfile,
};

fn row_to_plan(row: &sqlx::postgres::PgRow) -> PlanProfile {
    PlanProfile {
        id: row.get("id"),
        name: row.get("name"),
        price_cents: row.get("price_cents"),
        duration_days: row.get("duration_days"),
    }
}

#[async_trait]
impl PlanRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<PlanProfile>> {
        let row = sqlx::query("SELECT id, name, price_cents, duration_days FROM plans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_plan))
    }
}
