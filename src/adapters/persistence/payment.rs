use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::payment_settlement::PaymentRepo,
    domain::entities::{
        payment::{PaymentIdentifiers, PaymentProfile},
        payment_method::PaymentMethod,
        plan::PlanProfile,
    },
};

fn row_to_profile(row: sqlx::postgres::PgRow) -> PaymentProfile {
    // LEFT JOIN: plan columns are NULL when the plan row is gone.
    let plan = row
        .get::<Option<Uuid>, _>("plan_row_id")
        .map(|id| PlanProfile {
            id,
            name: row.get("plan_name"),
            price_cents: row.get("plan_price_cents"),
            duration_days: row.get("plan_duration_days"),
        });

    PaymentProfile {
        id: row.get("id"),
        user_id: row.get("user_id"),
        plan_id: row.get("plan_id"),
        coupon_id: row.get("coupon_id"),
        method: row.get("method"),
        provider: row.get("provider"),
        provider_order_id: row.get("provider_order_id"),
        provider_reference_id: row.get("provider_reference_id"),
        status: row.get("status"),
        amount_cents: row.get("amount_cents"),
        paid_at: row.get("paid_at"),
        created_at: row.get("created_at"),
        plan,
    }
}

const SELECT_WITH_PLAN: &str = r#"
    SELECT p.id, p.user_id, p.plan_id, p.coupon_id, p.method, p.provider,
           p.provider_order_id, p.provider_reference_id, p.status, p.amount_cents,
           p.paid_at, p.created_at,
           pl.id AS plan_row_id, pl.name AS plan_name, pl.price_cents AS plan_price_cents,
           pl.duration_days AS plan_duration_days
    FROM payments p
    LEFT JOIN plans pl ON pl.id = p.plan_id
"#;

#[async_trait]
impl PaymentRepo for PostgresPersistence {
    async fn find_pix_by_identifiers(
        &self,
        ids: &PaymentIdentifiers,
    ) -> AppResult<Vec<PaymentProfile>> {
        let references: Vec<String> = ids
            .reference_candidates()
            .into_iter()
            .map(str::to_string)
            .collect();

        // LIMIT 2 is enough to detect ambiguity.
        let rows = sqlx::query(&format!(
            r#"{SELECT_WITH_PLAN}
            WHERE p.method = $1
              AND (
                ($2::text IS NOT NULL AND p.provider_order_id = $2)
                OR p.provider_reference_id = ANY($3)
              )
            LIMIT 2"#
        ))
        .bind(PaymentMethod::Pix)
        .bind(ids.order_id.as_deref())
        .bind(&references)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(rows.into_iter().map(row_to_profile).collect())
    }

    async fn mark_paid_if_pending(
        &self,
        id: Uuid,
        paid_at: DateTime<Utc>,
        reference_id: Option<&str>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = 'paid',
                paid_at = $2,
                provider_reference_id = COALESCE(provider_reference_id, $3),
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(paid_at)
        .bind(reference_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(result.rows_affected() == 1)
    }
}
