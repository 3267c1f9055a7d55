use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::payment_settlement::CouponRepo,
};

#[async_trait]
impl CouponRepo for PostgresPersistence {
    async fn register_usage(&self, coupon_id: Uuid) -> AppResult<()> {
        // Same rule as CouponProfile::with_usage_registered, in one statement.
        let result = sqlx::query(
            r#"
            UPDATE coupons
            SET used_count = used_count + 1,
                is_active = is_active AND (max_uses IS NULL OR used_count + 1 < max_uses)
            WHERE id = $1
            "#,
        )
        .bind(coupon_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
