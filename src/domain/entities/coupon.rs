use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CouponProfile {
    pub id: Uuid,
    pub code: String,
    pub used_count: i32,
    pub max_uses: Option<i32>,
    pub is_active: bool,
}

impl CouponProfile {
    /// State after one more usage: the counter moves up by one and the coupon
    /// deactivates once the counter reaches `max_uses`.
    ///
    /// The SQL adapter applies the same rule in a single UPDATE.
    pub fn with_usage_registered(&self) -> CouponProfile {
        let used_count = self.used_count.saturating_add(1);
        let reached_cap = self.max_uses.is_some_and(|max| used_count >= max);
        CouponProfile {
            used_count,
            is_active: self.is_active && !reached_cap,
            ..self.clone()
        }
    }
}
