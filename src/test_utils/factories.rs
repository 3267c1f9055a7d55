//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::{
    application::use_cases::plan_activation::UserPlanState,
    domain::entities::{
        coupon::CouponProfile, payment::PaymentProfile, payment_method::PaymentMethod,
        payment_provider::PaymentProvider, payment_status::PaymentStatus, plan::PlanProfile,
    },
};

/// A pending PIX payment with a unique provider order id and no reference id.
pub fn create_test_payment(overrides: impl FnOnce(&mut PaymentProfile)) -> PaymentProfile {
    let id = Uuid::new_v4();
    let mut payment = PaymentProfile {
        id,
        user_id: Uuid::new_v4(),
        plan_id: Uuid::new_v4(),
        coupon_id: None,
        method: PaymentMethod::Pix,
        provider: Some(PaymentProvider::PagBank),
        provider_order_id: Some(format!("ORDE_{}", id.simple())),
        provider_reference_id: None,
        status: PaymentStatus::Pending,
        amount_cents: 2_990,
        paid_at: None,
        created_at: test_datetime(),
        plan: None,
    };
    overrides(&mut payment);
    payment
}

/// Create a 30-day test plan.
pub fn create_test_plan(overrides: impl FnOnce(&mut PlanProfile)) -> PlanProfile {
    let mut plan = PlanProfile {
        id: Uuid::new_v4(),
        name: "Monthly".to_string(),
        price_cents: 2_990,
        duration_days: Some(30),
    };
    overrides(&mut plan);
    plan
}

/// Create an active coupon without a usage cap.
pub fn create_test_coupon(overrides: impl FnOnce(&mut CouponProfile)) -> CouponProfile {
    let mut coupon = CouponProfile {
        id: Uuid::new_v4(),
        code: "WELCOME10".to_string(),
        used_count: 0,
        max_uses: None,
        is_active: true,
    };
    overrides(&mut coupon);
    coupon
}

/// Create a user without any plan.
pub fn create_test_user(overrides: impl FnOnce(&mut UserPlanState)) -> UserPlanState {
    let id = Uuid::new_v4();
    let mut user = UserPlanState {
        id,
        email: Some(format!("user-{}@example.com", id.simple())),
        plan_id: None,
        plan_expires_at: None,
    };
    overrides(&mut user);
    user
}

/// Fixed timestamp for deterministic tests.
pub fn test_datetime() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}
