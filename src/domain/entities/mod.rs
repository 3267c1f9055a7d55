pub mod coupon;
pub mod payment;
pub mod payment_method;
pub mod payment_provider;
pub mod payment_status;
pub mod plan;
