pub mod payment_notification;
pub mod payment_reconciliation;
pub mod payment_settlement;
pub mod plan_activation;
