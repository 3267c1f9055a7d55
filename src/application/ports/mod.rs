pub mod health_probe;
pub mod payment_status_client;
