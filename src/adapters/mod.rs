pub mod email;
pub mod http;
pub mod payment_status;
pub mod persistence;
