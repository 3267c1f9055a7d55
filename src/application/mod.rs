pub mod app_error;
pub mod ports;
pub mod use_cases;
pub mod webhook_auth;
pub mod webhook_payload;
