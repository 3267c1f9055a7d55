use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    app_error::AppResult,
    domain::entities::{payment_provider::PaymentProvider, payment_status::is_paid_provider_status},
};

/// Provider-agnostic view of a remote payment status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemotePaymentStatus {
    /// Raw provider status, e.g. `RECEIVED` or `PAID`.
    pub status: String,
    pub paid_at: Option<DateTime<Utc>>,
    /// Secondary identifier discovered remotely (e.g. the charge id of an order).
    pub reference_id: Option<String>,
}

impl RemotePaymentStatus {
    pub fn is_paid(&self) -> bool {
        is_paid_provider_status(&self.status)
    }
}

/// Queries a provider for the current status of one of its payments.
///
/// `Ok(None)` means the provider does not know the id. Callers treat that the
/// same as "not paid"; errors are transport or API failures.
#[async_trait]
pub trait PaymentStatusClient: Send + Sync {
    fn provider(&self) -> PaymentProvider;

    async fn get_status(&self, provider_id: &str) -> AppResult<Option<RemotePaymentStatus>>;
}
