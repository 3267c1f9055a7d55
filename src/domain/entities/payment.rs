use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{
    payment_method::PaymentMethod, payment_provider::PaymentProvider,
    payment_status::PaymentStatus, plan::PlanProfile,
};

#[derive(Debug, Clone, Serialize)]
pub struct PaymentProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub coupon_id: Option<Uuid>,
    pub method: PaymentMethod,
    pub provider: Option<PaymentProvider>,
    /// Id assigned by the provider when the charge was created.
    pub provider_order_id: Option<String>,
    /// Secondary id (charge id or merchant reference). May be learned only
    /// when the payment settles.
    pub provider_reference_id: Option<String>,
    pub status: PaymentStatus,
    pub amount_cents: i64,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Plan row joined at load time. `None` when the plan no longer exists.
    pub plan: Option<PlanProfile>,
}

impl PaymentProfile {
    pub fn is_paid(&self) -> bool {
        self.status.is_paid()
    }
}

/// Candidate identifiers pulled from a webhook. Any subset may be present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentIdentifiers {
    /// Matched against `provider_order_id`.
    pub order_id: Option<String>,
    /// Matched against `provider_reference_id`.
    pub charge_id: Option<String>,
    /// Matched against `provider_reference_id`.
    pub reference_id: Option<String>,
}

impl PaymentIdentifiers {
    /// Builds the set, dropping blank values.
    pub fn new(
        order_id: Option<&str>,
        charge_id: Option<&str>,
        reference_id: Option<&str>,
    ) -> Self {
        Self {
            order_id: non_blank(order_id),
            charge_id: non_blank(charge_id),
            reference_id: non_blank(reference_id),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.order_id.is_none() && self.charge_id.is_none() && self.reference_id.is_none()
    }

    /// Values to match against `provider_reference_id`.
    pub fn reference_candidates(&self) -> Vec<&str> {
        let mut candidates: Vec<&str> = Vec::with_capacity(2);
        for value in [&self.charge_id, &self.reference_id].into_iter().flatten() {
            if !candidates.contains(&value.as_str()) {
                candidates.push(value.as_str());
            }
        }
        candidates
    }

    /// Id to query the provider's status API with: order first, then charge.
    pub fn remote_lookup_id(&self) -> Option<&str> {
        self.order_id.as_deref().or(self.charge_id.as_deref())
    }

    /// True if `payment` carries any of these identifiers.
    pub fn matches(&self, payment: &PaymentProfile) -> bool {
        let order_hit = match (&self.order_id, &payment.provider_order_id) {
            (Some(wanted), Some(stored)) => wanted == stored,
            _ => false,
        };
        let reference_hit = payment
            .provider_reference_id
            .as_deref()
            .is_some_and(|stored| self.reference_candidates().contains(&stored));
        order_hit || reference_hit
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
