//! Classification of inbound payment webhooks.
//!
//! The two providers post very different bodies to the same endpoint, and
//! replayed or test deliveries often arrive without provider headers. The
//! classifier therefore decides on the body shape first and decodes each
//! provider through its own schema. Anything else is `Unknown` and must not
//! touch state.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;

use crate::domain::entities::{
    payment::PaymentIdentifiers,
    payment_provider::PaymentProvider,
    payment_status::normalize_provider_status,
};

// ============================================================================
// Asaas schema
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AsaasWebhook {
    /// e.g. `PAYMENT_RECEIVED`, `PAYMENT_CREATED`
    pub event: String,
    pub payment: AsaasPayment,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsaasPayment {
    pub id: Option<String>,
    pub status: Option<String>,
    pub external_reference: Option<String>,
    pub payment_date: Option<String>,
    pub client_payment_date: Option<String>,
    pub confirmed_date: Option<String>,
}

// ============================================================================
// PagBank schema
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PagBankWebhook {
    pub id: Option<String>,
    pub reference_id: Option<String>,
    pub status: Option<String>,
    /// Explicit provider tag some integrations add to relayed payloads.
    pub provider: Option<String>,
    pub order: Option<PagBankOrder>,
    pub charge: Option<PagBankCharge>,
    pub charges: Option<Vec<PagBankCharge>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PagBankOrder {
    pub id: Option<String>,
    pub reference_id: Option<String>,
    pub status: Option<String>,
    pub charges: Option<Vec<PagBankCharge>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PagBankCharge {
    pub id: Option<String>,
    pub reference_id: Option<String>,
    pub status: Option<String>,
    pub paid_at: Option<String>,
}

impl PagBankWebhook {
    /// The top-level object is the order itself unless the body wraps an
    /// `order` or `charge` object.
    fn top_level_is_order(&self) -> bool {
        self.order.is_none() && self.charge.is_none()
    }

    fn first_charge(&self) -> Option<&PagBankCharge> {
        self.charges.as_ref().and_then(|c| c.first())
    }

    fn first_order_charge(&self) -> Option<&PagBankCharge> {
        self.order
            .as_ref()
            .and_then(|o| o.charges.as_ref())
            .and_then(|c| c.first())
    }

    /// Charges in lookup order: the explicit `charge`, then `charges[0]`,
    /// then `order.charges[0]`.
    fn charges_in_order(&self) -> impl Iterator<Item = &PagBankCharge> {
        self.charge
            .iter()
            .chain(self.first_charge())
            .chain(self.first_order_charge())
    }

    fn order_id(&self) -> Option<&str> {
        self.order
            .as_ref()
            .and_then(|o| o.id.as_deref())
            .or_else(|| {
                self.top_level_is_order()
                    .then_some(self.id.as_deref())
                    .flatten()
            })
    }

    fn charge_id(&self) -> Option<&str> {
        self.charges_in_order().find_map(|c| c.id.as_deref())
    }

    fn reference_id(&self) -> Option<&str> {
        self.order
            .as_ref()
            .and_then(|o| o.reference_id.as_deref())
            .or(self.reference_id.as_deref())
            .or_else(|| self.charges_in_order().find_map(|c| c.reference_id.as_deref()))
    }
}

// ============================================================================
// Classification
// ============================================================================

/// An inbound webhook body, tagged by the provider that produced it.
#[derive(Debug, Clone)]
pub enum WebhookPayload {
    Asaas(AsaasWebhook),
    PagBank(PagBankWebhook),
    Unknown,
}

/// Decide which provider produced `body`.
///
/// PagBank wins when the body has an `order` or `charge` object, a `charges`
/// array, a `provider: "pagbank"` tag, or when its signature header was sent.
/// Asaas is recognized by top-level `event` and `payment` fields.
pub fn classify(body: &Value, pagbank_signature_present: bool) -> WebhookPayload {
    let Some(obj) = body.as_object() else {
        return WebhookPayload::Unknown;
    };

    let tagged_pagbank = obj
        .get("provider")
        .and_then(Value::as_str)
        .and_then(|tag| PaymentProvider::from_str(tag).ok())
        == Some(PaymentProvider::PagBank);

    let pagbank_shape = obj.get("order").is_some_and(Value::is_object)
        || obj.get("charge").is_some_and(Value::is_object)
        || obj.get("charges").is_some_and(Value::is_array);

    if pagbank_shape || tagged_pagbank || pagbank_signature_present {
        return match serde_json::from_value::<PagBankWebhook>(body.clone()) {
            Ok(webhook) => WebhookPayload::PagBank(webhook),
            Err(e) => {
                tracing::debug!(error = %e, "PagBank-shaped webhook failed to decode");
                WebhookPayload::Unknown
            }
        };
    }

    let asaas_shape = obj.get("event").is_some_and(Value::is_string)
        && obj.get("payment").is_some_and(Value::is_object);

    if asaas_shape {
        return match serde_json::from_value::<AsaasWebhook>(body.clone()) {
            Ok(webhook) => WebhookPayload::Asaas(webhook),
            Err(e) => {
                tracing::debug!(error = %e, "Asaas-shaped webhook failed to decode");
                WebhookPayload::Unknown
            }
        };
    }

    WebhookPayload::Unknown
}

impl WebhookPayload {
    pub fn provider(&self) -> Option<PaymentProvider> {
        match self {
            WebhookPayload::Asaas(_) => Some(PaymentProvider::Asaas),
            WebhookPayload::PagBank(_) => Some(PaymentProvider::PagBank),
            WebhookPayload::Unknown => None,
        }
    }

    /// Identifiers usable to find the local payment.
    pub fn identifiers(&self) -> PaymentIdentifiers {
        match self {
            WebhookPayload::Asaas(w) => PaymentIdentifiers::new(
                w.payment.id.as_deref(),
                None,
                w.payment.external_reference.as_deref(),
            ),
            WebhookPayload::PagBank(w) => {
                PaymentIdentifiers::new(w.order_id(), w.charge_id(), w.reference_id())
            }
            WebhookPayload::Unknown => PaymentIdentifiers::default(),
        }
    }

    /// Every status-like value the payload carries, normalized, in the order
    /// they should be reported.
    pub fn status_candidates(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            WebhookPayload::Asaas(w) => {
                // PAYMENT_RECEIVED / PAYMENT_CONFIRMED carry the status in the event name.
                let from_event = w.event.strip_prefix("PAYMENT_");
                w.payment.status.as_deref().into_iter().chain(from_event).collect()
            }
            WebhookPayload::PagBank(w) => w
                .status
                .as_deref()
                .into_iter()
                .chain(w.charge.as_ref().and_then(|c| c.status.as_deref()))
                .chain(w.order.as_ref().and_then(|o| o.status.as_deref()))
                .chain(w.first_charge().and_then(|c| c.status.as_deref()))
                .chain(w.first_order_charge().and_then(|c| c.status.as_deref()))
                .collect(),
            WebhookPayload::Unknown => Vec::new(),
        };

        raw.into_iter()
            .map(normalize_provider_status)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Settlement timestamp reported in the payload, if any.
    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        match self {
            WebhookPayload::Asaas(w) => [
                &w.payment.payment_date,
                &w.payment.client_payment_date,
                &w.payment.confirmed_date,
            ]
            .into_iter()
            .flatten()
            .find_map(|raw| parse_provider_timestamp(raw)),
            WebhookPayload::PagBank(w) => w
                .charges_in_order()
                .filter_map(|c| c.paid_at.as_deref())
                .find_map(parse_provider_timestamp),
            WebhookPayload::Unknown => None,
        }
    }

    /// Event name for logs.
    pub fn event_label(&self) -> &str {
        match self {
            WebhookPayload::Asaas(w) => &w.event,
            WebhookPayload::PagBank(_) => "pagbank.notification",
            WebhookPayload::Unknown => "unknown",
        }
    }
}

/// Parse the timestamp formats the providers use: RFC 3339, a naive
/// `YYYY-MM-DD HH:MM:SS` (taken as UTC) and a bare date (midnight UTC).
pub fn parse_provider_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
