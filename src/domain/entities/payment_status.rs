use serde::{Deserialize, Serialize};

/// Local lifecycle status of a payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Canceled,
    Expired,
    Refunded,
}

/// Provider status strings that mean the money has been received.
///
/// Compared after [`normalize_provider_status`], so entries are lowercase.
pub const PAID_PROVIDER_STATUSES: &[&str] = &[
    "paid",
    "received",
    "confirmed",
    "received_in_cash",
    "approved",
    "completed",
];

/// Lowercases and trims a provider status so both providers' spellings
/// (`PAID`, `Received`, ` confirmed `) compare equal.
pub fn normalize_provider_status(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Check whether a raw provider status string is in the paid set.
pub fn is_paid_provider_status(raw: &str) -> bool {
    let normalized = normalize_provider_status(raw);
    PAID_PROVIDER_STATUSES.contains(&normalized.as_str())
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Canceled => "canceled",
            PaymentStatus::Expired => "expired",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentStatus::Paid)
    }

    /// Only pending payments may be settled.
    pub fn is_settleable(&self) -> bool {
        matches!(self, PaymentStatus::Pending)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            "canceled" | "cancelled" => Ok(PaymentStatus::Canceled),
            "expired" => Ok(PaymentStatus::Expired),
            "refunded" => Ok(PaymentStatus::Refunded),
            _ => Err(format!("Invalid payment status: {}", s)),
        }
    }
}
