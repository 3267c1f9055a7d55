use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// How the customer paid. Only PIX payments carry provider identifiers and
/// are settled through webhooks; the other methods have their own flows.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, AsRefStr, Display,
    EnumString,
)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PaymentMethod {
    Pix,
    Card,
    Key,
    Manual,
}

impl PaymentMethod {
    pub fn carries_provider_ids(&self) -> bool {
        matches!(self, PaymentMethod::Pix)
    }
}
