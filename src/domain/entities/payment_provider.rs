use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// PIX payment providers that deliver settlement webhooks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, AsRefStr, Display,
    EnumString,
)]
#[sqlx(type_name = "payment_provider", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PaymentProvider {
    /// REST-style provider: `{ event, payment }` webhooks.
    Asaas,
    /// Order/charge-style provider: orders with nested charges.
    #[strum(to_string = "pagbank", serialize = "pagseguro")]
    #[serde(rename = "pagbank")]
    #[sqlx(rename = "pagbank")]
    PagBank,
}

impl PaymentProvider {
    /// Header the provider uses to authenticate its webhook deliveries.
    pub fn webhook_auth_header(&self) -> &'static str {
        match self {
            PaymentProvider::Asaas => "asaas-access-token",
            PaymentProvider::PagBank => "x-authenticity-token",
        }
    }

    pub fn all() -> &'static [PaymentProvider] {
        &[PaymentProvider::Asaas, PaymentProvider::PagBank]
    }
}
