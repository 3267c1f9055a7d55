use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use super::{endpoint, read_json, transport_error};
use crate::{
    app_error::AppResult,
    domain::entities::{payment_provider::PaymentProvider, payment_status::is_paid_provider_status},
    ports::payment_status_client::{PaymentStatusClient, RemotePaymentStatus},
    webhook_payload::parse_provider_timestamp,
};

/// Status an order reports before any charge exists (PIX QR code not paid yet).
const ORDER_WITHOUT_CHARGES_STATUS: &str = "WAITING";

/// `GET {base}/orders/{id}`, or `/charges/{id}` for `CHAR_` ids, with a
/// bearer token.
#[derive(Clone)]
pub struct PagBankStatusClient {
    client: Client,
    base_url: Url,
    api_token: SecretString,
}

impl PagBankStatusClient {
    pub fn new(client: Client, base_url: Url, api_token: SecretString) -> Self {
        Self {
            client,
            base_url,
            api_token,
        }
    }

    async fn fetch<T: for<'de> Deserialize<'de>>(&self, segments: &[&str]) -> AppResult<Option<T>> {
        let url = endpoint(&self.base_url, segments)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(self.api_token.expose_secret())
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| transport_error(PaymentProvider::PagBank, e))?;

        read_json(PaymentProvider::PagBank, response).await
    }
}

#[derive(Debug, Deserialize)]
struct PagBankOrderResponse {
    status: Option<String>,
    #[serde(default)]
    charges: Vec<PagBankChargeResponse>,
}

#[derive(Debug, Deserialize)]
struct PagBankChargeResponse {
    id: Option<String>,
    status: Option<String>,
    paid_at: Option<String>,
}

impl PagBankChargeResponse {
    fn into_status(self) -> Option<RemotePaymentStatus> {
        let status = self.status?;
        Some(RemotePaymentStatus {
            status,
            paid_at: self.paid_at.as_deref().and_then(parse_provider_timestamp),
            // the charge id is what gets stored as the secondary reference
            reference_id: self.id,
        })
    }
}

impl From<PagBankOrderResponse> for RemotePaymentStatus {
    fn from(order: PagBankOrderResponse) -> Self {
        let paid_index = order.charges.iter().position(|c| {
            c.status
                .as_deref()
                .is_some_and(is_paid_provider_status)
        });
        let order_status = order.status;

        let charge = match paid_index {
            Some(i) => order.charges.into_iter().nth(i),
            None => order.charges.into_iter().next(),
        };

        charge
            .and_then(PagBankChargeResponse::into_status)
            .unwrap_or_else(|| RemotePaymentStatus {
                status: order_status.unwrap_or_else(|| ORDER_WITHOUT_CHARGES_STATUS.to_string()),
                paid_at: None,
                reference_id: None,
            })
    }
}

#[async_trait]
impl PaymentStatusClient for PagBankStatusClient {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::PagBank
    }

    async fn get_status(&self, provider_id: &str) -> AppResult<Option<RemotePaymentStatus>> {
        if provider_id.starts_with("CHAR_") {
            let charge: Option<PagBankChargeResponse> =
                self.fetch(&["charges", provider_id]).await?;
            return Ok(charge.and_then(PagBankChargeResponse::into_status));
        }

        let order: Option<PagBankOrderResponse> = self.fetch(&["orders", provider_id]).await?;
        Ok(order.map(RemotePaymentStatus::from))
    }
}
