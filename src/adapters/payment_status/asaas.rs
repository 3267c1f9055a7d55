use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use super::{endpoint, read_json, transport_error};
use crate::{
    app_error::AppResult,
    domain::entities::payment_provider::PaymentProvider,
    ports::payment_status_client::{PaymentStatusClient, RemotePaymentStatus},
    webhook_payload::parse_provider_timestamp,
};

/// `GET {base}/payments/{id}` authenticated with the `access_token` header.
#[derive(Clone)]
pub struct AsaasStatusClient {
    client: Client,
    base_url: Url,
    api_key: SecretString,
}

impl AsaasStatusClient {
    pub fn new(client: Client, base_url: Url, api_key: SecretString) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AsaasPaymentResponse {
    status: String,
    external_reference: Option<String>,
    payment_date: Option<String>,
    client_payment_date: Option<String>,
    confirmed_date: Option<String>,
}

impl From<AsaasPaymentResponse> for RemotePaymentStatus {
    fn from(resp: AsaasPaymentResponse) -> Self {
        let paid_at = [
            &resp.payment_date,
            &resp.client_payment_date,
            &resp.confirmed_date,
        ]
        .into_iter()
        .flatten()
        .find_map(|raw| parse_provider_timestamp(raw));

        RemotePaymentStatus {
            status: resp.status,
            paid_at,
            reference_id: resp.external_reference.filter(|r| !r.trim().is_empty()),
        }
    }
}

#[async_trait]
impl PaymentStatusClient for AsaasStatusClient {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Asaas
    }

    async fn get_status(&self, provider_id: &str) -> AppResult<Option<RemotePaymentStatus>> {
        let url = endpoint(&self.base_url, &["payments", provider_id])?;

        let response = self
            .client
            .get(url)
            .header("access_token", self.api_key.expose_secret())
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| transport_error(PaymentProvider::Asaas, e))?;

        let payment: Option<AsaasPaymentResponse> =
            read_json(PaymentProvider::Asaas, response).await?;
        Ok(payment.map(RemotePaymentStatus::from))
    }
}
