//! Remote payment status clients, one per provider.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::payment_provider::PaymentProvider,
};

pub mod asaas;
pub mod pagbank;

pub use asaas::AsaasStatusClient;
pub use pagbank::PagBankStatusClient;

/// `base` with `segments` appended, each percent-encoded.
fn endpoint(base: &Url, segments: &[&str]) -> AppResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| AppError::Internal(format!("Invalid provider base URL: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Decodes a provider response. 404 is `Ok(None)`; other failures are errors.
async fn read_json<T: DeserializeOwned>(
    provider: PaymentProvider,
    response: Response,
) -> AppResult<Option<T>> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }

    let body = response.text().await.map_err(|e| {
        AppError::Provider(format!("{provider}: failed to read response: {e}"))
    })?;

    if !status.is_success() {
        tracing::error!(provider = %provider, status = %status, body = %body, "Provider API error");
        return Err(AppError::Provider(format!(
            "{provider} API error: {status}"
        )));
    }

    serde_json::from_str(&body).map(Some).map_err(|e| {
        tracing::error!(provider = %provider, body = %body, error = %e, "Failed to parse provider response");
        AppError::Provider(format!("{provider}: failed to parse response: {e}"))
    })
}

fn transport_error(provider: PaymentProvider, e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::Provider(format!("{provider}: status query timed out"))
    } else {
        AppError::Provider(format!("{provider}: {e}"))
    }
}
