//! Webhook authentication per provider.
//!
//! Asaas echoes a shared token in `asaas-access-token`. PagBank signs the raw
//! body: `x-authenticity-token = hex(sha256("{token}-{body}"))`.

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::payment_provider::PaymentProvider,
};

#[derive(Clone, Default)]
pub struct WebhookSecrets {
    pub asaas_token: Option<SecretString>,
    pub pagbank_token: Option<SecretString>,
}

impl WebhookSecrets {
    fn token_for(&self, provider: PaymentProvider) -> Option<&SecretString> {
        match provider {
            PaymentProvider::Asaas => self.asaas_token.as_ref(),
            PaymentProvider::PagBank => self.pagbank_token.as_ref(),
        }
    }

    /// Checks the provider's auth header against the configured token.
    /// Providers without a token are accepted as-is.
    pub fn verify(
        &self,
        provider: PaymentProvider,
        header_value: Option<&str>,
        raw_body: &[u8],
    ) -> AppResult<()> {
        let Some(token) = self.token_for(provider) else {
            return Ok(());
        };

        let Some(provided) = header_value.map(str::trim).filter(|v| !v.is_empty()) else {
            tracing::warn!(provider = %provider, "Webhook missing auth header");
            return Err(AppError::Unauthorized);
        };

        let matches = match provider {
            PaymentProvider::Asaas => constant_time_compare(provided, token.expose_secret()),
            // hex digest, case-insensitive
            PaymentProvider::PagBank => constant_time_compare(
                &provided.to_ascii_lowercase(),
                &pagbank_signature(token.expose_secret(), raw_body),
            ),
        };

        if matches {
            Ok(())
        } else {
            tracing::warn!(provider = %provider, "Webhook auth header mismatch");
            Err(AppError::Unauthorized)
        }
    }
}

pub fn pagbank_signature(token: &str, raw_body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.update(b"-");
    hasher.update(raw_body);
    hex::encode(hasher.finalize())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
