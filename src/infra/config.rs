use std::{net::SocketAddr, time::Duration};

use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use url::Url;

pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Budget for handling one webhook delivery end to end.
    pub request_timeout: Duration,
    /// Budget for one provider status query. Must stay well under `request_timeout`.
    pub remote_status_timeout: Duration,
    /// Grant length when a payment's plan cannot be found.
    pub default_plan_duration_days: i64,
    pub asaas: ProviderConfig,
    pub pagbank: ProviderConfig,
    /// `None` disables settlement emails.
    pub resend_api_key: Option<SecretString>,
    pub email_from: String,
    pub app_origin: Url,
    /// JSON log file, in addition to the console.
    pub log_file: Option<String>,
}

pub struct ProviderConfig {
    pub api_url: Url,
    /// `None` disables remote status reconciliation for this provider.
    pub api_token: Option<SecretString>,
    /// `None` accepts webhooks without authentication.
    pub webhook_token: Option<SecretString>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url: String = get_env("DATABASE_URL");
        let bind_addr: SocketAddr = get_env_default(
            "BIND_ADDR",
            SocketAddr::from(([127, 0, 0, 1], 3001)),
        );
        let request_timeout_secs: u64 = get_env_default("REQUEST_TIMEOUT_SECS", 15);
        let remote_status_timeout_secs: u64 = get_env_default("REMOTE_STATUS_TIMEOUT_SECS", 5);
        let default_plan_duration_days: i64 = get_env_default("DEFAULT_PLAN_DURATION_DAYS", 30);

        let asaas = ProviderConfig {
            api_url: get_env_default(
                "ASAAS_API_URL",
                Url::parse("https://api.asaas.com/v3").expect("default ASAAS_API_URL is valid"),
            ),
            api_token: optional_secret("ASAAS_API_KEY"),
            webhook_token: optional_secret("ASAAS_WEBHOOK_TOKEN"),
        };
        let pagbank = ProviderConfig {
            api_url: get_env_default(
                "PAGBANK_API_URL",
                Url::parse("https://api.pagseguro.com").expect("default PAGBANK_API_URL is valid"),
            ),
            api_token: optional_secret("PAGBANK_API_TOKEN"),
            webhook_token: optional_secret("PAGBANK_WEBHOOK_TOKEN"),
        };

        let resend_api_key = optional_secret("RESEND_API_KEY");
        let email_from: String = get_env_default("EMAIL_FROM", "no-reply@localhost".to_string());
        let app_origin: Url = get_env_default(
            "APP_ORIGIN",
            Url::parse("http://localhost:3000").expect("default APP_ORIGIN is valid"),
        );
        let log_file = optional_string("LOG_FILE");

        Self {
            database_url,
            bind_addr,
            request_timeout: Duration::from_secs(request_timeout_secs),
            remote_status_timeout: Duration::from_secs(remote_status_timeout_secs),
            default_plan_duration_days,
            asaas,
            pagbank,
            resend_api_key,
            email_from,
            app_origin,
            log_file,
        }
    }
}

fn optional_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn optional_secret(key: &str) -> Option<SecretString> {
    optional_string(key).map(SecretString::from)
}
