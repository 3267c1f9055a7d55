use crate::{
    adapters::{
        email::resend::ResendEmailSender,
        http::app_state::AppState,
        payment_status::{AsaasStatusClient, PagBankStatusClient},
    },
    domain::entities::payment_provider::PaymentProvider,
    infra::{
        config::AppConfig,
        http_client::{DEFAULT_REQUEST_TIMEOUT, try_build_client},
        postgres_persistence,
    },
    ports::{health_probe::HealthProbe, payment_status_client::PaymentStatusClient},
    use_cases::{
        payment_notification::{EmailSender, PaymentNotifier},
        payment_reconciliation::PaymentReconciler,
        payment_settlement::{CouponRepo, PaymentRepo, PaymentSettlementUseCases, PlanRepo},
        plan_activation::{PlanActivator, UserPlanRepo},
    },
    webhook_auth::WebhookSecrets,
};
use std::fs::File;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub async fn init_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let postgres_arc = Arc::new(postgres_persistence(&config.database_url).await?);

    let status_client = try_build_client(config.remote_status_timeout)?;
    let mut status_clients: Vec<Arc<dyn PaymentStatusClient>> = Vec::new();
    if let Some(api_key) = config.asaas.api_token.clone() {
        status_clients.push(Arc::new(AsaasStatusClient::new(
            status_client.clone(),
            config.asaas.api_url.clone(),
            api_key,
        )));
    }
    if let Some(api_token) = config.pagbank.api_token.clone() {
        status_clients.push(Arc::new(PagBankStatusClient::new(
            status_client,
            config.pagbank.api_url.clone(),
            api_token,
        )));
    }
    let reconciler = PaymentReconciler::new(status_clients);
    for provider in PaymentProvider::all() {
        if !reconciler.has_client(*provider) {
            tracing::warn!(provider = %provider, "No API token configured, remote status checks disabled");
        }
    }

    let email: Option<Arc<dyn EmailSender>> = match config.resend_api_key.clone() {
        Some(api_key) => Some(Arc::new(ResendEmailSender::new(
            try_build_client(DEFAULT_REQUEST_TIMEOUT)?,
            api_key,
            config.email_from.clone(),
        ))),
        None => {
            tracing::warn!("RESEND_API_KEY not set, payment confirmation emails disabled");
            None
        }
    };

    let users = postgres_arc.clone() as Arc<dyn UserPlanRepo>;
    let settlement_use_cases = PaymentSettlementUseCases::new(
        postgres_arc.clone() as Arc<dyn PaymentRepo>,
        postgres_arc.clone() as Arc<dyn PlanRepo>,
        postgres_arc.clone() as Arc<dyn CouponRepo>,
        PlanActivator::new(users.clone()),
        reconciler,
        PaymentNotifier::new(email, users, config.app_origin.to_string()),
    )
    .with_webhook_secrets(WebhookSecrets {
        asaas_token: config.asaas.webhook_token.clone(),
        pagbank_token: config.pagbank.webhook_token.clone(),
    })
    .with_default_duration_days(config.default_plan_duration_days);

    Ok(AppState {
        config: Arc::new(config),
        settlement_use_cases: Arc::new(settlement_use_cases),
        health: postgres_arc as Arc<dyn HealthProbe>,
    })
}

/// Pretty console logs, plus JSON logs to `log_file` when set.
pub fn init_tracing(log_file: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pix_settlement=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false) // don't show target (module path)
        .with_level(true) // show log level
        .pretty(); // human-friendly, with colors

    // File (structured JSON logs)
    let mut file_error = None;
    let json_layer = log_file.and_then(|path| match File::create(path) {
        Ok(file) => Some(
            fmt::layer()
                .json()
                .with_writer(file)
                .with_current_span(true)
                .with_span_list(true)
                .boxed(),
        ),
        Err(e) => {
            file_error = Some((path.to_string(), e));
            None
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();

    if let Some((path, e)) = file_error {
        tracing::warn!(path = %path, error = %e, "Cannot create log file, logging to console only");
    }
}
