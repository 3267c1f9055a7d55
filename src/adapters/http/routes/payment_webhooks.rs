//! PIX payment webhooks from Asaas and PagBank.
//!
//! Both providers post to the same endpoint. Status codes tell the provider
//! whether to retry: 2xx stops retries (including for events that are not a
//! payment yet), 404 and 5xx are safe to retry, 400 and 401 are not.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use serde_json::{Value, json};

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    domain::entities::payment_provider::PaymentProvider,
    use_cases::payment_settlement::{InboundWebhook, WebhookOutcome},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/payments", post(receive_payment_webhook))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// POST /api/webhooks/payments
async fn receive_payment_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    // Content-Type is not trusted: relayed deliveries often omit it.
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidInput(format!("Body is not valid JSON: {e}")))?;

    let inbound = InboundWebhook {
        body: &payload,
        raw_body: &body,
        asaas_token: header_str(&headers, PaymentProvider::Asaas.webhook_auth_header()),
        pagbank_signature: header_str(&headers, PaymentProvider::PagBank.webhook_auth_header()),
    };

    let outcome = app_state.settlement_use_cases.process_webhook(inbound).await?;

    let body = match outcome {
        WebhookOutcome::AlreadyConfirmed => json!({
            "success": true,
            "message": "Payment already confirmed",
        }),
        WebhookOutcome::NotYetPaid { status } => json!({
            "success": true,
            "message": "Payment not yet paid",
            "status": status,
        }),
        WebhookOutcome::Settled {
            payment_id,
            expires_at,
        } => json!({
            "success": true,
            "message": "Payment confirmed and plan activated",
            "paymentId": payment_id,
            "planExpiresAt": expires_at,
        }),
    };

    Ok((StatusCode::OK, Json(body)))
}
