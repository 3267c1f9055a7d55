use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{Instrument, instrument};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{
        payment::{PaymentIdentifiers, PaymentProfile},
        payment_provider::PaymentProvider,
        plan::PlanProfile,
    },
    use_cases::{
        payment_notification::{PaymentNotifier, SettlementNotice},
        payment_reconciliation::PaymentReconciler,
        plan_activation::{PlanActivator, check_duration},
    },
    webhook_auth::WebhookSecrets,
    webhook_payload::classify,
};

/// Grant length used when neither the payment's plan join nor the plan
/// store can say how long the plan lasts.
pub const DEFAULT_PLAN_DURATION_DAYS: i64 = 30;

#[async_trait]
pub trait PaymentRepo: Send + Sync {
    /// PIX payments whose `provider_order_id` equals `ids.order_id` or whose
    /// `provider_reference_id` equals the charge or reference id.
    async fn find_pix_by_identifiers(
        &self,
        ids: &PaymentIdentifiers,
    ) -> AppResult<Vec<PaymentProfile>>;

    /// Atomic PENDING -> PAID transition. Returns `false` if the payment was
    /// not pending anymore. `reference_id` only fills an empty column.
    async fn mark_paid_if_pending(
        &self,
        id: Uuid,
        paid_at: DateTime<Utc>,
        reference_id: Option<&str>,
    ) -> AppResult<bool>;
}

#[async_trait]
pub trait PlanRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<PlanProfile>>;
}

#[async_trait]
pub trait CouponRepo: Send + Sync {
    /// Increments `used_count` and deactivates the coupon once it reaches
    /// `max_uses`, in one update. Not serialized against concurrent usage.
    async fn register_usage(&self, coupon_id: Uuid) -> AppResult<()>;
}

/// A webhook delivery as received by the HTTP layer.
#[derive(Debug, Clone, Copy)]
pub struct InboundWebhook<'a> {
    pub body: &'a Value,
    pub raw_body: &'a [u8],
    /// `asaas-access-token` header
    pub asaas_token: Option<&'a str>,
    /// `x-authenticity-token` header
    pub pagbank_signature: Option<&'a str>,
}

impl InboundWebhook<'_> {
    fn auth_header(&self, provider: PaymentProvider) -> Option<&str> {
        match provider {
            PaymentProvider::Asaas => self.asaas_token,
            PaymentProvider::PagBank => self.pagbank_signature,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// Replay of a payment that is already paid.
    AlreadyConfirmed,
    /// Recognized event that does not (yet) mean the payment is paid.
    NotYetPaid { status: Option<String> },
    Settled {
        payment_id: Uuid,
        expires_at: Option<DateTime<Utc>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementResult {
    Settled { expires_at: Option<DateTime<Utc>> },
    /// Someone else already moved the payment to PAID.
    AlreadySettled,
}

#[derive(Clone)]
pub struct PaymentSettlementUseCases {
    payments: Arc<dyn PaymentRepo>,
    plans: Arc<dyn PlanRepo>,
    coupons: Arc<dyn CouponRepo>,
    activator: PlanActivator,
    reconciler: PaymentReconciler,
    notifier: PaymentNotifier,
    secrets: WebhookSecrets,
    default_duration_days: i64,
}

impl PaymentSettlementUseCases {
    pub fn new(
        payments: Arc<dyn PaymentRepo>,
        plans: Arc<dyn PlanRepo>,
        coupons: Arc<dyn CouponRepo>,
        activator: PlanActivator,
        reconciler: PaymentReconciler,
        notifier: PaymentNotifier,
    ) -> Self {
        Self {
            payments,
            plans,
            coupons,
            activator,
            reconciler,
            notifier,
            secrets: WebhookSecrets::default(),
            default_duration_days: DEFAULT_PLAN_DURATION_DAYS,
        }
    }

    pub fn with_webhook_secrets(mut self, secrets: WebhookSecrets) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn with_default_duration_days(mut self, days: i64) -> Self {
        self.default_duration_days = days;
        self
    }

    /// Full webhook pipeline: classify, authenticate, resolve, reconcile, settle.
    #[instrument(skip_all)]
    pub async fn process_webhook(&self, inbound: InboundWebhook<'_>) -> AppResult<WebhookOutcome> {
        let webhook = classify(inbound.body, inbound.pagbank_signature.is_some());
        let Some(provider) = webhook.provider() else {
            tracing::warn!("Unrecognized webhook payload");
            return Err(AppError::InvalidInput("Unrecognized webhook payload".into()));
        };

        self.secrets
            .verify(provider, inbound.auth_header(provider), inbound.raw_body)?;

        let identifiers = webhook.identifiers();
        if identifiers.is_empty() {
            tracing::warn!(provider = %provider, "Webhook carries no payment identifier");
            return Err(AppError::InvalidInput(
                "Webhook carries no payment identifier".into(),
            ));
        }

        tracing::info!(
            provider = %provider,
            event = %webhook.event_label(),
            order_id = ?identifiers.order_id,
            charge_id = ?identifiers.charge_id,
            reference_id = ?identifiers.reference_id,
            "Payment webhook received"
        );

        let payment = self
            .resolve_payment(&identifiers)
            .await?
            .ok_or(AppError::NotFound)?;

        if payment.is_paid() {
            tracing::info!(payment_id = %payment.id, "Payment already confirmed, ignoring replay");
            return Ok(WebhookOutcome::AlreadyConfirmed);
        }
        if !payment.status.is_settleable() {
            tracing::warn!(
                payment_id = %payment.id,
                status = %payment.status,
                "Webhook for a payment that can no longer be settled"
            );
            return Ok(WebhookOutcome::NotYetPaid {
                status: Some(payment.status.to_string()),
            });
        }

        let verdict = self.reconciler.reconcile(&webhook, &payment).await;
        if !verdict.is_paid {
            tracing::info!(
                payment_id = %payment.id,
                status = ?verdict.status,
                "Payment not yet paid"
            );
            return Ok(WebhookOutcome::NotYetPaid {
                status: verdict.status,
            });
        }

        let paid_at = verdict.paid_at.unwrap_or_else(Utc::now);
        match self
            .settle(&payment, paid_at, verdict.reference_id.as_deref())
            .await?
        {
            SettlementResult::Settled { expires_at } => Ok(WebhookOutcome::Settled {
                payment_id: payment.id,
                expires_at,
            }),
            SettlementResult::AlreadySettled => Ok(WebhookOutcome::AlreadyConfirmed),
        }
    }

    /// At most one PIX payment carries any given provider id. More than one
    /// match is a data integrity problem and is not settled.
    pub async fn resolve_payment(
        &self,
        identifiers: &PaymentIdentifiers,
    ) -> AppResult<Option<PaymentProfile>> {
        let mut matches = self.payments.find_pix_by_identifiers(identifiers).await?;
        match matches.len() {
            0 => {
                tracing::info!(?identifiers, "No payment matches webhook identifiers");
                Ok(None)
            }
            1 => Ok(matches.pop()),
            n => {
                let ids: Vec<Uuid> = matches.iter().map(|p| p.id).collect();
                tracing::error!(?identifiers, matches = n, payment_ids = ?ids, "Webhook identifiers match several payments");
                Err(AppError::Internal(format!(
                    "{n} payments match the webhook identifiers"
                )))
            }
        }
    }

    /// Marks the payment paid, then registers coupon usage, then activates
    /// the plan, then notifies the buyer.
    ///
    /// Only the caller that wins the PENDING -> PAID update runs the later
    /// steps. Coupon and notification failures are logged and swallowed;
    /// activation failures propagate. The steps run on their own task, so
    /// dropping the caller's future (request timeout, client disconnect)
    /// does not stop a settlement halfway.
    pub async fn settle(
        &self,
        payment: &PaymentProfile,
        paid_at: DateTime<Utc>,
        reference_id: Option<&str>,
    ) -> AppResult<SettlementResult> {
        let this = self.clone();
        let payment = payment.clone();
        let reference_id = reference_id.map(str::to_string);

        tokio::spawn(
            async move {
                this.settle_steps(&payment, paid_at, reference_id.as_deref())
                    .await
            }
            .in_current_span(),
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Settlement task failed");
            AppError::Internal(format!("Settlement task failed: {e}"))
        })?
    }

    #[instrument(skip(self, payment), fields(payment_id = %payment.id))]
    async fn settle_steps(
        &self,
        payment: &PaymentProfile,
        paid_at: DateTime<Utc>,
        reference_id: Option<&str>,
    ) -> AppResult<SettlementResult> {
        if payment.is_paid() {
            return Ok(SettlementResult::AlreadySettled);
        }
        if !payment.status.is_settleable() {
            tracing::warn!(status = %payment.status, "Paid webhook for a payment that is not pending");
            return Err(AppError::InvalidInput(format!(
                "Payment is {} and cannot be settled",
                payment.status
            )));
        }

        let (duration_days, plan_name) = self.resolve_duration(payment).await?;
        // Fail while the payment is still pending rather than after mark-paid.
        check_duration(duration_days, Utc::now())?;

        if !self
            .payments
            .mark_paid_if_pending(payment.id, paid_at, reference_id)
            .await?
        {
            tracing::info!("Payment settled by a concurrent delivery");
            return Ok(SettlementResult::AlreadySettled);
        }
        tracing::info!(paid_at = %paid_at, reference_id = ?reference_id, "Payment marked as paid");

        if let Some(coupon_id) = payment.coupon_id {
            if let Err(e) = self.coupons.register_usage(coupon_id).await {
                tracing::error!(coupon_id = %coupon_id, error = %e, "Failed to register coupon usage");
            }
        }

        let expires_at = self
            .activator
            .activate(payment.user_id, payment.plan_id, duration_days)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    user_id = %payment.user_id,
                    plan_id = %payment.plan_id,
                    error = %e,
                    "CRITICAL: payment marked paid but plan activation failed"
                );
            })?;

        let notice = SettlementNotice {
            user_id: payment.user_id,
            plan_name,
            amount_cents: payment.amount_cents,
            expires_at,
        };
        if let Err(e) = self.notifier.payment_confirmed(&notice).await {
            tracing::warn!(error = %e, "Failed to send payment confirmation email");
        }

        Ok(SettlementResult::Settled { expires_at })
    }

    /// Joined plan, then plan store, then the configured default.
    async fn resolve_duration(&self, payment: &PaymentProfile) -> AppResult<(i64, Option<String>)> {
        if let Some(plan) = &payment.plan {
            return Ok((plan.grant_days(), Some(plan.name.clone())));
        }

        match self.plans.get_by_id(payment.plan_id).await? {
            Some(plan) => Ok((plan.grant_days(), Some(plan.name))),
            None => {
                tracing::warn!(
                    plan_id = %payment.plan_id,
                    default_days = self.default_duration_days,
                    "Plan not found, using default duration"
                );
                Ok((self.default_duration_days, None))
            }
        }
    }
}
