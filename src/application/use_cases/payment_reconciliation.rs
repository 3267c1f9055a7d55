use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::{
    domain::entities::{
        payment::PaymentProfile,
        payment_provider::PaymentProvider,
        payment_status::{is_paid_provider_status, normalize_provider_status},
    },
    ports::payment_status_client::PaymentStatusClient,
    webhook_payload::WebhookPayload,
};

/// Verdict of the reconciler for one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub is_paid: bool,
    /// Last known provider status, normalized. Reported back when not paid.
    pub status: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    /// Secondary id to store on the payment. Only set when it has none yet.
    pub reference_id: Option<String>,
}

impl Reconciliation {
    fn not_paid(status: Option<String>) -> Self {
        Self {
            is_paid: false,
            status,
            paid_at: None,
            reference_id: None,
        }
    }
}

/// Decides whether a payment is paid, from the payload first and from the
/// provider's status API when the payload is inconclusive.
#[derive(Clone, Default)]
pub struct PaymentReconciler {
    clients: HashMap<PaymentProvider, Arc<dyn PaymentStatusClient>>,
}

impl PaymentReconciler {
    pub fn new(clients: Vec<Arc<dyn PaymentStatusClient>>) -> Self {
        Self {
            clients: clients.into_iter().map(|c| (c.provider(), c)).collect(),
        }
    }

    pub fn has_client(&self, provider: PaymentProvider) -> bool {
        self.clients.contains_key(&provider)
    }

    /// Never fails: remote errors are logged and count as "not paid yet".
    #[instrument(skip_all, fields(payment_id = %payment.id))]
    pub async fn reconcile(
        &self,
        webhook: &WebhookPayload,
        payment: &PaymentProfile,
    ) -> Reconciliation {
        let identifiers = webhook.identifiers();
        let candidates = webhook.status_candidates();
        let payload_reference = identifiers.charge_id.clone();

        let verdict = if let Some(paid) = candidates.iter().find(|s| is_paid_provider_status(s)) {
            Reconciliation {
                is_paid: true,
                status: Some(paid.clone()),
                paid_at: webhook.paid_at(),
                reference_id: payload_reference,
            }
        } else {
            let lookup_id = identifiers
                .remote_lookup_id()
                .or(payment.provider_order_id.as_deref());
            let fallback_status = candidates.first().cloned();

            match (webhook.provider(), lookup_id) {
                (Some(provider), Some(lookup_id)) => {
                    self.query_remote(provider, lookup_id, webhook, fallback_status)
                        .await
                        .map(|mut remote| {
                            remote.reference_id = payload_reference.or(remote.reference_id);
                            remote
                        })
                        .unwrap_or_else(Reconciliation::not_paid)
                }
                _ => Reconciliation::not_paid(fallback_status),
            }
        };

        // Backfill only fills a gap; an existing reference is never overwritten.
        Reconciliation {
            reference_id: verdict
                .reference_id
                .filter(|_| payment.provider_reference_id.is_none()),
            ..verdict
        }
    }

    /// `Err` carries the status to report when the remote answer is not "paid".
    async fn query_remote(
        &self,
        provider: PaymentProvider,
        lookup_id: &str,
        webhook: &WebhookPayload,
        fallback_status: Option<String>,
    ) -> Result<Reconciliation, Option<String>> {
        let Some(client) = self.clients.get(&provider) else {
            tracing::debug!(provider = %provider, "No status client configured, skipping remote check");
            return Err(fallback_status);
        };

        match client.get_status(lookup_id).await {
            Ok(Some(remote)) if remote.is_paid() => {
                tracing::info!(
                    provider = %provider,
                    lookup_id = %lookup_id,
                    remote_status = %remote.status,
                    "Remote status reports payment as paid"
                );
                Ok(Reconciliation {
                    is_paid: true,
                    status: Some(normalize_provider_status(&remote.status)),
                    paid_at: remote.paid_at.or_else(|| webhook.paid_at()),
                    reference_id: remote.reference_id,
                })
            }
            Ok(Some(remote)) => Err(Some(normalize_provider_status(&remote.status))),
            Ok(None) => {
                tracing::info!(provider = %provider, lookup_id = %lookup_id, "Remote status unknown to provider");
                Err(fallback_status)
            }
            Err(e) => {
                tracing::warn!(
                    provider = %provider,
                    lookup_id = %lookup_id,
                    error = %e,
                    "Remote status query failed, treating as not paid"
                );
                Err(fallback_status)
            }
        }
    }
}
