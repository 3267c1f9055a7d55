use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::instrument;
use uuid::Uuid;

use crate::{app_error::AppResult, use_cases::plan_activation::UserPlanRepo};

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> AppResult<()>;
}

/// What the buyer is told after a settlement.
#[derive(Debug, Clone)]
pub struct SettlementNotice {
    pub user_id: Uuid,
    pub plan_name: Option<String>,
    pub amount_cents: i64,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Sends the "payment confirmed" email. A notifier without a sender is a no-op.
#[derive(Clone)]
pub struct PaymentNotifier {
    email: Option<Arc<dyn EmailSender>>,
    users: Arc<dyn UserPlanRepo>,
    app_origin: String,
}

impl PaymentNotifier {
    pub fn new(
        email: Option<Arc<dyn EmailSender>>,
        users: Arc<dyn UserPlanRepo>,
        app_origin: String,
    ) -> Self {
        Self {
            email,
            users,
            app_origin,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.email.is_some()
    }

    #[instrument(skip(self))]
    pub async fn payment_confirmed(&self, notice: &SettlementNotice) -> AppResult<()> {
        let Some(email) = &self.email else {
            return Ok(());
        };

        let Some(to) = self
            .users
            .get_plan_state(notice.user_id)
            .await?
            .and_then(|u| u.email)
        else {
            tracing::debug!(user_id = %notice.user_id, "No email address, skipping notification");
            return Ok(());
        };

        let plan = notice.plan_name.as_deref().unwrap_or("your plan");
        let validity = match notice.expires_at {
            Some(expires_at) => format!(
                "<p>Valid until {}.</p>",
                expires_at.format("%Y-%m-%d %H:%M UTC")
            ),
            None => "<p>This is a lifetime plan.</p>".to_string(),
        };
        let body = format!(
            "<p>We received your PIX payment of {}.</p><p>{} is now active.</p>{}<p><a href=\"{}/account\">Go to your account</a></p>",
            format_brl(notice.amount_cents),
            plan,
            validity,
            self.app_origin.trim_end_matches('/'),
        );

        email.send(&to, "Payment confirmed", &body).await
    }
}

fn format_brl(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{sign}R$ {},{:02}", cents / 100, cents % 100)
}
