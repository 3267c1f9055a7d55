//! In-memory mock implementations for the settlement repository traits and
//! the external collaborators (provider status APIs, email).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::payment_status_client::{PaymentStatusClient, RemotePaymentStatus},
        use_cases::{
            payment_notification::EmailSender,
            payment_settlement::{CouponRepo, PaymentRepo, PlanRepo},
            plan_activation::{NextExpiration, UserPlanRepo, UserPlanState},
        },
    },
    domain::entities::{
        coupon::CouponProfile,
        payment::{PaymentIdentifiers, PaymentProfile},
        payment_provider::PaymentProvider,
        payment_status::PaymentStatus,
        plan::PlanProfile,
    },
};

// ============================================================================
// InMemoryPaymentRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryPaymentRepo {
    pub payments: Mutex<HashMap<Uuid, PaymentProfile>>,
    transitions: Mutex<usize>,
}

impl InMemoryPaymentRepo {
    pub fn with_payments(payments: Vec<PaymentProfile>) -> Self {
        Self {
            payments: Mutex::new(payments.into_iter().map(|p| (p.id, p)).collect()),
            transitions: Mutex::new(0),
        }
    }

    pub fn get(&self, id: Uuid) -> Option<PaymentProfile> {
        self.payments.lock().unwrap().get(&id).cloned()
    }

    pub fn update(&self, id: Uuid, f: impl FnOnce(&mut PaymentProfile)) {
        if let Some(p) = self.payments.lock().unwrap().get_mut(&id) {
            f(p);
        }
    }

    /// All payments ordered by id, for before/after comparisons.
    pub fn snapshot(&self) -> Vec<(Uuid, PaymentStatus, Option<DateTime<Utc>>, Option<String>)> {
        let mut rows: Vec<_> = self
            .payments
            .lock()
            .unwrap()
            .values()
            .map(|p| (p.id, p.status, p.paid_at, p.provider_reference_id.clone()))
            .collect();
        rows.sort_by_key(|row| row.0);
        rows
    }

    /// Number of successful PENDING -> PAID transitions.
    pub fn mark_paid_writes(&self) -> usize {
        *self.transitions.lock().unwrap()
    }
}

#[async_trait]
impl PaymentRepo for InMemoryPaymentRepo {
    async fn find_pix_by_identifiers(
        &self,
        ids: &PaymentIdentifiers,
    ) -> AppResult<Vec<PaymentProfile>> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.method.carries_provider_ids() && ids.matches(p))
            .cloned()
            .collect())
    }

    async fn mark_paid_if_pending(
        &self,
        id: Uuid,
        paid_at: DateTime<Utc>,
        reference_id: Option<&str>,
    ) -> AppResult<bool> {
        let mut payments = self.payments.lock().unwrap();
        let Some(payment) = payments.get_mut(&id) else {
            return Ok(false);
        };
        if payment.status != PaymentStatus::Pending {
            return Ok(false);
        }
        payment.status = PaymentStatus::Paid;
        payment.paid_at = Some(paid_at);
        if payment.provider_reference_id.is_none() {
            payment.provider_reference_id = reference_id.map(str::to_string);
        }
        *self.transitions.lock().unwrap() += 1;
        Ok(true)
    }
}

// ============================================================================
// InMemoryPlanRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryPlanRepo {
    pub plans: Mutex<HashMap<Uuid, PlanProfile>>,
}

impl InMemoryPlanRepo {
    pub fn with_plans(plans: Vec<PlanProfile>) -> Self {
        Self {
            plans: Mutex::new(plans.into_iter().map(|p| (p.id, p)).collect()),
        }
    }
}

#[async_trait]
impl PlanRepo for InMemoryPlanRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<PlanProfile>> {
        Ok(self.plans.lock().unwrap().get(&id).cloned())
    }
}

// ============================================================================
// InMemoryCouponRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryCouponRepo {
    pub coupons: Mutex<HashMap<Uuid, CouponProfile>>,
}

impl InMemoryCouponRepo {
    pub fn insert(&self, coupon: CouponProfile) {
        self.coupons.lock().unwrap().insert(coupon.id, coupon);
    }

    pub fn get(&self, id: Uuid) -> Option<CouponProfile> {
        self.coupons.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl CouponRepo for InMemoryCouponRepo {
    async fn register_usage(&self, coupon_id: Uuid) -> AppResult<()> {
        let mut coupons = self.coupons.lock().unwrap();
        let coupon = coupons.get_mut(&coupon_id).ok_or(AppError::NotFound)?;
        *coupon = coupon.with_usage_registered();
        Ok(())
    }
}

/// Coupon repo whose store is always down.
pub struct FailingCouponRepo;

#[async_trait]
impl CouponRepo for FailingCouponRepo {
    async fn register_usage(&self, _coupon_id: Uuid) -> AppResult<()> {
        Err(AppError::Database("connection reset".into()))
    }
}

// ============================================================================
// InMemoryUserPlanRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryUserPlanRepo {
    pub users: Mutex<HashMap<Uuid, UserPlanState>>,
    activations: Mutex<usize>,
}

impl InMemoryUserPlanRepo {
    pub fn with_users(users: Vec<UserPlanState>) -> Self {
        Self {
            users: Mutex::new(users.into_iter().map(|u| (u.id, u)).collect()),
            activations: Mutex::new(0),
        }
    }

    pub fn insert(&self, user: UserPlanState) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub fn get(&self, id: Uuid) -> Option<UserPlanState> {
        self.users.lock().unwrap().get(&id).cloned()
    }

    /// Number of `grant_plan` writes.
    pub fn activations(&self) -> usize {
        *self.activations.lock().unwrap()
    }
}

#[async_trait]
impl UserPlanRepo for InMemoryUserPlanRepo {
    async fn get_plan_state(&self, user_id: Uuid) -> AppResult<Option<UserPlanState>> {
        Ok(self.get(user_id))
    }

    async fn grant_plan(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        next: &NextExpiration<'_>,
    ) -> AppResult<Option<DateTime<Utc>>> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&user_id).ok_or(AppError::NotFound)?;
        let expires_at = next(user)?;
        user.plan_id = Some(plan_id);
        user.plan_expires_at = expires_at;
        *self.activations.lock().unwrap() += 1;
        Ok(expires_at)
    }
}

/// User repo that sleeps before every grant, for settlements that outlive
/// their delivery.
pub struct DelayedUserPlanRepo {
    inner: Arc<InMemoryUserPlanRepo>,
    delay: std::time::Duration,
}

impl DelayedUserPlanRepo {
    pub fn new(inner: Arc<InMemoryUserPlanRepo>, delay: std::time::Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl UserPlanRepo for DelayedUserPlanRepo {
    async fn get_plan_state(&self, user_id: Uuid) -> AppResult<Option<UserPlanState>> {
        self.inner.get_plan_state(user_id).await
    }

    async fn grant_plan(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        next: &NextExpiration<'_>,
    ) -> AppResult<Option<DateTime<Utc>>> {
        tokio::time::sleep(self.delay).await;
        self.inner.grant_plan(user_id, plan_id, next).await
    }
}

// ============================================================================
// StubStatusClient
// ============================================================================

/// Status client with a canned answer that records every lookup.
pub struct StubStatusClient {
    provider: PaymentProvider,
    response: Result<Option<RemotePaymentStatus>, String>,
    lookups: Mutex<Vec<String>>,
}

impl StubStatusClient {
    pub fn returning(provider: PaymentProvider, status: Option<RemotePaymentStatus>) -> Self {
        Self {
            provider,
            response: Ok(status),
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(provider: PaymentProvider) -> Self {
        Self {
            provider,
            response: Err("connection timed out".to_string()),
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.lookups.lock().unwrap().len()
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentStatusClient for StubStatusClient {
    fn provider(&self) -> PaymentProvider {
        self.provider
    }

    async fn get_status(&self, provider_id: &str) -> AppResult<Option<RemotePaymentStatus>> {
        self.lookups.lock().unwrap().push(provider_id.to_string());
        self.response.clone().map_err(AppError::Provider)
    }
}

// ============================================================================
// RecordingEmailSender
// ============================================================================

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Default)]
pub struct RecordingEmailSender {
    sent: Mutex<Vec<SentEmail>>,
    fail: bool,
}

impl RecordingEmailSender {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, to: &str, subject: &str, html: &str) -> AppResult<()> {
        if self.fail {
            return Err(AppError::Internal("email provider unavailable".into()));
        }
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}
