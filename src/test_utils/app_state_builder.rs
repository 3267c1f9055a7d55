//! Test app state builder for HTTP-level integration testing.
//!
//! This module provides `TestAppStateBuilder` which creates a minimal `AppState`
//! with in-memory mocks for testing HTTP endpoints.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use url::Url;

use crate::{
    adapters::http::app_state::AppState,
    application::{
        ports::{health_probe::HealthProbe, payment_status_client::PaymentStatusClient},
        use_cases::{
            payment_notification::PaymentNotifier,
            payment_reconciliation::PaymentReconciler,
            payment_settlement::{DEFAULT_PLAN_DURATION_DAYS, PaymentSettlementUseCases},
            plan_activation::{PlanActivator, UserPlanState},
        },
        webhook_auth::WebhookSecrets,
    },
    domain::entities::{coupon::CouponProfile, payment::PaymentProfile, plan::PlanProfile},
    infra::config::{AppConfig, ProviderConfig},
    test_utils::{
        InMemoryCouponRepo, InMemoryPaymentRepo, InMemoryPlanRepo, InMemoryUserPlanRepo,
        RecordingEmailSender,
    },
};

// ============================================================================
// StubHealthProbe
// ============================================================================

pub struct StubHealthProbe {
    reachable: bool,
}

#[async_trait]
impl HealthProbe for StubHealthProbe {
    async fn store_reachable(&self) -> bool {
        self.reachable
    }
}

// ============================================================================
// TestAppStateBuilder
// ============================================================================

/// Handles on the in-memory stores behind a built `AppState`, for asserting
/// on side effects after a request.
pub struct TestMocks {
    pub payments: Arc<InMemoryPaymentRepo>,
    pub coupons: Arc<InMemoryCouponRepo>,
    pub users: Arc<InMemoryUserPlanRepo>,
    pub email: Arc<RecordingEmailSender>,
}

/// Builder for creating `AppState` with in-memory mocks for testing.
///
/// # Example
///
/// ```ignore
/// let plan = create_test_plan(|_| {});
/// let payment = create_test_payment(|p| p.plan_id = plan.id);
///
/// let (app_state, mocks) = TestAppStateBuilder::new()
///     .with_plan(plan)
///     .with_payment(payment)
///     .build_with_mocks();
/// ```
pub struct TestAppStateBuilder {
    payments: Vec<PaymentProfile>,
    plans: Vec<PlanProfile>,
    users: Vec<UserPlanState>,
    coupons: Vec<CouponProfile>,
    status_clients: Vec<Arc<dyn PaymentStatusClient>>,
    secrets: WebhookSecrets,
    store_reachable: bool,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            payments: vec![],
            plans: vec![],
            users: vec![],
            coupons: vec![],
            status_clients: vec![],
            secrets: WebhookSecrets::default(),
            store_reachable: true,
        }
    }

    pub fn with_payment(mut self, payment: PaymentProfile) -> Self {
        self.payments.push(payment);
        self
    }

    pub fn with_plan(mut self, plan: PlanProfile) -> Self {
        self.plans.push(plan);
        self
    }

    pub fn with_user(mut self, user: UserPlanState) -> Self {
        self.users.push(user);
        self
    }

    pub fn with_coupon(mut self, coupon: CouponProfile) -> Self {
        self.coupons.push(coupon);
        self
    }

    /// Register a remote status client. Without one, reconciliation relies on
    /// the payload alone.
    pub fn with_status_client(mut self, client: Arc<dyn PaymentStatusClient>) -> Self {
        self.status_clients.push(client);
        self
    }

    pub fn with_webhook_secrets(mut self, secrets: WebhookSecrets) -> Self {
        self.secrets = secrets;
        self
    }

    /// Make the health probe report the database as unreachable.
    pub fn with_store_down(mut self) -> Self {
        self.store_reachable = false;
        self
    }

    pub fn build(self) -> AppState {
        self.build_with_mocks().0
    }

    pub fn build_with_mocks(self) -> (AppState, TestMocks) {
        let payments = Arc::new(InMemoryPaymentRepo::with_payments(self.payments));
        let plans = Arc::new(InMemoryPlanRepo::with_plans(self.plans));
        let coupons = Arc::new(InMemoryCouponRepo::default());
        for coupon in self.coupons {
            coupons.insert(coupon);
        }
        let users = Arc::new(InMemoryUserPlanRepo::with_users(self.users));
        let email = Arc::new(RecordingEmailSender::default());

        let config = test_config();

        let use_cases = PaymentSettlementUseCases::new(
            payments.clone(),
            plans,
            coupons.clone(),
            PlanActivator::new(users.clone()),
            PaymentReconciler::new(self.status_clients),
            PaymentNotifier::new(
                Some(email.clone()),
                users.clone(),
                config.app_origin.to_string(),
            ),
        )
        .with_webhook_secrets(self.secrets)
        .with_default_duration_days(config.default_plan_duration_days);

        let app_state = AppState {
            config: Arc::new(config),
            settlement_use_cases: Arc::new(use_cases),
            health: Arc::new(StubHealthProbe {
                reachable: self.store_reachable,
            }),
        };

        (
            app_state,
            TestMocks {
                payments,
                coupons,
                users,
                email,
            },
        )
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn test_config() -> AppConfig {
    let provider = |api_url: &str| ProviderConfig {
        api_url: Url::parse(api_url).unwrap(),
        api_token: None,
        webhook_token: None,
    };

    AppConfig {
        database_url: "postgres://localhost/test".to_string(),
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        request_timeout: Duration::from_secs(15),
        remote_status_timeout: Duration::from_secs(5),
        default_plan_duration_days: DEFAULT_PLAN_DURATION_DAYS,
        asaas: provider("http://asaas.test/v3"),
        pagbank: provider("http://pagbank.test"),
        resend_api_key: None,
        email_from: "no-reply@pix.test".to_string(),
        app_origin: Url::parse("http://app.test").unwrap(),
        log_file: None,
    }
}
