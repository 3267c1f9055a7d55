use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    infra::config::AppConfig, ports::health_probe::HealthProbe,
    use_cases::payment_settlement::PaymentSettlementUseCases,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub settlement_use_cases: Arc<PaymentSettlementUseCases>,
    pub health: Arc<dyn HealthProbe>,
}

impl FromRef<AppState> for Arc<PaymentSettlementUseCases> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.settlement_use_cases.clone()
    }
}
