pub mod health;
pub mod payment_webhooks;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/webhooks", payment_webhooks::router())
        .merge(health::router())
}
